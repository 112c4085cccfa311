use chrono::{Datelike, Duration, NaiveDate};
use std::cmp::Ordering;

pub const DAYS_PER_WEEK: usize = 7;

pub const DAY_LABELS: [&str; DAYS_PER_WEEK] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

pub fn day_label(day_index: usize) -> Option<&'static str> {
    DAY_LABELS.get(day_index).copied()
}

/// The seven dates (Monday first) of the week containing `today`, shifted by
/// `week_offset` weeks. Sunday belongs to the week that started six days
/// earlier.
///
/// `None` when any of the dates falls outside the representable calendar.
pub fn week_dates(today: NaiveDate, week_offset: i32) -> Option<[NaiveDate; DAYS_PER_WEEK]> {
    let dow = today.weekday().num_days_from_sunday() as i64;
    let to_monday = if dow == 0 { -6 } else { 1 - dow };
    let monday = today.checked_add_signed(Duration::days(to_monday + 7 * week_offset as i64))?;
    let mut out = [monday; DAYS_PER_WEEK];
    for (i, d) in out.iter_mut().enumerate() {
        *d = monday.checked_add_signed(Duration::days(i as i64))?;
    }
    Some(out)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemporalClass {
    Past,
    Today,
    Future,
}

impl TemporalClass {
    pub fn of(date: NaiveDate, today: NaiveDate) -> TemporalClass {
        match date.cmp(&today) {
            Ordering::Less => TemporalClass::Past,
            Ordering::Equal => TemporalClass::Today,
            Ordering::Greater => TemporalClass::Future,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TemporalClass::Past => "past",
            TemporalClass::Today => "today",
            TemporalClass::Future => "future",
        }
    }
}
