use crate::week::TemporalClass;
use chrono::NaiveDate;
use std::collections::HashSet;

/// Future (day index, week offset) slots explicitly unlocked in this session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnlockSet {
    slots: HashSet<(usize, i32)>,
}

impl UnlockSet {
    pub fn contains(&self, day_index: usize, week_offset: i32) -> bool {
        self.slots.contains(&(day_index, week_offset))
    }

    pub fn clear(&mut self) {
        self.slots.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Flip the unlock state of a slot. Only future dates can be unlocked;
    /// for past dates and today this does nothing and returns `None`.
    /// Otherwise returns the new membership.
    pub fn toggle(
        &mut self,
        date: NaiveDate,
        today: NaiveDate,
        day_index: usize,
        week_offset: i32,
    ) -> Option<bool> {
        if TemporalClass::of(date, today) != TemporalClass::Future {
            return None;
        }
        let key = (day_index, week_offset);
        if self.slots.remove(&key) {
            Some(false)
        } else {
            self.slots.insert(key);
            Some(true)
        }
    }
}

/// Whether a cell on `date` accepts mutation.
///
/// Today is always editable. Past dates need edit mode. Future dates need
/// edit mode and an explicit unlock of their slot.
pub fn is_editable(
    date: NaiveDate,
    today: NaiveDate,
    day_index: usize,
    week_offset: i32,
    edit_mode: bool,
    unlocked: &UnlockSet,
) -> bool {
    match TemporalClass::of(date, today) {
        TemporalClass::Today => true,
        TemporalClass::Past => edit_mode,
        TemporalClass::Future => edit_mode && unlocked.contains(day_index, week_offset),
    }
}
