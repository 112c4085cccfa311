use crate::week::{day_label, DAYS_PER_WEEK};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceStatus {
    #[default]
    Unset,
    Present,
    Absent,
    Excused,
}

impl AttendanceStatus {
    /// unset -> present -> absent -> excused -> unset
    pub fn next(self) -> AttendanceStatus {
        match self {
            AttendanceStatus::Unset => AttendanceStatus::Present,
            AttendanceStatus::Present => AttendanceStatus::Absent,
            AttendanceStatus::Absent => AttendanceStatus::Excused,
            AttendanceStatus::Excused => AttendanceStatus::Unset,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AttendanceStatus::Unset => "unset",
            AttendanceStatus::Present => "present",
            AttendanceStatus::Absent => "absent",
            AttendanceStatus::Excused => "excused",
        }
    }

    pub fn parse(s: &str) -> Option<AttendanceStatus> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "unset" => Some(AttendanceStatus::Unset),
            "present" => Some(AttendanceStatus::Present),
            "absent" => Some(AttendanceStatus::Absent),
            "excused" => Some(AttendanceStatus::Excused),
            _ => None,
        }
    }

    pub fn is_set(self) -> bool {
        self != AttendanceStatus::Unset
    }
}

/// Statuses for one displayed week, keyed by student and day index.
/// Unset cells are not stored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttendanceRecord {
    cells: HashMap<String, [AttendanceStatus; DAYS_PER_WEEK]>,
}

impl AttendanceRecord {
    pub fn get(&self, student_id: &str, day: usize) -> AttendanceStatus {
        self.cells
            .get(student_id)
            .and_then(|days| days.get(day).copied())
            .unwrap_or_default()
    }

    pub fn set(&mut self, student_id: &str, day: usize, status: AttendanceStatus) {
        if day >= DAYS_PER_WEEK {
            return;
        }
        let days = self
            .cells
            .entry(student_id.to_string())
            .or_insert([AttendanceStatus::Unset; DAYS_PER_WEEK]);
        days[day] = status;
        if days.iter().all(|s| !s.is_set()) {
            self.cells.remove(student_id);
        }
    }

    /// Wire shape: studentId -> day label -> status string. Unset is omitted.
    pub fn to_wire(&self) -> BTreeMap<String, BTreeMap<String, AttendanceStatus>> {
        let mut out = BTreeMap::new();
        for (student_id, days) in &self.cells {
            let mut by_label = BTreeMap::new();
            for (i, status) in days.iter().enumerate() {
                if let (true, Some(label)) = (status.is_set(), day_label(i)) {
                    by_label.insert(label.to_string(), *status);
                }
            }
            if !by_label.is_empty() {
                out.insert(student_id.clone(), by_label);
            }
        }
        out
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceStats {
    pub present: u32,
    pub absent: u32,
    pub excused: u32,
    pub attendance_rate: u32,
}

/// Aggregate over every listed student and all seven days of the week.
pub fn compute_stats<'a, I>(student_ids: I, record: &AttendanceRecord) -> AttendanceStats
where
    I: IntoIterator<Item = &'a str>,
{
    let mut stats = AttendanceStats::default();
    for student_id in student_ids {
        for day in 0..DAYS_PER_WEEK {
            match record.get(student_id, day) {
                AttendanceStatus::Present => stats.present += 1,
                AttendanceStatus::Absent => stats.absent += 1,
                AttendanceStatus::Excused => stats.excused += 1,
                AttendanceStatus::Unset => {}
            }
        }
    }
    let total = stats.present + stats.absent + stats.excused;
    if total > 0 {
        // Round half up.
        stats.attendance_rate = (200 * stats.present + total) / (2 * total);
    }
    stats
}
