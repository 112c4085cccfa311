use crate::access::{is_editable, UnlockSet};
use crate::attendance::{compute_stats, AttendanceRecord, AttendanceStats, AttendanceStatus};
use crate::remote::{AttendanceRemote, Credential, RemoteError, Student, WeekSubmission};
use crate::week::{week_dates, DAYS_PER_WEEK};
use chrono::{Duration, NaiveDate};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum GridError {
    #[error("week direction must be -1 or 1, got {0}")]
    BadDirection(i64),
    #[error("week is outside the supported calendar range")]
    WeekOutOfRange,
    #[error("no week is loaded")]
    NotLoaded,
    #[error("failed to load attendance: {0}")]
    Fetch(RemoteError),
    #[error("failed to save attendance: {0}")]
    Save(RemoteError),
}

/// Identifies one fetch request. Only the most recently issued ticket may
/// populate the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket {
    pub seq: u64,
    pub week_offset: i32,
    pub week_start: NaiveDate,
}

#[derive(Debug, Clone)]
pub struct LoadedWeek {
    pub students: Vec<Student>,
    pub record: AttendanceRecord,
}

/// Teacher-facing weekly attendance grid for one group.
///
/// The displayed week is fixed when a fetch is issued and only moves through
/// `change_week`, so a session that runs past midnight keeps editing and
/// saving the week it loaded.
#[derive(Debug)]
pub struct WeeklyGrid {
    group_id: String,
    credential: Credential,
    week_offset: i32,
    dates: [NaiveDate; DAYS_PER_WEEK],
    students: Vec<Student>,
    record: AttendanceRecord,
    loaded: bool,
    load_error: Option<String>,
    edit_mode: bool,
    has_unsaved_changes: bool,
    unlocked: UnlockSet,
    fetch_seq: u64,
}

impl WeeklyGrid {
    /// A grid showing the week that contains `today`.
    pub fn new(
        group_id: impl Into<String>,
        credential: Credential,
        today: NaiveDate,
    ) -> Result<WeeklyGrid, GridError> {
        let dates = week_dates(today, 0).ok_or(GridError::WeekOutOfRange)?;
        Ok(WeeklyGrid {
            group_id: group_id.into(),
            credential,
            week_offset: 0,
            dates,
            students: Vec::new(),
            record: AttendanceRecord::default(),
            loaded: false,
            load_error: None,
            edit_mode: false,
            has_unsaved_changes: false,
            unlocked: UnlockSet::default(),
            fetch_seq: 0,
        })
    }

    pub fn group_id(&self) -> &str {
        &self.group_id
    }

    pub fn week_offset(&self) -> i32 {
        self.week_offset
    }

    pub fn students(&self) -> &[Student] {
        &self.students
    }

    pub fn record(&self) -> &AttendanceRecord {
        &self.record
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn load_error(&self) -> Option<&str> {
        self.load_error.as_deref()
    }

    pub fn edit_mode(&self) -> bool {
        self.edit_mode
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.has_unsaved_changes
    }

    pub fn unlocked(&self) -> &UnlockSet {
        &self.unlocked
    }

    /// Dates of the displayed week, Monday first.
    pub fn week_dates(&self) -> [NaiveDate; DAYS_PER_WEEK] {
        self.dates
    }

    pub fn week_start(&self) -> NaiveDate {
        self.dates[0]
    }

    /// Move one week back (-1) or forward (1) from the displayed week. Resets
    /// the edit session and drops the loaded week; the returned ticket must be
    /// used to apply the fetch for the new week. Nothing changes when the
    /// target week is out of range.
    pub fn change_week(&mut self, direction: i64) -> Result<FetchTicket, GridError> {
        if direction != -1 && direction != 1 {
            return Err(GridError::BadDirection(direction));
        }
        let offset = self
            .week_offset
            .checked_add(direction as i32)
            .ok_or(GridError::WeekOutOfRange)?;
        let dates = self.dates[0]
            .checked_add_signed(Duration::days(7 * direction))
            .and_then(|monday| week_dates(monday, 0))
            .ok_or(GridError::WeekOutOfRange)?;
        self.week_offset = offset;
        self.dates = dates;
        Ok(self.begin_fetch())
    }

    /// Re-fetch the displayed week.
    pub fn refresh(&mut self) -> FetchTicket {
        self.begin_fetch()
    }

    fn begin_fetch(&mut self) -> FetchTicket {
        self.edit_mode = false;
        self.has_unsaved_changes = false;
        self.unlocked.clear();
        self.students.clear();
        self.record = AttendanceRecord::default();
        self.loaded = false;
        self.load_error = None;
        self.fetch_seq += 1;
        FetchTicket {
            seq: self.fetch_seq,
            week_offset: self.week_offset,
            week_start: self.dates[0],
        }
    }

    /// Apply the outcome of a fetch. Returns `Ok(false)` when the ticket is
    /// stale, leaving the grid untouched.
    pub fn apply_fetch(
        &mut self,
        ticket: FetchTicket,
        outcome: Result<LoadedWeek, RemoteError>,
    ) -> Result<bool, GridError> {
        if ticket.seq != self.fetch_seq {
            warn!(
                group_id = %self.group_id,
                stale_seq = ticket.seq,
                current_seq = self.fetch_seq,
                "discarding stale attendance fetch"
            );
            return Ok(false);
        }
        match outcome {
            Ok(week) => {
                debug!(
                    group_id = %self.group_id,
                    week_start = %ticket.week_start,
                    students = week.students.len(),
                    "attendance week loaded"
                );
                self.students = week.students;
                self.record = week.record;
                self.loaded = true;
                self.load_error = None;
                Ok(true)
            }
            Err(e) => {
                warn!(group_id = %self.group_id, error = %e, "attendance fetch failed");
                self.students.clear();
                self.record = AttendanceRecord::default();
                self.loaded = false;
                self.load_error = Some(e.to_string());
                Err(GridError::Fetch(e))
            }
        }
    }

    /// Fetch roster and attendance for a ticket from the remote store.
    pub fn fetch(&self, remote: &dyn AttendanceRemote, ticket: FetchTicket) -> Result<LoadedWeek, RemoteError> {
        let students = remote.fetch_group_roster(&self.credential, &self.group_id)?;
        let record = remote.fetch_attendance(&self.credential, &self.group_id, ticket.week_start)?;
        Ok(LoadedWeek { students, record })
    }

    /// Synchronous fetch of the displayed week.
    pub fn reload(&mut self, remote: &dyn AttendanceRemote) -> Result<(), GridError> {
        let ticket = self.refresh();
        let outcome = self.fetch(remote, ticket);
        self.apply_fetch(ticket, outcome).map(|_| ())
    }

    /// Synchronous `change_week` followed by the fetch of the new week.
    pub fn navigate(
        &mut self,
        remote: &dyn AttendanceRemote,
        direction: i64,
    ) -> Result<(), GridError> {
        let ticket = self.change_week(direction)?;
        let outcome = self.fetch(remote, ticket);
        self.apply_fetch(ticket, outcome).map(|_| ())
    }

    pub fn is_day_editable(&self, day_index: usize, today: NaiveDate) -> bool {
        let Some(date) = self.dates.get(day_index).copied() else {
            return false;
        };
        is_editable(
            date,
            today,
            day_index,
            self.week_offset,
            self.edit_mode,
            &self.unlocked,
        )
    }

    /// Flip the unlock of a future day in the displayed week. `None` when
    /// the day is today, in the past, or out of range.
    pub fn toggle_date_access(&mut self, day_index: usize, today: NaiveDate) -> Option<bool> {
        let date = self.dates.get(day_index).copied()?;
        let unlocked = self.unlocked.toggle(date, today, day_index, self.week_offset)?;
        debug!(group_id = %self.group_id, day_index, unlocked, "date access toggled");
        Some(unlocked)
    }

    pub fn enter_edit_mode(&mut self) {
        self.edit_mode = true;
    }

    /// Advance one cell through the status cycle. Returns the new status, or
    /// `None` if the cell is locked, the student is not on the loaded roster,
    /// or no week is loaded.
    pub fn toggle_attendance(
        &mut self,
        student_id: &str,
        day_index: usize,
        today: NaiveDate,
    ) -> Option<AttendanceStatus> {
        if !self.loaded || !self.students.iter().any(|s| s.id == student_id) {
            return None;
        }
        if !self.is_day_editable(day_index, today) {
            return None;
        }
        let next = self.record.get(student_id, day_index).next();
        self.record.set(student_id, day_index, next);
        self.has_unsaved_changes = true;
        Some(next)
    }

    pub fn stats(&self) -> AttendanceStats {
        compute_stats(self.students.iter().map(|s| s.id.as_str()), &self.record)
    }

    /// Persist the whole week. On failure nothing is rolled back and the
    /// session stays dirty.
    pub fn save(&mut self, remote: &dyn AttendanceRemote) -> Result<(), GridError> {
        if !self.loaded {
            return Err(GridError::NotLoaded);
        }
        let submission = WeekSubmission {
            group_id: &self.group_id,
            week_start: self.dates[0],
            student_ids: self.students.iter().map(|s| s.id.as_str()).collect(),
            record: &self.record,
        };
        remote
            .persist_attendance(&self.credential, &submission)
            .map_err(|e| {
                warn!(group_id = %self.group_id, error = %e, "attendance save failed");
                GridError::Save(e)
            })?;
        info!(
            group_id = %self.group_id,
            week_start = %submission.week_start,
            "attendance saved"
        );
        self.edit_mode = false;
        self.has_unsaved_changes = false;
        Ok(())
    }

    /// Leave edit mode. Statuses already toggled stay as they are.
    pub fn cancel_edit(&mut self) {
        self.edit_mode = false;
        self.has_unsaved_changes = false;
        self.unlocked.clear();
    }
}
