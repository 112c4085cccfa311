use crate::attendance::AttendanceRecord;
use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: String,
    pub display_name: String,
}

/// Opaque bearer credential supplied by whoever opened the session.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Credential {
        Credential(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Credential(..)")
    }
}

/// One week of attendance for one group, submitted as a whole.
#[derive(Debug, Clone)]
pub struct WeekSubmission<'a> {
    pub group_id: &'a str,
    pub week_start: NaiveDate,
    pub student_ids: Vec<&'a str>,
    pub record: &'a AttendanceRecord,
}

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("group not found: {0}")]
    GroupNotFound(String),
    #[error("credential rejected")]
    Unauthorized,
    #[error("store error: {0}")]
    Store(String),
}

impl From<rusqlite::Error> for RemoteError {
    fn from(e: rusqlite::Error) -> Self {
        RemoteError::Store(e.to_string())
    }
}

/// Capabilities the attendance grid consumes from its backing store.
pub trait AttendanceRemote {
    fn fetch_group_roster(
        &self,
        credential: &Credential,
        group_id: &str,
    ) -> Result<Vec<Student>, RemoteError>;

    fn fetch_attendance(
        &self,
        credential: &Credential,
        group_id: &str,
        week_start: NaiveDate,
    ) -> Result<AttendanceRecord, RemoteError>;

    /// Bulk upsert: every day of every submitted student is overwritten and
    /// unset cells are removed.
    fn persist_attendance(
        &self,
        credential: &Credential,
        submission: &WeekSubmission<'_>,
    ) -> Result<(), RemoteError>;
}
