use crate::attendance::{AttendanceRecord, AttendanceStatus};
use crate::remote::{AttendanceRemote, Credential, RemoteError, Student, WeekSubmission};
use crate::week::DAYS_PER_WEEK;
use chrono::{Duration, NaiveDate};
use rusqlite::{Connection, OptionalExtension};
use std::path::Path;
use tracing::debug;

pub const DB_FILE_NAME: &str = "rollcall.sqlite3";

const DATE_FMT: &str = "%Y-%m-%d";

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)?;
    let db_path = workspace.join(DB_FILE_NAME);
    let conn = Connection::open(&db_path)?;
    conn.execute("PRAGMA foreign_keys = ON", [])?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS groups(
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS students(
            id TEXT PRIMARY KEY,
            group_id TEXT NOT NULL,
            display_name TEXT NOT NULL,
            sort_order INTEGER NOT NULL,
            FOREIGN KEY(group_id) REFERENCES groups(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_students_group_sort ON students(group_id, sort_order)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS attendance_marks(
            group_id TEXT NOT NULL,
            student_id TEXT NOT NULL,
            date TEXT NOT NULL,
            status TEXT NOT NULL,
            PRIMARY KEY(group_id, student_id, date),
            FOREIGN KEY(group_id) REFERENCES groups(id),
            FOREIGN KEY(student_id) REFERENCES students(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_attendance_marks_group_date ON attendance_marks(group_id, date)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS settings(
            key TEXT PRIMARY KEY,
            value_json TEXT NOT NULL
        )",
        [],
    )?;

    debug!(path = %db_path.display(), "workspace database ready");
    Ok(conn)
}

pub fn settings_get_json(conn: &Connection, key: &str) -> anyhow::Result<Option<serde_json::Value>> {
    let raw: Option<String> = conn
        .query_row("SELECT value_json FROM settings WHERE key = ?", [key], |r| {
            r.get(0)
        })
        .optional()?;
    match raw {
        Some(s) => Ok(Some(serde_json::from_str(&s)?)),
        None => Ok(None),
    }
}

pub fn settings_set_json(conn: &Connection, key: &str, value: &serde_json::Value) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO settings(key, value_json) VALUES(?, ?)
         ON CONFLICT(key) DO UPDATE SET value_json = excluded.value_json",
        (key, value.to_string()),
    )?;
    Ok(())
}

pub fn group_exists(conn: &Connection, group_id: &str) -> rusqlite::Result<bool> {
    conn.query_row("SELECT 1 FROM groups WHERE id = ?", [group_id], |r| {
        r.get::<_, i64>(0)
    })
    .optional()
    .map(|v| v.is_some())
}

pub fn list_students(conn: &Connection, group_id: &str) -> rusqlite::Result<Vec<Student>> {
    let mut stmt = conn.prepare(
        "SELECT id, display_name
         FROM students
         WHERE group_id = ?
         ORDER BY sort_order, rowid",
    )?;
    let rows = stmt
        .query_map([group_id], |r| {
            Ok(Student {
                id: r.get(0)?,
                display_name: r.get(1)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Attendance store backed by the workspace database.
pub struct SqliteStore<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteStore<'a> {
    pub fn new(conn: &'a Connection) -> SqliteStore<'a> {
        SqliteStore { conn }
    }

    fn require_group(&self, credential: &Credential, group_id: &str) -> Result<(), RemoteError> {
        if credential.as_str().trim().is_empty() {
            return Err(RemoteError::Unauthorized);
        }
        if !group_exists(self.conn, group_id)? {
            return Err(RemoteError::GroupNotFound(group_id.to_string()));
        }
        Ok(())
    }
}

impl AttendanceRemote for SqliteStore<'_> {
    fn fetch_group_roster(
        &self,
        credential: &Credential,
        group_id: &str,
    ) -> Result<Vec<Student>, RemoteError> {
        self.require_group(credential, group_id)?;
        Ok(list_students(self.conn, group_id)?)
    }

    fn fetch_attendance(
        &self,
        credential: &Credential,
        group_id: &str,
        week_start: NaiveDate,
    ) -> Result<AttendanceRecord, RemoteError> {
        self.require_group(credential, group_id)?;
        let week_end = week_start
            .checked_add_signed(Duration::days(DAYS_PER_WEEK as i64 - 1))
            .ok_or_else(|| RemoteError::Store(format!("week of {} is out of range", week_start)))?;
        let mut stmt = self.conn.prepare(
            "SELECT student_id, date, status
             FROM attendance_marks
             WHERE group_id = ? AND date >= ? AND date <= ?",
        )?;
        let rows = stmt
            .query_map(
                (
                    group_id,
                    week_start.format(DATE_FMT).to_string(),
                    week_end.format(DATE_FMT).to_string(),
                ),
                |r| {
                    Ok((
                        r.get::<_, String>(0)?,
                        r.get::<_, String>(1)?,
                        r.get::<_, String>(2)?,
                    ))
                },
            )?
            .collect::<Result<Vec<_>, _>>()?;

        let mut record = AttendanceRecord::default();
        for (student_id, date, status) in rows {
            let Ok(date) = NaiveDate::parse_from_str(&date, DATE_FMT) else {
                continue;
            };
            let Some(status) = AttendanceStatus::parse(&status) else {
                continue;
            };
            let day = (date - week_start).num_days();
            if (0..DAYS_PER_WEEK as i64).contains(&day) {
                record.set(&student_id, day as usize, status);
            }
        }
        Ok(record)
    }

    fn persist_attendance(
        &self,
        credential: &Credential,
        submission: &WeekSubmission<'_>,
    ) -> Result<(), RemoteError> {
        self.require_group(credential, submission.group_id)?;
        let mut dates = Vec::with_capacity(DAYS_PER_WEEK);
        for day in 0..DAYS_PER_WEEK {
            let date = submission
                .week_start
                .checked_add_signed(Duration::days(day as i64))
                .ok_or_else(|| {
                    RemoteError::Store(format!("week of {} is out of range", submission.week_start))
                })?;
            dates.push(date.format(DATE_FMT).to_string());
        }
        let tx = self.conn.unchecked_transaction()?;
        for student_id in &submission.student_ids {
            for (day, date) in dates.iter().enumerate() {
                let status = submission.record.get(student_id, day);
                if status.is_set() {
                    tx.execute(
                        "INSERT INTO attendance_marks(group_id, student_id, date, status)
                         VALUES(?, ?, ?, ?)
                         ON CONFLICT(group_id, student_id, date) DO UPDATE SET
                           status = excluded.status",
                        (submission.group_id, *student_id, date, status.as_str()),
                    )?;
                } else {
                    tx.execute(
                        "DELETE FROM attendance_marks WHERE group_id = ? AND student_id = ? AND date = ?",
                        (submission.group_id, *student_id, date),
                    )?;
                }
            }
        }
        tx.commit()?;
        Ok(())
    }
}
