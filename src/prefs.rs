use crate::db;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

pub const THEME_KEY: &str = "prefs.theme";

/// Display preferences handed to views as explicit context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    #[serde(default)]
    pub dark_mode: bool,
}

impl Preferences {
    pub fn theme(&self) -> &'static str {
        if self.dark_mode {
            "dark"
        } else {
            "light"
        }
    }

    /// Stored preferences, or defaults when nothing (or garbage) is stored.
    pub fn load(conn: &Connection) -> anyhow::Result<Preferences> {
        let Some(v) = db::settings_get_json(conn, THEME_KEY)? else {
            return Ok(Preferences::default());
        };
        Ok(serde_json::from_value(v).unwrap_or_default())
    }

    pub fn store(&self, conn: &Connection) -> anyhow::Result<()> {
        db::settings_set_json(conn, THEME_KEY, &serde_json::to_value(self)?)
    }
}
