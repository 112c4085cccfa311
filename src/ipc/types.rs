use std::path::PathBuf;

use rusqlite::Connection;
use serde::Deserialize;

use crate::clock::Clock;
use crate::grid::WeeklyGrid;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

pub struct AppState {
    pub workspace: Option<PathBuf>,
    pub db: Option<Connection>,
    pub clock: Box<dyn Clock>,
    /// Open attendance grid, at most one per daemon.
    pub session: Option<WeeklyGrid>,
}

impl AppState {
    pub fn new(clock: Box<dyn Clock>) -> AppState {
        AppState {
            workspace: None,
            db: None,
            clock,
            session: None,
        }
    }
}
