use crate::ipc::error::{err, respond, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::prefs::Preferences;
use rusqlite::Connection;
use serde_json::json;
use tracing::info;

fn prefs_get(conn: &Connection) -> Result<serde_json::Value, HandlerErr> {
    let prefs = Preferences::load(conn).map_err(|e| HandlerErr::new("db_query_failed", e.to_string()))?;
    Ok(json!({ "darkMode": prefs.dark_mode, "theme": prefs.theme() }))
}

fn prefs_set(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let dark_mode = params
        .get("darkMode")
        .and_then(|v| v.as_bool())
        .ok_or_else(|| HandlerErr::bad_params("darkMode must be a boolean"))?;
    let prefs = Preferences { dark_mode };
    prefs
        .store(conn)
        .map_err(|e| HandlerErr::new("db_update_failed", e.to_string()))?;
    info!(theme = prefs.theme(), "preferences updated");
    Ok(json!({ "darkMode": prefs.dark_mode, "theme": prefs.theme() }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let method = req.method.as_str();
    if method != "prefs.get" && method != "prefs.set" {
        return None;
    }
    let Some(conn) = state.db.as_ref() else {
        return Some(err(&req.id, "no_workspace", "select a workspace first", None));
    };
    let result = if method == "prefs.get" {
        prefs_get(conn)
    } else {
        prefs_set(conn, &req.params)
    };
    Some(respond(&req.id, result))
}
