use crate::attendance::AttendanceStatus;
use crate::db::SqliteStore;
use crate::grid::{GridError, WeeklyGrid};
use crate::ipc::error::{err, get_required_i64, get_required_str, respond, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::prefs::Preferences;
use crate::remote::{Credential, RemoteError};
use crate::week::{day_label, week_dates, TemporalClass, DAYS_PER_WEEK};
use chrono::NaiveDate;
use rusqlite::Connection;
use serde_json::json;
use tracing::info;

fn status_json(status: AttendanceStatus) -> serde_json::Value {
    if status.is_set() {
        json!(status.as_str())
    } else {
        serde_json::Value::Null
    }
}

fn grid_view(
    conn: &Connection,
    grid: &WeeklyGrid,
    today: NaiveDate,
) -> Result<serde_json::Value, HandlerErr> {
    let prefs =
        Preferences::load(conn).map_err(|e| HandlerErr::new("db_query_failed", e.to_string()))?;
    let dates = grid.week_dates();

    let days_json: Vec<serde_json::Value> = dates
        .iter()
        .enumerate()
        .map(|(i, date)| {
            json!({
                "index": i,
                "label": day_label(i),
                "date": date.to_string(),
                "temporal": TemporalClass::of(*date, today).as_str(),
                "editable": grid.is_day_editable(i, today),
                "unlocked": grid.unlocked().contains(i, grid.week_offset())
            })
        })
        .collect();
    let rows_json: Vec<serde_json::Value> = grid
        .students()
        .iter()
        .map(|s| {
            let cells: Vec<serde_json::Value> = (0..DAYS_PER_WEEK)
                .map(|d| status_json(grid.record().get(&s.id, d)))
                .collect();
            json!({
                "studentId": s.id,
                "displayName": s.display_name,
                "cells": cells
            })
        })
        .collect();

    Ok(json!({
        "groupId": grid.group_id(),
        "weekOffset": grid.week_offset(),
        "weekStart": grid.week_start().to_string(),
        "today": today.to_string(),
        "loaded": grid.is_loaded(),
        "loadError": grid.load_error(),
        "editMode": grid.edit_mode(),
        "hasUnsavedChanges": grid.has_unsaved_changes(),
        "showSaveControls": grid.edit_mode() || grid.has_unsaved_changes(),
        "hasUnlockedDays": !grid.unlocked().is_empty(),
        "days": days_json,
        "students": grid.students(),
        "rows": rows_json,
        "record": grid.record().to_wire(),
        "stats": grid.stats(),
        "theme": prefs.theme()
    }))
}

fn grid_err(e: GridError, view: Option<serde_json::Value>) -> HandlerErr {
    let code = match &e {
        GridError::BadDirection(_) | GridError::WeekOutOfRange => "bad_params",
        GridError::NotLoaded => "not_loaded",
        GridError::Fetch(RemoteError::Unauthorized) | GridError::Save(RemoteError::Unauthorized) => {
            "unauthorized"
        }
        GridError::Fetch(_) => "fetch_failed",
        GridError::Save(_) => "save_failed",
    };
    HandlerErr {
        code,
        message: e.to_string(),
        details: view.map(|v| json!({ "view": v })),
    }
}

/// Run `f`, then answer with the refreshed view, or with the error plus
/// the view so the caller can still render the grid state.
fn view_after<F>(
    conn: &Connection,
    grid: &mut WeeklyGrid,
    today: NaiveDate,
    f: F,
) -> Result<serde_json::Value, HandlerErr>
where
    F: FnOnce(&Connection, &mut WeeklyGrid) -> Result<(), GridError>,
{
    match f(conn, grid) {
        Ok(()) => grid_view(conn, grid, today),
        Err(e) => {
            let view = grid_view(conn, grid, today).ok();
            Err(grid_err(e, view))
        }
    }
}

fn day_index_param(params: &serde_json::Value) -> Result<usize, HandlerErr> {
    let day = get_required_i64(params, "dayIndex")?;
    if !(0..DAYS_PER_WEEK as i64).contains(&day) {
        return Err(HandlerErr::bad_params("dayIndex must be between 0 and 6"));
    }
    Ok(day as usize)
}

fn calendar_week_dates(
    params: &serde_json::Value,
    today: NaiveDate,
) -> Result<serde_json::Value, HandlerErr> {
    let offset = match params.get("offset") {
        None | Some(serde_json::Value::Null) => 0,
        Some(v) => v
            .as_i64()
            .and_then(|o| i32::try_from(o).ok())
            .ok_or_else(|| HandlerErr::bad_params("offset must be an integer"))?,
    };
    let dates = week_dates(today, offset)
        .ok_or_else(|| HandlerErr::bad_params("offset is outside the supported calendar range"))?;
    let dates: Vec<serde_json::Value> = dates
        .iter()
        .enumerate()
        .map(|(i, d)| json!({ "index": i, "label": day_label(i), "date": d.to_string() }))
        .collect();
    Ok(json!({ "offset": offset, "dates": dates }))
}

fn attendance_open(
    state: &mut AppState,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let group_id = get_required_str(params, "groupId")?;
    let token = get_required_str(params, "token")?;
    let Some(conn) = state.db.as_ref() else {
        return Err(HandlerErr::new("no_workspace", "select a workspace first"));
    };
    let today = state.clock.today();
    info!(group_id = %group_id, "attendance session opened");
    let grid = WeeklyGrid::new(group_id, Credential::new(token), today)
        .map_err(|e| grid_err(e, None))?;
    let grid = state.session.insert(grid);
    view_after(conn, grid, today, |conn, grid| {
        grid.reload(&SqliteStore::new(conn))
    })
}

fn attendance_change_week(
    conn: &Connection,
    grid: &mut WeeklyGrid,
    today: NaiveDate,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let direction = get_required_i64(params, "direction")?;
    view_after(conn, grid, today, |conn, grid| {
        grid.navigate(&SqliteStore::new(conn), direction)
    })
}

fn attendance_toggle(
    conn: &Connection,
    grid: &mut WeeklyGrid,
    today: NaiveDate,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let student_id = get_required_str(params, "studentId")?;
    let day = day_index_param(params)?;
    let changed = grid.toggle_attendance(&student_id, day, today);
    let status = changed.unwrap_or_else(|| grid.record().get(&student_id, day));
    Ok(json!({
        "changed": changed.is_some(),
        "status": status_json(status),
        "view": grid_view(conn, grid, today)?
    }))
}

fn attendance_toggle_date_access(
    conn: &Connection,
    grid: &mut WeeklyGrid,
    today: NaiveDate,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let day = day_index_param(params)?;
    let toggled = grid.toggle_date_access(day, today);
    Ok(json!({
        "changed": toggled.is_some(),
        "unlocked": grid.unlocked().contains(day, grid.week_offset()),
        "view": grid_view(conn, grid, today)?
    }))
}

fn handle_session_method(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    if req.method == "attendance.close" {
        let closed = state.session.take().is_some();
        return respond(&req.id, Ok(json!({ "closed": closed })));
    }
    let Some(grid) = state.session.as_mut() else {
        return err(&req.id, "no_session", "open an attendance session first", None);
    };
    let today = state.clock.today();
    let params = &req.params;

    let result = match req.method.as_str() {
        "attendance.view" => grid_view(conn, grid, today),
        "attendance.changeWeek" => attendance_change_week(conn, grid, today, params),
        "attendance.refresh" => view_after(conn, grid, today, |conn, grid| {
            grid.reload(&SqliteStore::new(conn))
        }),
        "attendance.toggle" => attendance_toggle(conn, grid, today, params),
        "attendance.toggleDateAccess" => attendance_toggle_date_access(conn, grid, today, params),
        "attendance.enterEditMode" => {
            grid.enter_edit_mode();
            grid_view(conn, grid, today)
        }
        "attendance.save" => view_after(conn, grid, today, |conn, grid| {
            grid.save(&SqliteStore::new(conn))
        }),
        "attendance.cancel" => {
            grid.cancel_edit();
            grid_view(conn, grid, today)
        }
        "attendance.stats" => Ok(json!(grid.stats())),
        other => Err(HandlerErr::new(
            "not_implemented",
            format!("unknown method: {}", other),
        )),
    };
    respond(&req.id, result)
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "calendar.weekDates" => {
            let today = state.clock.today();
            Some(respond(&req.id, calendar_week_dates(&req.params, today)))
        }
        "attendance.open" => {
            let result = attendance_open(state, &req.params);
            Some(respond(&req.id, result))
        }
        "attendance.view"
        | "attendance.changeWeek"
        | "attendance.refresh"
        | "attendance.toggle"
        | "attendance.toggleDateAccess"
        | "attendance.enterEditMode"
        | "attendance.save"
        | "attendance.cancel"
        | "attendance.stats"
        | "attendance.close" => Some(handle_session_method(state, req)),
        _ => None,
    }
}
