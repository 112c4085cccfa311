use crate::db;
use crate::ipc::error::{err, get_required_str, respond, HandlerErr};
use crate::ipc::types::{AppState, Request};
use rusqlite::Connection;
use serde_json::json;
use uuid::Uuid;

fn query_failed(e: rusqlite::Error) -> HandlerErr {
    HandlerErr::new("db_query_failed", e.to_string())
}

fn update_failed(table: &str, e: rusqlite::Error) -> HandlerErr {
    HandlerErr {
        code: "db_update_failed",
        message: e.to_string(),
        details: Some(json!({ "table": table })),
    }
}

fn groups_create(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let name = get_required_str(params, "name")?;
    let group_id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO groups(id, name) VALUES(?, ?)",
        (&group_id, &name),
    )
    .map_err(|e| update_failed("groups", e))?;
    Ok(json!({ "groupId": group_id }))
}

fn groups_list(conn: &Connection) -> Result<serde_json::Value, HandlerErr> {
    let mut stmt = conn
        .prepare(
            "SELECT
               g.id,
               g.name,
               (SELECT COUNT(*) FROM students s WHERE s.group_id = g.id) AS student_count
             FROM groups g
             ORDER BY g.name",
        )
        .map_err(query_failed)?;
    let groups = stmt
        .query_map([], |row| {
            let id: String = row.get(0)?;
            let name: String = row.get(1)?;
            let student_count: i64 = row.get(2)?;
            Ok(json!({
                "id": id,
                "name": name,
                "studentCount": student_count
            }))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        .map_err(query_failed)?;
    Ok(json!({ "groups": groups }))
}

fn students_create(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let group_id = get_required_str(params, "groupId")?;
    let display_name = get_required_str(params, "displayName")?;
    if !db::group_exists(conn, &group_id).map_err(query_failed)? {
        return Err(HandlerErr::new("not_found", "group not found"));
    }
    let next_order: i64 = conn
        .query_row(
            "SELECT COALESCE(MAX(sort_order) + 1, 0) FROM students WHERE group_id = ?",
            [&group_id],
            |r| r.get(0),
        )
        .map_err(query_failed)?;
    let student_id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO students(id, group_id, display_name, sort_order) VALUES(?, ?, ?, ?)",
        (&student_id, &group_id, &display_name, next_order),
    )
    .map_err(|e| update_failed("students", e))?;
    Ok(json!({ "studentId": student_id }))
}

fn students_list(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let group_id = get_required_str(params, "groupId")?;
    if !db::group_exists(conn, &group_id).map_err(query_failed)? {
        return Err(HandlerErr::new("not_found", "group not found"));
    }
    let students = db::list_students(conn, &group_id).map_err(query_failed)?;
    Ok(json!({ "students": students }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let method = req.method.as_str();
    if !matches!(
        method,
        "groups.create" | "groups.list" | "students.create" | "students.list"
    ) {
        return None;
    }
    let Some(conn) = state.db.as_ref() else {
        return Some(err(&req.id, "no_workspace", "select a workspace first", None));
    };
    let result = match method {
        "groups.create" => groups_create(conn, &req.params),
        "groups.list" => groups_list(conn),
        "students.create" => students_create(conn, &req.params),
        _ => students_list(conn, &req.params),
    };
    Some(respond(&req.id, result))
}
