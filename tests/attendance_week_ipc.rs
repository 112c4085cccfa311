mod test_support;

use serde_json::json;
use test_support::{error_code, request_err, request_ok, spawn_sidecar, temp_dir};

fn cell<'a>(view: &'a serde_json::Value, student_id: &str, day: usize) -> &'a serde_json::Value {
    view.get("rows")
        .and_then(|v| v.as_array())
        .and_then(|rows| {
            rows.iter()
                .find(|r| r.get("studentId").and_then(|v| v.as_str()) == Some(student_id))
        })
        .and_then(|r| r.get("cells"))
        .and_then(|c| c.get(day))
        .expect("cell")
}

fn day_flag(view: &serde_json::Value, day: usize, key: &str) -> bool {
    view.get("days")
        .and_then(|d| d.get(day))
        .and_then(|d| d.get(key))
        .and_then(|v| v.as_bool())
        .expect("day flag")
}

fn flag(view: &serde_json::Value, key: &str) -> bool {
    view.get(key).and_then(|v| v.as_bool()).expect("flag")
}

#[test]
fn weekly_grid_edit_save_and_navigate() {
    let workspace = temp_dir("rollcall-week-ipc");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let group_id = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "groups.create",
        json!({ "name": "Year 7 Blue" }),
    )
    .get("groupId")
    .and_then(|v| v.as_str())
    .expect("groupId")
    .to_string();
    let mut student_ids = Vec::new();
    for (i, name) in ["Ada Lovelace", "Alan Turing"].iter().enumerate() {
        let created = request_ok(
            &mut stdin,
            &mut reader,
            &format!("3{}", i),
            "students.create",
            json!({ "groupId": group_id, "displayName": name }),
        );
        student_ids.push(
            created
                .get("studentId")
                .and_then(|v| v.as_str())
                .expect("studentId")
                .to_string(),
        );
    }
    let (s1, s2) = (student_ids[0].as_str(), student_ids[1].as_str());

    let view = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "attendance.open",
        json!({ "groupId": group_id, "token": "bearer-abc" }),
    );
    assert_eq!(view.get("weekOffset").and_then(|v| v.as_i64()), Some(0));
    assert_eq!(view.get("weekStart").and_then(|v| v.as_str()), Some("2026-10-12"));
    assert_eq!(
        view.get("days")
            .and_then(|d| d.get(2))
            .and_then(|d| d.get("temporal"))
            .and_then(|v| v.as_str()),
        Some("today")
    );
    assert!(flag(&view, "loaded"));
    assert!(!flag(&view, "editMode"));
    assert!(day_flag(&view, 2, "editable"));
    assert!(!day_flag(&view, 0, "editable"));
    assert!(!day_flag(&view, 3, "editable"));
    assert_eq!(view.get("theme").and_then(|v| v.as_str()), Some("light"));

    // Today cycles without edit mode.
    let t = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "attendance.toggle",
        json!({ "studentId": s1, "dayIndex": 2 }),
    );
    assert_eq!(t.get("status").and_then(|v| v.as_str()), Some("present"));
    let t = request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "attendance.toggle",
        json!({ "studentId": s1, "dayIndex": 2 }),
    );
    assert_eq!(t.get("status").and_then(|v| v.as_str()), Some("absent"));
    assert!(flag(&t["view"], "hasUnsavedChanges"));
    assert!(flag(&t["view"], "showSaveControls"));

    // Past Monday is locked outside edit mode.
    let t = request_ok(
        &mut stdin,
        &mut reader,
        "7",
        "attendance.toggle",
        json!({ "studentId": s1, "dayIndex": 0 }),
    );
    assert_eq!(t.get("changed").and_then(|v| v.as_bool()), Some(false));
    assert!(t.get("status").expect("status").is_null());

    // Unlock Thursday, then enter edit mode.
    let u = request_ok(
        &mut stdin,
        &mut reader,
        "8",
        "attendance.toggleDateAccess",
        json!({ "dayIndex": 3 }),
    );
    assert_eq!(u.get("unlocked").and_then(|v| v.as_bool()), Some(true));
    assert!(!day_flag(&u["view"], 3, "editable"));
    assert!(flag(&u["view"], "hasUnlockedDays"));
    let view = request_ok(&mut stdin, &mut reader, "9", "attendance.enterEditMode", json!({}));
    assert!(day_flag(&view, 3, "editable"));
    assert!(day_flag(&view, 0, "editable"));
    assert!(!day_flag(&view, 4, "editable"));

    let t = request_ok(
        &mut stdin,
        &mut reader,
        "10",
        "attendance.toggle",
        json!({ "studentId": s2, "dayIndex": 3 }),
    );
    assert_eq!(t.get("status").and_then(|v| v.as_str()), Some("present"));

    let stats = request_ok(&mut stdin, &mut reader, "11", "attendance.stats", json!({}));
    assert_eq!(stats, json!({ "present": 1, "absent": 1, "excused": 0, "attendanceRate": 50 }));

    let view = request_ok(&mut stdin, &mut reader, "12", "attendance.save", json!({}));
    assert!(!flag(&view, "editMode"));
    assert!(!flag(&view, "hasUnsavedChanges"));

    // Next week is empty and the session is reset.
    let view = request_ok(
        &mut stdin,
        &mut reader,
        "13",
        "attendance.changeWeek",
        json!({ "direction": 1 }),
    );
    assert_eq!(view.get("weekOffset").and_then(|v| v.as_i64()), Some(1));
    assert_eq!(view.get("weekStart").and_then(|v| v.as_str()), Some("2026-10-19"));
    assert!(cell(&view, s1, 2).is_null());
    assert!(!flag(&view, "editMode"));
    assert!(!day_flag(&view, 3, "unlocked"));
    assert!(!flag(&view, "hasUnlockedDays"));

    let view = request_ok(
        &mut stdin,
        &mut reader,
        "14",
        "attendance.changeWeek",
        json!({ "direction": -1 }),
    );
    assert_eq!(cell(&view, s1, 2).as_str(), Some("absent"));
    assert_eq!(cell(&view, s2, 3).as_str(), Some("present"));
    assert_eq!(view["record"][s1]["Wed"], "absent");

    let e = request_err(
        &mut stdin,
        &mut reader,
        "15",
        "attendance.changeWeek",
        json!({ "direction": 3 }),
    );
    assert_eq!(error_code(&e), "bad_params");

    // Cancel leaves toggled statuses in memory; a re-fetch drops them.
    let _ = request_ok(&mut stdin, &mut reader, "16", "attendance.enterEditMode", json!({}));
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "17",
        "attendance.toggle",
        json!({ "studentId": s1, "dayIndex": 0 }),
    );
    let view = request_ok(&mut stdin, &mut reader, "18", "attendance.cancel", json!({}));
    assert!(!flag(&view, "editMode"));
    assert!(!flag(&view, "hasUnsavedChanges"));
    assert_eq!(cell(&view, s1, 0).as_str(), Some("present"));
    let view = request_ok(&mut stdin, &mut reader, "19", "attendance.refresh", json!({}));
    assert!(cell(&view, s1, 0).is_null());

    let closed = request_ok(&mut stdin, &mut reader, "20", "attendance.close", json!({}));
    assert_eq!(closed.get("closed").and_then(|v| v.as_bool()), Some(true));
    let e = request_err(&mut stdin, &mut reader, "21", "attendance.view", json!({}));
    assert_eq!(error_code(&e), "no_session");

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn failed_fetch_reports_blocking_error_with_empty_view() {
    let workspace = temp_dir("rollcall-fetch-fail");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let e = request_err(
        &mut stdin,
        &mut reader,
        "1",
        "attendance.open",
        json!({ "groupId": "g", "token": "t" }),
    );
    assert_eq!(error_code(&e), "no_workspace");

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let e = request_err(
        &mut stdin,
        &mut reader,
        "3",
        "attendance.open",
        json!({ "groupId": "missing-group" }),
    );
    assert_eq!(error_code(&e), "bad_params");

    let e = request_err(
        &mut stdin,
        &mut reader,
        "4",
        "attendance.open",
        json!({ "groupId": "missing-group", "token": "t" }),
    );
    assert_eq!(error_code(&e), "fetch_failed");
    let view = &e["details"]["view"];
    assert_eq!(view.get("loaded").and_then(|v| v.as_bool()), Some(false));
    assert!(view.get("loadError").and_then(|v| v.as_str()).is_some());
    assert_eq!(view.get("rows").and_then(|v| v.as_array()).map(|r| r.len()), Some(0));

    let e = request_err(&mut stdin, &mut reader, "5", "attendance.save", json!({}));
    assert_eq!(error_code(&e), "not_loaded");

    let e = request_err(
        &mut stdin,
        &mut reader,
        "6",
        "attendance.toggle",
        json!({ "studentId": "x", "dayIndex": 7 }),
    );
    assert_eq!(error_code(&e), "bad_params");

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}
