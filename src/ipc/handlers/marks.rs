use crate::db;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{db_conn, required_str};
use crate::ipc::types::{AppState, Request};
use crate::models::{is_known_term, TERMS};
use crate::store::ResultStore;
use serde_json::json;
use uuid::Uuid;

fn handle_marks_record(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let student_id = match required_str(req, "studentId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let subject = match required_str(req, "subject") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let term = match required_str(req, "term") {
        Ok(v) => v,
        Err(e) => return e,
    };
    if !is_known_term(&term) {
        return err(
            &req.id,
            "bad_params",
            format!("term must be one of: {}", TERMS.join(", ")),
            Some(json!({ "term": term })),
        );
    }
    // Range is deliberately not checked here; only non-numbers are refused.
    let Some(score) = req
        .params
        .get("score")
        .and_then(|v| v.as_f64())
        .filter(|v| v.is_finite())
    else {
        return err(&req.id, "bad_params", "score must be a number", None);
    };

    let student = match db::student_get(conn, &student_id) {
        Ok(Some(s)) => s,
        Ok(None) => return err(&req.id, "not_found", "student not found", None),
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };

    let mark_id = Uuid::new_v4().to_string();
    if let Err(e) = conn.execute(
        "INSERT INTO marks(id, student_id, school_id, subject, score, term)
         VALUES(?, ?, ?, ?, ?, ?)",
        (
            &mark_id,
            &student.id,
            &student.tenant_id,
            &subject,
            score,
            &term,
        ),
    ) {
        return err(
            &req.id,
            "db_insert_failed",
            e.to_string(),
            Some(json!({ "table": "marks" })),
        );
    }

    ok(&req.id, json!({ "markId": mark_id }))
}

fn handle_marks_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let student_id = match required_str(req, "studentId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match db::SqliteStore::new(conn).list_scores(&student_id) {
        Ok(marks) => ok(&req.id, json!({ "marks": marks })),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "marks.record" => Some(handle_marks_record(state, req)),
        "marks.list" => Some(handle_marks_list(state, req)),
        _ => None,
    }
}
