use crate::calc;
use crate::db;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{
    db_conn, optional_str, required_exact_str, required_str, snapshot,
};
use crate::ipc::types::{AppState, Request};
use crate::resolve::{self, ResolveError};
use serde_json::json;

fn resolve_err(req: &Request, e: ResolveError) -> serde_json::Value {
    match e {
        ResolveError::NotFound { index_number } => err(
            &req.id,
            "not_found",
            "No result found for that index number.",
            Some(json!({ "indexNumber": index_number })),
        ),
        ResolveError::Mismatch { index_number } => err(
            &req.id,
            "mismatch",
            "The class entered does not match our records for that index number.",
            Some(json!({ "indexNumber": index_number })),
        ),
        ResolveError::Store(e) => {
            tracing::warn!(error = %e, "result lookup failed");
            err(
                &req.id,
                "store_failed",
                "Could not load results right now, please try again.",
                None,
            )
        }
    }
}

fn handle_results_lookup(state: &mut AppState, req: &Request) -> serde_json::Value {
    let index_number = match required_str(req, "indexNumber") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let class_hint = optional_str(req, "classHint");

    let resolved = {
        let conn = match db_conn(state, req) {
            Ok(v) => v,
            Err(e) => return e,
        };
        resolve::resolve(
            &db::SqliteStore::new(conn),
            &index_number,
            class_hint.as_deref(),
        )
    };
    let snap = match resolved {
        Ok(v) => v,
        Err(e) => return resolve_err(req, e),
    };

    let terms = calc::terms_present(&snap.scores);
    let mut result = json!({
        "school": snap.tenant,
        "student": snap.student,
        "scores": snap.scores,
        "terms": terms,
    });
    let snapshot_id = state.snapshots.insert(snap);
    result["snapshotId"] = json!(snapshot_id);
    ok(&req.id, result)
}

fn handle_results_term_aggregate(state: &mut AppState, req: &Request) -> serde_json::Value {
    let snap = match snapshot(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let term = match required_exact_str(req, "term") {
        Ok(v) => v,
        Err(e) => return e,
    };

    let agg = calc::aggregate(&snap.scores, &term);
    ok(
        &req.id,
        json!({
            "term": agg.term,
            "rows": calc::graded_rows(&agg),
            "count": agg.count(),
            "total": agg.total,
            "totalText": agg.total_label(),
            "average": agg.average,
            "averageText": agg.average_label(),
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "results.lookup" => Some(handle_results_lookup(state, req)),
        "results.termAggregate" => Some(handle_results_term_aggregate(state, req)),
        _ => None,
    }
}
