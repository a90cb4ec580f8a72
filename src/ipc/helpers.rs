use crate::ipc::error::err;
use crate::ipc::types::{AppState, Request};
use crate::resolve::ResultSnapshot;
use rusqlite::Connection;

pub fn required_str(req: &Request, key: &str) -> Result<String, serde_json::Value> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| err(&req.id, "bad_params", format!("missing {}", key), None))
}

/// Like `required_str` but hands back the value as sent, for exact-match keys.
pub fn required_exact_str(req: &Request, key: &str) -> Result<String, serde_json::Value> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .filter(|v| !v.trim().is_empty())
        .map(|v| v.to_string())
        .ok_or_else(|| err(&req.id, "bad_params", format!("missing {}", key), None))
}

pub fn optional_str(req: &Request, key: &str) -> Option<String> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub fn db_conn<'a>(state: &'a AppState, req: &Request) -> Result<&'a Connection, serde_json::Value> {
    state
        .db
        .as_ref()
        .ok_or_else(|| err(&req.id, "no_workspace", "select a workspace first", None))
}

pub fn snapshot<'a>(
    state: &'a AppState,
    req: &Request,
) -> Result<&'a ResultSnapshot, serde_json::Value> {
    let id = required_str(req, "snapshotId")?;
    state.snapshots.get(&id).ok_or_else(|| {
        err(
            &req.id,
            "unknown_snapshot",
            "lookup expired, search again",
            None,
        )
    })
}
