use crate::db;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{db_conn, optional_str, required_str};
use crate::ipc::types::{AppState, Request};
use crate::models::TenantStatus;
use crate::report::parse_hex_color;
use serde_json::json;
use uuid::Uuid;

fn handle_schools_register(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let name = match required_str(req, "name") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let plan = optional_str(req, "plan").unwrap_or_else(|| "free".to_string());
    let logo_url = optional_str(req, "logoUrl");
    let theme_color = optional_str(req, "themeColor");
    if let Some(c) = &theme_color {
        if parse_hex_color(c).is_none() {
            return err(
                &req.id,
                "bad_params",
                "themeColor must look like #RRGGBB",
                Some(json!({ "themeColor": c })),
            );
        }
    }

    let school_id = Uuid::new_v4().to_string();
    let created_at = chrono::Utc::now().to_rfc3339();
    if let Err(e) = conn.execute(
        "INSERT INTO schools(id, name, plan, logo_url, theme_color, status, created_at)
         VALUES(?, ?, ?, ?, ?, ?, ?)",
        (
            &school_id,
            &name,
            &plan,
            &logo_url,
            &theme_color,
            TenantStatus::Pending.as_str(),
            &created_at,
        ),
    ) {
        return err(
            &req.id,
            "db_insert_failed",
            e.to_string(),
            Some(json!({ "table": "schools" })),
        );
    }

    tracing::info!(school_id = %school_id, "school registered");
    ok(
        &req.id,
        json!({
            "schoolId": school_id,
            "name": name,
            "status": TenantStatus::Pending.as_str()
        }),
    )
}

fn handle_schools_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return ok(&req.id, json!({ "schools": [] }));
    };

    let mut stmt = match conn.prepare(
        "SELECT
           s.id,
           s.name,
           s.plan,
           s.logo_url,
           s.theme_color,
           s.status,
           (SELECT COUNT(*) FROM students st WHERE st.school_id = s.id) AS student_count
         FROM schools s
         ORDER BY s.rowid",
    ) {
        Ok(s) => s,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };

    let rows = stmt
        .query_map([], |row| {
            let id: String = row.get(0)?;
            let name: String = row.get(1)?;
            let plan: String = row.get(2)?;
            let logo_url: Option<String> = row.get(3)?;
            let theme_color: Option<String> = row.get(4)?;
            let status: String = row.get(5)?;
            let student_count: i64 = row.get(6)?;
            Ok(json!({
                "id": id,
                "name": name,
                "plan": plan,
                "logoUrl": logo_url,
                "themeColor": theme_color,
                "status": status,
                "studentCount": student_count
            }))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>());

    match rows {
        Ok(schools) => ok(&req.id, json!({ "schools": schools })),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

fn handle_schools_set_status(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let school_id = match required_str(req, "schoolId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let status_raw = match required_str(req, "status") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let Some(status) = TenantStatus::parse(&status_raw) else {
        return err(
            &req.id,
            "bad_params",
            "status must be one of: pending, active, rejected",
            Some(json!({ "status": status_raw })),
        );
    };

    match conn.execute(
        "UPDATE schools SET status = ? WHERE id = ?",
        (status.as_str(), &school_id),
    ) {
        Ok(0) => err(&req.id, "not_found", "school not found", None),
        Ok(_) => {
            tracing::info!(school_id = %school_id, status = status.as_str(), "school status changed");
            ok(
                &req.id,
                json!({ "schoolId": school_id, "status": status.as_str() }),
            )
        }
        Err(e) => err(&req.id, "db_update_failed", e.to_string(), None),
    }
}

fn handle_schools_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let school_id = match required_str(req, "schoolId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match db::school_get(conn, &school_id) {
        Ok(Some(school)) => ok(&req.id, json!({ "school": school })),
        Ok(None) => err(&req.id, "not_found", "school not found", None),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "schools.register" => Some(handle_schools_register(state, req)),
        "schools.list" => Some(handle_schools_list(state, req)),
        "schools.get" => Some(handle_schools_get(state, req)),
        "schools.setStatus" => Some(handle_schools_set_status(state, req)),
        _ => None,
    }
}
