use crate::calc;
use crate::grading::RemarkPolicy;
use crate::ipc::error::{err, ok};
use crate::ipc::handlers::setup;
use crate::ipc::helpers::{optional_str, required_exact_str, required_str, snapshot};
use crate::ipc::types::{AppState, Request};
use crate::report::{self, ReportCardModel, ReportSettings};
use anyhow::Context;
use serde_json::json;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

fn report_settings(state: &AppState, req: &Request) -> Result<ReportSettings, serde_json::Value> {
    let mut settings = match state.db.as_ref() {
        Some(conn) => setup::load_report_settings(conn)
            .map_err(|e| err(&req.id, "db_query_failed", e.to_string(), None))?,
        None => ReportSettings::default(),
    };
    if let Some(raw) = optional_str(req, "remarkPolicy") {
        settings.remark_policy = RemarkPolicy::parse(&raw).ok_or_else(|| {
            err(
                &req.id,
                "bad_params",
                "remarkPolicy must be one of: tiered, passFail",
                Some(json!({ "remarkPolicy": raw })),
            )
        })?;
    }
    Ok(settings)
}

fn build_model(state: &AppState, req: &Request) -> Result<ReportCardModel, serde_json::Value> {
    let snap = snapshot(state, req)?;
    let term = required_exact_str(req, "term")?;
    let settings = report_settings(state, req)?;

    let agg = calc::aggregate(&snap.scores, &term);
    let generated_at = chrono::Local::now().format("%Y-%m-%d %H:%M").to_string();
    Ok(ReportCardModel::build(
        &snap.tenant,
        &snap.student,
        &agg,
        &settings,
        Some(generated_at),
    ))
}

fn handle_reports_report_card_model(state: &mut AppState, req: &Request) -> serde_json::Value {
    match build_model(state, req) {
        Ok(model) => ok(&req.id, json!(model)),
        Err(e) => e,
    }
}

fn write_report(out_dir: &Path, model: &ReportCardModel) -> anyhow::Result<(PathBuf, usize, String)> {
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("failed to create directory {}", out_dir.to_string_lossy()))?;
    let bytes = report::render_pdf(model);
    let path = out_dir.join(&model.file_name);
    std::fs::write(&path, &bytes)
        .with_context(|| format!("failed to write {}", path.to_string_lossy()))?;

    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok((path, bytes.len(), format!("{:x}", hasher.finalize())))
}

fn handle_reports_export_report_card(state: &mut AppState, req: &Request) -> serde_json::Value {
    let out_dir = match required_str(req, "outDir") {
        Ok(v) => PathBuf::from(v),
        Err(e) => return e,
    };
    let model = match build_model(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };

    match write_report(&out_dir, &model) {
        Ok((path, bytes, sha256)) => {
            tracing::info!(path = %path.to_string_lossy(), bytes, "report card exported");
            ok(
                &req.id,
                json!({
                    "path": path.to_string_lossy(),
                    "fileName": model.file_name,
                    "rowCount": model.rows.len(),
                    "bytes": bytes,
                    "sha256": sha256,
                }),
            )
        }
        Err(e) => err(&req.id, "export_failed", format!("{e:#}"), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "reports.reportCardModel" => Some(handle_reports_report_card_model(state, req)),
        "reports.exportReportCard" => Some(handle_reports_export_report_card(state, req)),
        _ => None,
    }
}
