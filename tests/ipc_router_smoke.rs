use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

fn spawn_sidecar() -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_resultsd");
    let mut child = Command::new(exe)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn resultsd");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

fn request(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let payload = json!({
        "id": id,
        "method": method,
        "params": params,
    });
    writeln!(stdin, "{}", payload).expect("write request");
    stdin.flush().expect("flush request");

    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    assert!(!line.trim().is_empty(), "empty response for {}", method);
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse response json");
    assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
    value
}

#[test]
fn router_dispatch_smoke_covers_handler_families() {
    let workspace = temp_dir("resultsd-router-smoke");
    let out_dir = workspace.join("out");

    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let calls = [
        ("health", json!({})),
        ("workspace.select", json!({ "path": workspace.to_string_lossy() })),
        ("schools.register", json!({ "name": "Smoke School" })),
        ("schools.list", json!({})),
        ("schools.get", json!({ "schoolId": "missing" })),
        ("schools.setStatus", json!({ "schoolId": "missing", "status": "active" })),
        ("students.enroll", json!({ "schoolId": "missing" })),
        ("students.list", json!({ "schoolId": "missing" })),
        ("marks.record", json!({ "studentId": "missing" })),
        ("marks.list", json!({ "studentId": "missing" })),
        ("results.lookup", json!({ "indexNumber": "missing" })),
        ("results.termAggregate", json!({ "snapshotId": "missing", "term": "Term 1" })),
        ("reports.reportCardModel", json!({ "snapshotId": "missing", "term": "Term 1" })),
        (
            "reports.exportReportCard",
            json!({ "snapshotId": "missing", "term": "Term 1", "outDir": out_dir.to_string_lossy() }),
        ),
        ("setup.get", json!({})),
        ("setup.update", json!({ "section": "reports", "patch": {} })),
    ];

    for (i, (method, params)) in calls.iter().enumerate() {
        let value = request(
            &mut stdin,
            &mut reader,
            &i.to_string(),
            method,
            params.clone(),
        );
        let code = value
            .get("error")
            .and_then(|e| e.get("code"))
            .and_then(|v| v.as_str())
            .unwrap_or("");
        assert_ne!(code, "not_implemented", "unexpected unknown method for {}", method);
    }

    let unknown = request(&mut stdin, &mut reader, "x", "billing.charge", json!({}));
    assert_eq!(
        unknown
            .get("error")
            .and_then(|e| e.get("code"))
            .and_then(|v| v.as_str()),
        Some("not_implemented")
    );

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}
