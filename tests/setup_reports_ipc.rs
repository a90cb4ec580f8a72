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

fn request_ok(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let value = request(stdin, reader, id, method, params);
    assert!(
        value.get("ok").and_then(|v| v.as_bool()).unwrap_or(false),
        "{} failed: {}",
        method,
        value
            .get("error")
            .and_then(|e| e.get("message"))
            .and_then(|v| v.as_str())
            .unwrap_or("unknown error")
    );
    value.get("result").cloned().unwrap_or_else(|| json!({}))
}

fn request_err_code(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> String {
    let value = request(stdin, reader, id, method, params);
    assert_eq!(
        value.get("ok").and_then(|v| v.as_bool()),
        Some(false),
        "{} unexpectedly succeeded",
        method
    );
    value
        .get("error")
        .and_then(|e| e.get("code"))
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string()
}

struct Sidecar {
    child: Child,
    stdin: ChildStdin,
    reader: BufReader<ChildStdout>,
    next_id: u64,
}

impl Sidecar {
    fn start(workspace: &PathBuf) -> Self {
        let (child, stdin, reader) = spawn_sidecar();
        let mut s = Self {
            child,
            stdin,
            reader,
            next_id: 0,
        };
        s.ok(
            "workspace.select",
            json!({ "path": workspace.to_string_lossy() }),
        );
        s
    }

    fn id(&mut self) -> String {
        self.next_id += 1;
        self.next_id.to_string()
    }

    fn ok(&mut self, method: &str, params: serde_json::Value) -> serde_json::Value {
        let id = self.id();
        request_ok(&mut self.stdin, &mut self.reader, &id, method, params)
    }

    fn err_code(&mut self, method: &str, params: serde_json::Value) -> String {
        let id = self.id();
        request_err_code(&mut self.stdin, &mut self.reader, &id, method, params)
    }

    fn register_school(&mut self, name: &str) -> String {
        let res = self.ok("schools.register", json!({ "name": name }));
        res.get("schoolId")
            .and_then(|v| v.as_str())
            .expect("schoolId")
            .to_string()
    }

    fn enroll(&mut self, school_id: &str, name: &str, index: &str, class_name: &str) -> String {
        let res = self.ok(
            "students.enroll",
            json!({
                "schoolId": school_id,
                "fullName": name,
                "indexNumber": index,
                "className": class_name
            }),
        );
        res.get("studentId")
            .and_then(|v| v.as_str())
            .expect("studentId")
            .to_string()
    }

    fn mark(&mut self, student_id: &str, subject: &str, score: f64, term: &str) {
        self.ok(
            "marks.record",
            json!({
                "studentId": student_id,
                "subject": subject,
                "score": score,
                "term": term
            }),
        );
    }

    fn finish(mut self) {
        drop(self.stdin);
        let _ = self.child.wait();
    }
}

#[test]
fn report_settings_defaults_and_updates() {
    let workspace = temp_dir("resultsd-setup-reports");
    let mut sc = Sidecar::start(&workspace);

    let setup = sc.ok("setup.get", json!({}));
    let reports = setup.get("reports").expect("reports section");
    assert_eq!(reports.get("remarkPolicy"), Some(&json!("tiered")));
    assert_eq!(reports.get("academicYear"), Some(&json!("2024/2025")));
    assert_eq!(reports.get("showGeneratedAt"), Some(&json!(true)));

    sc.ok(
        "setup.update",
        json!({
            "section": "reports",
            "patch": {
                "remarkPolicy": "passFail",
                "academicYear": "2025/2026",
                "showGeneratedAt": false
            }
        }),
    );

    let school = sc.register_school("Shelbyville High");
    let student = sc.enroll(&school, "Nelson Muntz", "S-77", "Grade 5");
    sc.mark(&student, "History", 62.0, "Term 2");
    sc.mark(&student, "Math", 38.0, "Term 2");
    let found = sc.ok("results.lookup", json!({ "indexNumber": "S-77" }));
    let snapshot_id = found
        .get("snapshotId")
        .and_then(|v| v.as_str())
        .expect("snapshotId")
        .to_string();

    let model = sc.ok(
        "reports.reportCardModel",
        json!({ "snapshotId": snapshot_id, "term": "Term 2" }),
    );
    assert_eq!(model.get("remarkPolicy"), Some(&json!("passFail")));
    assert_eq!(model.get("generatedAt"), Some(&json!(null)));
    let rows = model.get("rows").and_then(|v| v.as_array()).expect("rows");
    assert_eq!(rows[0].get("remark"), Some(&json!("Pass")));
    assert_eq!(rows[1].get("remark"), Some(&json!("Fail")));
    let year = model
        .get("identity")
        .and_then(|v| v.as_array())
        .and_then(|rows| {
            rows.iter()
                .find(|r| r.get("label") == Some(&json!("Academic Year")))
        })
        .and_then(|r| r.get("value"))
        .cloned();
    assert_eq!(year, Some(json!("2025/2026")));

    sc.finish();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn report_settings_reject_bad_patches() {
    let workspace = temp_dir("resultsd-setup-bad");
    let mut sc = Sidecar::start(&workspace);

    for patch in [
        json!({ "remarkPolicy": "letters" }),
        json!({ "headerColor": "blue" }),
        json!({ "academicYear": "" }),
        json!({ "showGeneratedAt": "yes" }),
        json!({ "fontSize": 12 }),
    ] {
        assert_eq!(
            sc.err_code("setup.update", json!({ "section": "reports", "patch": patch })),
            "bad_params"
        );
    }
    assert_eq!(
        sc.err_code("setup.update", json!({ "section": "billing", "patch": {} })),
        "bad_params"
    );

    let setup = sc.ok("setup.get", json!({}));
    assert_eq!(
        setup.get("reports").and_then(|r| r.get("remarkPolicy")),
        Some(&json!("tiered"))
    );

    sc.finish();
    let _ = std::fs::remove_dir_all(workspace);
}
