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
    let exe = env!("CARGO_BIN_EXE_gradebookd");
    let mut child = Command::new(exe)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn gradebookd");
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
    );
    value.get("result").cloned().unwrap_or_else(|| json!({}))
}

fn error_code(value: &serde_json::Value) -> Option<&str> {
    value
        .get("error")
        .and_then(|e| e.get("code"))
        .and_then(|v| v.as_str())
}

fn save_mark(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    exam: &str,
    value: f64,
) {
    let _ = request_ok(
        stdin,
        reader,
        id,
        "marks.gridSave",
        json!({
            "class": "6",
            "subject": "Mathematics",
            "exam": exam,
            "entries": [{ "roll": 1, "value": value }]
        }),
    );
}

#[test]
fn half_yearly_mathematics_scenario_flows_into_report_card() {
    let workspace = temp_dir("gradebook-report-card");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let _ = request_ok(&mut stdin, &mut reader, "2", "students.importDemo", json!({}));

    save_mark(&mut stdin, &mut reader, "3", "PWT1", 30.0);
    save_mark(&mut stdin, &mut reader, "4", "PWT2", 28.0);
    save_mark(&mut stdin, &mut reader, "5", "HY", 72.0);
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "coScholastic.save",
        json!({ "class": "6", "subject": "Mathematics", "term": "HY", "ma": 4, "se": 3, "pf": 3 }),
    );

    let finals = request_ok(
        &mut stdin,
        &mut reader,
        "7",
        "calc.termFinals",
        json!({ "class": "6", "subject": "Mathematics", "exam": "HY" }),
    );
    let students = finals.get("students").and_then(|v| v.as_array()).expect("students");
    assert_eq!(students.len(), 3);
    let aarav = &students[0];
    assert_eq!(aarav.get("roll").and_then(|v| v.as_u64()), Some(1));
    assert_eq!(aarav.get("bestPt").and_then(|v| v.as_f64()), Some(30.0));
    assert_eq!(aarav.get("examRaw").and_then(|v| v.as_f64()), Some(72.0));
    assert_eq!(aarav.get("termFinal").and_then(|v| v.as_f64()), Some(61.0));
    assert_eq!(aarav.get("grade").and_then(|v| v.as_str()), Some("B2"));
    // No marks for Anaya; the subject's HY co-scholastic still counts.
    assert_eq!(students[1].get("examRaw").and_then(|v| v.as_f64()), Some(0.0));
    assert_eq!(students[1].get("bestPt").and_then(|v| v.as_f64()), Some(0.0));
    assert_eq!(students[1].get("termFinal").and_then(|v| v.as_f64()), Some(10.0));
    assert_eq!(students[1].get("grade").and_then(|v| v.as_str()), Some("E"));

    let report = request_ok(
        &mut stdin,
        &mut reader,
        "8",
        "reports.reportCard",
        json!({ "class": "6", "roll": 1 }),
    );
    assert_eq!(
        report
            .get("school")
            .and_then(|s| s.get("schoolName"))
            .and_then(|v| v.as_str()),
        Some("EMRS Ghughri")
    );
    let card = report.get("card").expect("card");
    assert_eq!(card.get("name").and_then(|v| v.as_str()), Some("Aarav"));
    let subjects = card.get("subjects").and_then(|v| v.as_array()).expect("subjects");
    let names: Vec<&str> = subjects
        .iter()
        .map(|s| s.get("subject").and_then(|v| v.as_str()).expect("subject"))
        .collect();
    assert_eq!(
        names,
        vec!["English", "Hindi", "Mathematics", "Science", "Social Science", "Sanskrit"]
    );
    let maths = &subjects[2];
    assert_eq!(maths.get("hyFinal").and_then(|v| v.as_f64()), Some(61.0));
    assert_eq!(maths.get("anFinal").and_then(|v| v.as_f64()), Some(0.0));
    assert_eq!(maths.get("overallFinal").and_then(|v| v.as_f64()), Some(24.4));
    assert_eq!(maths.get("grade").and_then(|v| v.as_str()), Some("E"));
    assert_eq!(card.get("total").and_then(|v| v.as_f64()), Some(24.4));
    assert_eq!(card.get("maxTotal").and_then(|v| v.as_f64()), Some(600.0));
    assert_eq!(card.get("percentage").and_then(|v| v.as_f64()), Some(4.1));
    assert_eq!(card.get("overallGrade").and_then(|v| v.as_str()), Some("E"));
    assert_eq!(
        report.get("signatures"),
        Some(&json!(["Class Teacher", "Principal", "Date"]))
    );

    let missing = request(
        &mut stdin,
        &mut reader,
        "9",
        "reports.reportCard",
        json!({ "class": "6", "roll": 42 }),
    );
    assert_eq!(error_code(&missing), Some("not_found"));
    assert_eq!(
        missing
            .get("error")
            .and_then(|e| e.get("message"))
            .and_then(|v| v.as_str()),
        Some("Student not found in Class 6.")
    );
    let zero_roll = request(
        &mut stdin,
        &mut reader,
        "10",
        "reports.reportCard",
        json!({ "class": "6", "roll": 0 }),
    );
    assert_eq!(error_code(&zero_roll), Some("not_found"));

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn school_setup_is_printed_on_report_cards() {
    let workspace = temp_dir("gradebook-report-setup");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let defaults = request_ok(&mut stdin, &mut reader, "2", "setup.get", json!({}));
    assert_eq!(
        defaults
            .get("school")
            .and_then(|s| s.get("session"))
            .and_then(|v| v.as_str()),
        Some("2024–25")
    );

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "setup.update",
        json!({ "section": "school", "patch": { "session": "2025–26" } }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "setup.update",
        json!({ "section": "reports", "patch": { "showSignatureLines": false } }),
    );
    let rejected = request(
        &mut stdin,
        &mut reader,
        "5",
        "setup.update",
        json!({ "section": "school", "patch": { "principal": "x" } }),
    );
    assert_eq!(error_code(&rejected), Some("bad_params"));

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "students.add",
        json!({ "class": 8, "roll": 5, "name": "Meera" }),
    );
    let report = request_ok(
        &mut stdin,
        &mut reader,
        "7",
        "reports.reportCard",
        json!({ "class": "8", "roll": "5" }),
    );
    assert_eq!(
        report
            .get("school")
            .and_then(|s| s.get("session"))
            .and_then(|v| v.as_str()),
        Some("2025–26")
    );
    assert_eq!(report.get("signatures"), Some(&json!([])));

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}
