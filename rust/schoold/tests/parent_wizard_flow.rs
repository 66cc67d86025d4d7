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
    let exe = env!("CARGO_BIN_EXE_schoold");
    let mut child = Command::new(exe)
        .env_remove("SCHOOLD_WORKSPACE")
        .env_remove("SCHOOLD_DEFAULT_SCHOOL_ID")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn schoold");
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

fn error_code(value: &serde_json::Value) -> &str {
    assert_eq!(value.get("ok").and_then(|v| v.as_bool()), Some(false), "{}", value);
    value
        .pointer("/error/code")
        .and_then(|v| v.as_str())
        .unwrap_or("")
}

#[test]
fn parent_wizard_add_flow_persists_record_and_activity() {
    let workspace = temp_dir("schoold-parent-wizard");
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let selected = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    assert_eq!(selected["studentCount"], 10);

    let opened = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "wizard.open",
        json!({ "kind": "parent" }),
    );
    let session = opened["sessionId"].as_str().expect("sessionId").to_string();
    assert_eq!(opened["state"]["mode"], "add");
    assert_eq!(opened["state"]["stepCount"], 5);
    assert_eq!(opened["state"]["currentStep"], 0);
    assert_eq!(opened["state"]["canAdvance"], false);

    let refused = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "wizard.next",
        json!({ "sessionId": session }),
    );
    assert_eq!(refused["advanced"], false);
    assert_eq!(refused["state"]["currentStep"], 0);

    for (i, (field, value)) in [
        ("fullName", json!("Jane Doe")),
        ("email", json!("jane@example.com")),
        ("relationship", json!("mother")),
    ]
    .into_iter()
    .enumerate()
    {
        request_ok(
            &mut stdin,
            &mut reader,
            &format!("f{}", i),
            "wizard.setField",
            json!({ "sessionId": session, "field": field, "value": value }),
        );
    }
    let moved = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "wizard.next",
        json!({ "sessionId": session }),
    );
    assert_eq!(moved["advanced"], true);
    assert_eq!(moved["state"]["currentStep"], 1);

    request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "wizard.setField",
        json!({ "sessionId": session, "field": "phone", "value": "555-0100" }),
    );
    let moved = request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "wizard.next",
        json!({ "sessionId": session }),
    );
    assert_eq!(moved["state"]["currentStep"], 2);

    let added = request_ok(
        &mut stdin,
        &mut reader,
        "7",
        "wizard.children.add",
        json!({ "sessionId": session, "studentId": "3" }),
    );
    assert_eq!(added["changed"], true);
    assert_eq!(added["children"][0]["studentName"], "Olivia Brown");
    assert_eq!(added["children"][0]["grade"], "Grade 7");
    assert_eq!(added["children"][0]["gradeLevel"], 7);

    let again = request_ok(
        &mut stdin,
        &mut reader,
        "8",
        "wizard.children.add",
        json!({ "sessionId": session, "studentId": "3" }),
    );
    assert_eq!(again["changed"], false);
    assert_eq!(again["children"].as_array().map(|a| a.len()), Some(1));

    request_ok(
        &mut stdin,
        &mut reader,
        "9",
        "wizard.children.add",
        json!({ "sessionId": session, "studentId": "6" }),
    );
    let available = request_ok(
        &mut stdin,
        &mut reader,
        "10",
        "wizard.children.available",
        json!({ "sessionId": session }),
    );
    let ids: Vec<&str> = available["students"]
        .as_array()
        .expect("students")
        .iter()
        .filter_map(|s| s["id"].as_str())
        .collect();
    assert_eq!(ids.len(), 8);
    assert!(!ids.contains(&"3"));
    assert!(!ids.contains(&"6"));

    let removed = request_ok(
        &mut stdin,
        &mut reader,
        "11",
        "wizard.children.remove",
        json!({ "sessionId": session, "studentId": "6" }),
    );
    assert_eq!(removed["changed"], true);
    assert_eq!(removed["state"]["fields"]["childCount"], 1);

    let moved = request_ok(
        &mut stdin,
        &mut reader,
        "12",
        "wizard.next",
        json!({ "sessionId": session }),
    );
    assert_eq!(moved["state"]["currentStep"], 3);

    request_ok(
        &mut stdin,
        &mut reader,
        "13",
        "wizard.setField",
        json!({ "sessionId": session, "field": "hasAccountAccess", "value": true }),
    );
    let short = request_ok(
        &mut stdin,
        &mut reader,
        "14",
        "wizard.setField",
        json!({ "sessionId": session, "field": "password", "value": "abc" }),
    );
    assert_eq!(short["state"]["canAdvance"], false);
    assert_eq!(short["state"]["fields"]["passwordLength"], 3);
    assert!(short["state"]["fields"].get("password").is_none());

    let refused = request_ok(
        &mut stdin,
        &mut reader,
        "15",
        "wizard.next",
        json!({ "sessionId": session }),
    );
    assert_eq!(refused["advanced"], false);

    request_ok(
        &mut stdin,
        &mut reader,
        "16",
        "wizard.setField",
        json!({ "sessionId": session, "field": "password", "value": "secret1" }),
    );
    let moved = request_ok(
        &mut stdin,
        &mut reader,
        "17",
        "wizard.next",
        json!({ "sessionId": session }),
    );
    assert_eq!(moved["state"]["currentStep"], 4);
    assert_eq!(moved["state"]["isTerminal"], true);

    let no_consent = request(
        &mut stdin,
        &mut reader,
        "18",
        "wizard.submit",
        json!({ "sessionId": session }),
    );
    assert_eq!(error_code(&no_consent), "step_invalid");

    request_ok(
        &mut stdin,
        &mut reader,
        "19",
        "wizard.setField",
        json!({ "sessionId": session, "field": "consentGiven", "value": true }),
    );
    let done = request_ok(
        &mut stdin,
        &mut reader,
        "20",
        "wizard.next",
        json!({ "sessionId": session }),
    );
    assert_eq!(done["submitted"], true);
    let record = &done["record"];
    let parent_id = record["id"].as_str().expect("record id").to_string();
    assert!(!parent_id.is_empty());
    assert_eq!(record["fullName"], "Jane Doe");
    assert_eq!(record["relationship"], "mother");
    assert_eq!(record["children"].as_array().map(|a| a.len()), Some(1));
    assert!(record.get("password").is_none());
    assert!(record.get("passwordHash").is_none());
    assert_eq!(record["hasPassword"], true);

    let conn = rusqlite::Connection::open(workspace.join("schoold.sqlite3")).expect("open db");
    let stored: String = conn
        .query_row(
            "SELECT record_json FROM parents WHERE id = ?",
            [&parent_id],
            |r| r.get(0),
        )
        .expect("stored parent row");
    let stored: serde_json::Value = serde_json::from_str(&stored).expect("record json");
    let digest = stored["passwordHash"].as_str().expect("stored passwordHash");
    assert!(digest.contains('$'));
    assert!(!digest.contains("secret1"));

    let gone = request(
        &mut stdin,
        &mut reader,
        "21",
        "wizard.state",
        json!({ "sessionId": session }),
    );
    assert_eq!(error_code(&gone), "not_found");

    let listed = request_ok(&mut stdin, &mut reader, "22", "parents.list", json!({}));
    let rows = listed["parents"].as_array().expect("parents");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["id"], parent_id.as_str());
    assert_eq!(rows[0]["childCount"], 1);

    let searched = request_ok(
        &mut stdin,
        &mut reader,
        "23",
        "parents.list",
        json!({ "search": "nobody" }),
    );
    assert_eq!(searched["parents"].as_array().map(|a| a.len()), Some(0));

    let fetched = request_ok(
        &mut stdin,
        &mut reader,
        "24",
        "parents.get",
        json!({ "parentId": parent_id }),
    );
    assert_eq!(fetched["parent"]["phone"], "555-0100");
    assert_eq!(fetched["parent"]["consentGiven"], true);
    assert_eq!(fetched["parent"]["hasPassword"], true);
    assert!(fetched["parent"].get("passwordHash").is_none());

    let activity = request_ok(
        &mut stdin,
        &mut reader,
        "25",
        "activity.list",
        json!({ "limit": 5 }),
    );
    assert_eq!(activity["entries"][0]["action"], "parent.created");
    assert_eq!(activity["entries"][0]["entityId"], parent_id.as_str());
    assert_eq!(activity["entries"][0]["detail"], "Jane Doe");
}

#[test]
fn parent_wizard_edit_keeps_identity_and_only_jumps_back() {
    let workspace = temp_dir("schoold-parent-edit");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    let opened = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "wizard.open",
        json!({ "kind": "parent" }),
    );
    let session = opened["sessionId"].as_str().expect("sessionId").to_string();
    let edits = [
        ("fullName", json!("Sam Carter")),
        ("phone", json!("555-0199")),
        ("hasAccountAccess", json!(false)),
        ("consentGiven", json!(true)),
    ];
    for (i, (field, value)) in edits.into_iter().enumerate() {
        request_ok(
            &mut stdin,
            &mut reader,
            &format!("s{}", i),
            "wizard.setField",
            json!({ "sessionId": session, "field": field, "value": value }),
        );
    }
    request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "wizard.children.add",
        json!({ "sessionId": session, "studentId": "1" }),
    );
    let mut last = json!({});
    for i in 0..5 {
        last = request_ok(
            &mut stdin,
            &mut reader,
            &format!("n{}", i),
            "wizard.next",
            json!({ "sessionId": session }),
        );
    }
    assert_eq!(last["submitted"], true);
    let parent_id = last["record"]["id"].as_str().expect("id").to_string();
    let created_at = last["record"]["createdAt"].as_str().expect("createdAt").to_string();
    assert!(last["record"].get("passwordHash").is_none());
    assert_eq!(last["record"]["hasPassword"], false);

    let edit = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "wizard.open",
        json!({ "kind": "parent", "parentId": parent_id }),
    );
    let edit_session = edit["sessionId"].as_str().expect("sessionId").to_string();
    assert_eq!(edit["state"]["mode"], "edit");
    assert_eq!(edit["state"]["fields"]["fullName"], "Sam Carter");
    assert_eq!(edit["state"]["fields"]["childCount"], 1);

    let forward = request(
        &mut stdin,
        &mut reader,
        "5",
        "wizard.jump",
        json!({ "sessionId": edit_session, "step": 3 }),
    );
    assert_eq!(error_code(&forward), "jump_not_allowed");

    request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "wizard.setField",
        json!({ "sessionId": edit_session, "field": "occupation", "value": "Engineer" }),
    );
    for i in 0..4 {
        request_ok(
            &mut stdin,
            &mut reader,
            &format!("e{}", i),
            "wizard.next",
            json!({ "sessionId": edit_session }),
        );
    }
    let back = request_ok(
        &mut stdin,
        &mut reader,
        "7",
        "wizard.jump",
        json!({ "sessionId": edit_session, "step": 1 }),
    );
    assert_eq!(back["state"]["currentStep"], 1);
    for i in 0..3 {
        request_ok(
            &mut stdin,
            &mut reader,
            &format!("r{}", i),
            "wizard.next",
            json!({ "sessionId": edit_session }),
        );
    }
    let saved = request_ok(
        &mut stdin,
        &mut reader,
        "8",
        "wizard.submit",
        json!({ "sessionId": edit_session }),
    );
    assert_eq!(saved["submitted"], true);
    assert_eq!(saved["record"]["id"], parent_id.as_str());
    assert_eq!(saved["record"]["createdAt"], created_at.as_str());
    assert!(saved["record"]["updatedAt"].is_string());
    assert_eq!(saved["record"]["occupation"], "Engineer");

    let listed = request_ok(&mut stdin, &mut reader, "9", "parents.list", json!({}));
    assert_eq!(listed["parents"].as_array().map(|a| a.len()), Some(1));

    let activity = request_ok(&mut stdin, &mut reader, "10", "activity.list", json!({}));
    let actions: Vec<&str> = activity["entries"]
        .as_array()
        .expect("entries")
        .iter()
        .filter_map(|e| e["action"].as_str())
        .collect();
    assert_eq!(actions, vec!["parent.updated", "parent.created"]);
}
