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

const FEATURE_KEYS: [&str; 11] = [
    "applications",
    "students",
    "teachers",
    "parents",
    "payments",
    "academicProgress",
    "attendance",
    "calendar",
    "timetable",
    "announcements",
    "activityLog",
];

#[test]
fn flags_default_to_enabled_without_workspace() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let current = request_ok(&mut stdin, &mut reader, "1", "school.current.get", json!({}));
    assert_eq!(current["schoolId"], "1");

    let defaults = request_ok(&mut stdin, &mut reader, "2", "features.defaults", json!({}));
    let got = request_ok(&mut stdin, &mut reader, "3", "features.get", json!({}));
    assert_eq!(got["schoolId"], "1");
    assert_eq!(got["features"], defaults["features"]);
    for key in FEATURE_KEYS {
        assert_eq!(got["features"][key], true, "{}", key);
    }
    assert_eq!(got["features"].as_object().map(|o| o.len()), Some(11));

    // Session memory backs the store until a workspace is selected.
    let toggled = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "features.toggle",
        json!({ "feature": "calendar", "enabled": false }),
    );
    assert_eq!(toggled["persisted"], true);
    let got = request_ok(&mut stdin, &mut reader, "5", "features.get", json!({}));
    assert_eq!(got["features"]["calendar"], false);
}

#[test]
fn flags_are_per_school_and_survive_restart() {
    let workspace = temp_dir("schoold-features");

    {
        let (_child, mut stdin, mut reader) = spawn_sidecar();
        request_ok(
            &mut stdin,
            &mut reader,
            "1",
            "workspace.select",
            json!({ "path": workspace.to_string_lossy() }),
        );

        let toggled = request_ok(
            &mut stdin,
            &mut reader,
            "2",
            "features.toggle",
            json!({ "feature": "parents", "enabled": false }),
        );
        assert_eq!(toggled["schoolId"], "1");
        assert_eq!(toggled["persisted"], true);
        assert_eq!(toggled["features"]["parents"], false);

        let got = request_ok(&mut stdin, &mut reader, "3", "features.get", json!({}));
        for key in FEATURE_KEYS {
            assert_eq!(got["features"][key], key != "parents", "{}", key);
        }

        let unknown = request(
            &mut stdin,
            &mut reader,
            "4",
            "features.toggle",
            json!({ "feature": "bogus", "enabled": true }),
        );
        assert_eq!(error_code(&unknown), "bad_params");
        assert_eq!(
            unknown
                .pointer("/error/details/known")
                .and_then(|v| v.as_array())
                .map(|a| a.len()),
            Some(11)
        );

        request_ok(&mut stdin, &mut reader, "5", "school.current.set", json!({ "schoolId": "42" }));
        let other = request_ok(&mut stdin, &mut reader, "6", "features.get", json!({}));
        assert_eq!(other["schoolId"], "42");
        assert_eq!(other["features"]["parents"], true);

        let partial = request_ok(
            &mut stdin,
            &mut reader,
            "7",
            "features.set",
            json!({ "features": { "attendance": false } }),
        );
        assert_eq!(partial["schoolId"], "42");
        assert_eq!(partial["features"]["attendance"], false);
        assert_eq!(partial["features"]["payments"], true);

        let explicit = request_ok(
            &mut stdin,
            &mut reader,
            "8",
            "features.get",
            json!({ "schoolId": "1" }),
        );
        assert_eq!(explicit["features"]["parents"], false);
        assert_eq!(explicit["features"]["attendance"], true);

        let bad = request(
            &mut stdin,
            &mut reader,
            "9",
            "features.set",
            json!({ "features": [true, false] }),
        );
        assert_eq!(error_code(&bad), "bad_params");

        let activity = request_ok(&mut stdin, &mut reader, "10", "activity.list", json!({}));
        let actions: Vec<&str> = activity["entries"]
            .as_array()
            .expect("entries")
            .iter()
            .filter_map(|e| e["action"].as_str())
            .collect();
        assert_eq!(actions, vec!["features.set", "features.toggle"]);
    }

    let (_child, mut stdin, mut reader) = spawn_sidecar();
    request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let current = request_ok(&mut stdin, &mut reader, "2", "school.current.get", json!({}));
    assert_eq!(current["schoolId"], "42");
    let school_one = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "features.get",
        json!({ "schoolId": "1" }),
    );
    assert_eq!(school_one["features"]["parents"], false);
    let school_42 = request_ok(&mut stdin, &mut reader, "4", "features.get", json!({}));
    assert_eq!(school_42["features"]["attendance"], false);
}

#[test]
fn toggle_to_current_value_is_not_logged() {
    let workspace = temp_dir("schoold-features-noop");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let same = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "features.toggle",
        json!({ "feature": "students", "enabled": true }),
    );
    assert_eq!(same["persisted"], true);
    let activity = request_ok(&mut stdin, &mut reader, "3", "activity.list", json!({}));
    assert_eq!(activity["entries"].as_array().map(|a| a.len()), Some(0));
}

#[test]
fn set_rejects_misspelled_flag_names_and_keeps_stored_flags() {
    let workspace = temp_dir("schoold-features-typo");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "features.toggle",
        json!({ "schoolId": "1", "feature": "payments", "enabled": false }),
    );

    let typo = request(
        &mut stdin,
        &mut reader,
        "3",
        "features.set",
        json!({ "schoolId": "1", "features": { "parent": false, "activitylog": false } }),
    );
    assert_eq!(error_code(&typo), "bad_params");
    let message = typo
        .pointer("/error/message")
        .and_then(|v| v.as_str())
        .unwrap_or("");
    assert!(message.contains("parent"), "{}", message);
    assert!(message.contains("activitylog"), "{}", message);
    assert_eq!(
        typo
            .pointer("/error/details/known")
            .and_then(|v| v.as_array())
            .map(|a| a.len()),
        Some(11)
    );

    let toggle_typo = request(
        &mut stdin,
        &mut reader,
        "4",
        "features.toggle",
        json!({ "schoolId": "1", "feature": "parent", "enabled": false }),
    );
    assert_eq!(error_code(&toggle_typo), "bad_params");

    let got = request_ok(&mut stdin, &mut reader, "5", "features.get", json!({ "schoolId": "1" }));
    assert_eq!(got["features"]["payments"], false);
    assert_eq!(got["features"]["parents"], true);
    assert_eq!(got["features"]["activityLog"], true);

    let activity = request_ok(&mut stdin, &mut reader, "6", "activity.list", json!({}));
    assert_eq!(activity["entries"].as_array().map(|a| a.len()), Some(1));
}
