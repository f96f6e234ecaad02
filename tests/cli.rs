use rusqlite::{Connection, params};
use serde_json::{Value, json};
use std::ffi::OsStr;
use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::{TempDir, tempdir};

const KEY: &str = "0a1b2c3d4e5f60718293a4b5c6d7e8f90a1b2c3d4e5f60718293a4b5c6d7e8f9";

/// A fake Signal directory: `config.json` plus `sql/db.sqlite` with one group
/// "Friends" (g1) and one incoming message in it at sent_at 5000.
fn signal_dir() -> TempDir {
    let dir = tempdir().unwrap_or_else(|err| panic!("failed to create temp dir: {err}"));
    fs::write(
        dir.path().join("config.json"),
        json!({ "key": KEY }).to_string(),
    )
    .unwrap();
    fs::create_dir(dir.path().join("sql")).unwrap();

    let conn = Connection::open(dir.path().join("sql").join("db.sqlite")).unwrap();
    conn.execute_batch(&format!(
        "PRAGMA key = \"x'{KEY}'\";
         PRAGMA cipher_page_size = 4096;
         PRAGMA kdf_iter = 64000;
         PRAGMA cipher_hmac_algorithm = HMAC_SHA512;
         PRAGMA cipher_kdf_algorithm = PBKDF2_HMAC_SHA512;
         CREATE TABLE conversations (id STRING PRIMARY KEY, json TEXT, type STRING, name TEXT, uuid STRING);
         CREATE TABLE messages (id STRING PRIMARY KEY, json TEXT, conversationId STRING, sent_at INTEGER, type STRING, sourceUuid STRING);"
    ))
    .unwrap();
    conn.execute(
        "INSERT INTO conversations (id, type, name, uuid) VALUES (?1, ?2, ?3, ?4)",
        params!["g1", "group", "Friends", Option::<&str>::None],
    )
    .unwrap();
    conn.execute(
        "INSERT INTO conversations (id, type, name, uuid) VALUES (?1, ?2, ?3, ?4)",
        params!["p1", "private", "Alice", "u-alice"],
    )
    .unwrap();
    conn.execute(
        "INSERT INTO messages (id, json, conversationId, sent_at, type, sourceUuid)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            "m1",
            r#"{"body":"hi","sent_at":5000}"#,
            "g1",
            5000,
            "incoming",
            "u-alice"
        ],
    )
    .unwrap();
    dir
}

fn run_export<I, S>(workdir: &Path, args: I) -> Output
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    Command::new(env!("CARGO_BIN_EXE_signal-json-export"))
        .current_dir(workdir)
        .env_remove("RUST_LOG")
        .args(args)
        .output()
        .unwrap_or_else(|err| panic!("failed to execute binary: {err}"))
}

fn assert_success(output: &Output) {
    assert!(
        output.status.success(),
        "command failed (status={}):\nstdout:\n{}\nstderr:\n{}",
        output.status,
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
}

fn read_json(path: &Path) -> Value {
    let body = fs::read_to_string(path)
        .unwrap_or_else(|err| panic!("failed to read {}: {err}", path.display()));
    serde_json::from_str(&body).unwrap_or_else(|err| panic!("invalid JSON: {err}\n{body}"))
}

#[test]
fn exports_friends_chat() {
    let signal = signal_dir();
    let work = tempdir().unwrap();

    let output = run_export(
        work.path(),
        [OsStr::new("--source"), signal.path().as_os_str(), OsStr::new("--ts"), OsStr::new("1000")],
    );
    assert_success(&output);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Signal database exported as output/json_data_1000.json"));

    let written = read_json(&work.path().join("output/json_data_1000.json"));
    assert_eq!(
        written,
        json!({
            "groups_name_id": [{"id": "g1", "name": "Friends"}],
            "messsages": [{"body": "hi", "sent_at": 5000}],
        })
    );
}

#[test]
fn list_chats_prints_names_and_writes_nothing() {
    let signal = signal_dir();
    let work = tempdir().unwrap();

    let output = run_export(
        work.path(),
        [OsStr::new("--source"), signal.path().as_os_str(), OsStr::new("-l")],
    );
    assert_success(&output);
    assert_eq!(String::from_utf8_lossy(&output.stdout), "'Friends'\n");
    assert!(!work.path().join("output").exists());
}

#[test]
fn cutoff_after_message_exports_empty_list() {
    let signal = signal_dir();
    let work = tempdir().unwrap();

    let output = run_export(
        work.path(),
        [OsStr::new("--source"), signal.path().as_os_str(), OsStr::new("--ts"), OsStr::new("6000")],
    );
    assert_success(&output);

    let written = read_json(&work.path().join("output/json_data_6000.json"));
    assert_eq!(written["messsages"], json!([]));
}

#[test]
fn export_config_in_working_dir_filters_chats() {
    let signal = signal_dir();
    let work = tempdir().unwrap();
    fs::write(
        work.path().join("export_config.json"),
        r#"{"groups": "'Work'"}"#,
    )
    .unwrap();

    let output = run_export(
        work.path(),
        [OsStr::new("--source"), signal.path().as_os_str(), OsStr::new("--ts"), OsStr::new("1000")],
    );
    assert_success(&output);
    let written = read_json(&work.path().join("output/json_data_1000.json"));
    assert_eq!(written["messsages"], json!([]));

    // --chats takes precedence over the file
    let output = run_export(
        work.path(),
        [
            OsStr::new("--source"),
            signal.path().as_os_str(),
            OsStr::new("--ts"),
            OsStr::new("1000"),
            OsStr::new("--chats"),
            OsStr::new("Friends"),
        ],
    );
    assert_success(&output);
    let written = read_json(&work.path().join("output/json_data_1000.json"));
    assert_eq!(written["messsages"].as_array().map(Vec::len), Some(1));
}

#[test]
fn missing_config_json_fails() {
    let signal = tempdir().unwrap();
    let work = tempdir().unwrap();

    let output = run_export(work.path(), [OsStr::new("--source"), signal.path().as_os_str()]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("config.json not found"), "stderr:\n{stderr}");
}

#[test]
fn wrong_key_fails() {
    let signal = signal_dir();
    let work = tempdir().unwrap();
    fs::write(
        signal.path().join("config.json"),
        json!({ "key": "f".repeat(64) }).to_string(),
    )
    .unwrap();

    let output = run_export(work.path(), [OsStr::new("--source"), signal.path().as_os_str()]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Failed to open encrypted database"), "stderr:\n{stderr}");
    assert!(!stderr.contains("hmac check failed"), "stderr:\n{stderr}");
    assert!(!work.path().join("output").exists());
}

#[test]
fn explicit_config_file_replaces_working_dir_default() {
    let signal = signal_dir();
    let work = tempdir().unwrap();
    fs::write(work.path().join("export_config.json"), r#"{"groups": ["Work"]}"#).unwrap();
    let chosen = work.path().join("friends_only.json");
    fs::write(&chosen, r#"{"groups": "'Friends'"}"#).unwrap();

    let output = run_export(
        work.path(),
        [
            OsStr::new("--source"),
            signal.path().as_os_str(),
            OsStr::new("--ts"),
            OsStr::new("1000"),
            OsStr::new("--config"),
            chosen.as_os_str(),
        ],
    );
    assert_success(&output);
    let written = read_json(&work.path().join("output/json_data_1000.json"));
    assert_eq!(written["messsages"].as_array().map(Vec::len), Some(1));

    let missing = work.path().join("nope.json");
    let output = run_export(
        work.path(),
        [OsStr::new("--source"), signal.path().as_os_str(), OsStr::new("--config"), missing.as_os_str()],
    );
    assert!(!output.status.success());
}
