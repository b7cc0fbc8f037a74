//! End-to-end CLI behaviour against a temporary store.

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use tempfile::TempDir;

const SORTED_DIGEST: &str = "9dbd4edd16f0ff60d8421dda7a074e4cb0264d29e6fbb51d63d79498fd47c59e";

fn hashgen(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("hashgen").expect("binary builds");
    cmd.env("HASHGEN_CONFIG_PATH", dir.join("config.toml"))
        .env("HASHGEN_SNIPPETS_PATH", dir.join("snippets.json"))
        .env_remove("RUST_LOG")
        .env_remove("HASHGEN_LOGS_DIR");
    cmd
}

fn stdout_of(cmd: &mut Command) -> String {
    let output = cmd.output().expect("runs");
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8(output.stdout).expect("utf-8")
}

#[test]
fn list_shows_seeded_defaults() {
    let dir = TempDir::new().expect("tempdir");
    let out = stdout_of(hashgen(dir.path()).arg("list"));
    assert_eq!(out, "ABA HMAC SHA256\nSorted HMAC SHA256\n");
    assert!(dir.path().join("snippets.json").exists());
}

#[test]
fn run_prints_the_digest() {
    let dir = TempDir::new().expect("tempdir");
    let out = stdout_of(hashgen(dir.path()).args([
        "run",
        "Sorted HMAC SHA256",
        "--payload",
        r#"{"b":"2","a":"1"}"#,
        "--passcode",
        "key",
    ]));
    assert_eq!(out.trim(), SORTED_DIGEST);
}

#[test]
fn run_with_keys_and_payload_file() {
    let dir = TempDir::new().expect("tempdir");
    let payload = dir.path().join("payload.json");
    fs::write(&payload, r#"{"b":"2","a":"1"}"#).expect("write");
    let payload_arg = format!("@{}", payload.display());
    let out = stdout_of(hashgen(dir.path()).args([
        "run",
        "Sorted HMAC SHA256",
        "--payload",
        payload_arg.as_str(),
        "--passcode",
        "key",
        "--keys",
        "b, a",
    ]));
    assert_eq!(
        out.trim(),
        "2f2ef70fb33b7f152018c1f9abb511cf2e65814d2f11278de99e449db099336a"
    );
}

#[test]
fn run_unknown_name_reports_not_found() {
    let dir = TempDir::new().expect("tempdir");
    let output = hashgen(dir.path())
        .args(["run", "nonexistent-name", "--payload", "{}", "--passcode", "pw"])
        .output()
        .expect("runs");
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("error[NotFound]"), "stderr: {stderr}");
    assert!(output.stdout.is_empty());
}

#[test]
fn run_rejects_non_object_payload() {
    let dir = TempDir::new().expect("tempdir");
    let output = hashgen(dir.path())
        .args(["run", "Sorted HMAC SHA256", "--payload", "[1,2]", "--passcode", "pw"])
        .output()
        .expect("runs");
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("error[InvalidInput]"));
}

#[test]
fn save_show_run_delete() {
    let dir = TempDir::new().expect("tempdir");
    let source = dir.path().join("echo.hg");
    let code = "fn generate(payload, passcode) { return \"echo:\" + passcode; }\n";
    fs::write(&source, code).expect("write");
    let source_arg = source.display().to_string();

    stdout_of(hashgen(dir.path()).args([
        "save",
        "echo",
        "--file",
        source_arg.as_str(),
        "--description",
        "returns the passcode",
    ]));
    assert_eq!(stdout_of(hashgen(dir.path()).args(["show", "echo"])), code);

    let out = stdout_of(hashgen(dir.path()).args([
        "run", "echo", "--payload", "{}", "--passcode", "pw",
    ]));
    assert_eq!(out.trim(), "echo:pw");

    stdout_of(hashgen(dir.path()).args(["delete", "echo"]));
    let output = hashgen(dir.path())
        .args(["show", "echo"])
        .output()
        .expect("runs");
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("error[NotFound]"));
}

#[test]
fn save_refuses_broken_source() {
    let dir = TempDir::new().expect("tempdir");
    let output = hashgen(dir.path())
        .args(["save", "broken"])
        .write_stdin("fn generate(payload, passcode {")
        .output()
        .expect("runs");
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("error[LoadError]"));

    let listed = stdout_of(hashgen(dir.path()).arg("list"));
    assert!(!listed.contains("broken"));
}

#[test]
fn check_reads_stdin() {
    let dir = TempDir::new().expect("tempdir");
    let out = stdout_of(
        hashgen(dir.path())
            .arg("check")
            .write_stdin("fn generate(payload, passcode) { return \"x\"; }"),
    );
    assert_eq!(out.trim(), "ok");

    let output = hashgen(dir.path())
        .arg("check")
        .write_stdin("fn nothing(a, b) { return a; }")
        .output()
        .expect("runs");
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("error[ContractError]"));
}

#[test]
fn batch_prints_one_line_per_request_in_order() {
    let dir = TempDir::new().expect("tempdir");
    let batch = dir.path().join("batch.json");
    fs::write(
        &batch,
        r#"[
  {"algorithm": "Sorted HMAC SHA256", "payload": {"b": "2", "a": "1"}, "passcode": "key"},
  {"algorithm": "missing", "payload": {}, "passcode": "pw"},
  {"algorithm": "Sorted HMAC SHA256", "payload": {"b": "2", "a": "1"}, "passcode": "key", "key_order": ["b", "a"]}
]"#,
    )
    .expect("write");

    let output = hashgen(dir.path())
        .arg("batch")
        .arg(&batch)
        .output()
        .expect("runs");
    assert_eq!(output.status.code(), Some(1));

    let lines: Vec<serde_json::Value> = String::from_utf8(output.stdout)
        .expect("utf-8")
        .lines()
        .map(|line| serde_json::from_str(line).expect("json line"))
        .collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0]["index"], 0);
    assert_eq!(lines[0]["digest"], SORTED_DIGEST);
    assert_eq!(lines[1]["error"]["kind"], "NotFound");
    assert_eq!(
        lines[2]["digest"],
        "2f2ef70fb33b7f152018c1f9abb511cf2e65814d2f11278de99e449db099336a"
    );
}

#[test]
fn config_file_relocates_the_store() {
    let dir = TempDir::new().expect("tempdir");
    let store = dir.path().join("elsewhere").join("algos.json");
    let config = dir.path().join("custom.toml");
    fs::write(
        &config,
        format!(
            "[store]\npath = {:?}\nseed_defaults = false\n",
            store.display().to_string()
        ),
    )
    .expect("write");

    let mut cmd = Command::cargo_bin("hashgen").expect("binary builds");
    cmd.env_remove("HASHGEN_SNIPPETS_PATH")
        .env_remove("RUST_LOG")
        .arg("--config")
        .arg(&config)
        .arg("list");
    assert_eq!(stdout_of(&mut cmd), "");
    assert!(store.exists());
}

#[test]
fn capabilities_lists_names_with_arity_and_summary() {
    let dir = TempDir::new().expect("tempdir");
    let out = stdout_of(hashgen(dir.path()).arg("capabilities"));
    let keyed = out
        .lines()
        .find(|line| line.starts_with("keyedHash/3"))
        .expect("keyedHash listed");
    assert!(keyed.contains("HMAC of message under key"));
    assert!(out.lines().any(|line| line.starts_with("serializeStructured/1-2")));
    assert_eq!(out.lines().count(), 8);
}
