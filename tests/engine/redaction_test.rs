//! Failure details never echo secrets or host paths.

use hashgen::engine::redactor::{Redactor, PATH_MARKER, REDACTION_MARKER};
use hashgen::{Engine, EngineConfig, FailureKind, InvocationRequest};

fn request(passcode: &str, api_key: &str) -> InvocationRequest {
    InvocationRequest::new(serde_json::Map::new(), passcode).with_api_key(api_key)
}

#[test]
fn passcode_in_a_fault_message_is_masked() {
    let src = r#"fn generate(payload, passcode) { fail("rejected " + passcode); }"#;
    let failure = Engine::default()
        .run(src, &request("hunter2-secret", ""))
        .expect_err("fails");
    assert_eq!(failure.kind, FailureKind::RuntimeError);
    assert!(!failure.detail.contains("hunter2-secret"));
    assert!(failure.detail.contains(REDACTION_MARKER));
}

#[test]
fn api_key_in_a_key_error_is_masked() {
    let src = "fn generate(payload, passcode, api_key) { return payload[api_key]; }";
    let failure = Engine::default()
        .run(src, &request("pw", "sk-live-123456"))
        .expect_err("fails");
    assert_eq!(failure.kind, FailureKind::RuntimeError);
    assert!(!failure.detail.contains("sk-live-123456"));
}

#[test]
fn host_paths_are_masked() {
    let src = r#"fn generate(payload, passcode) { fail("cannot open /home/alice/.hashgen/snippets.json"); }"#;
    let failure = Engine::default()
        .run(src, &request("pw", ""))
        .expect_err("fails");
    assert!(!failure.detail.contains("/home/alice"));
    assert!(failure.detail.contains(PATH_MARKER));
}

#[test]
fn long_details_are_truncated() {
    let engine = Engine::new(EngineConfig {
        max_detail_len: 40,
        ..EngineConfig::default()
    });
    let src = r#"
fn generate(payload, passcode) {
    let msg = "";
    for i in range(100) { msg = msg + "x"; }
    fail(msg);
}
"#;
    let failure = engine.run(src, &request("pw", "")).expect_err("fails");
    assert!(failure.detail.chars().count() <= 40, "detail: {}", failure.detail);
}

#[test]
fn short_secrets_are_left_alone() {
    let redactor = Redactor::new(["abc", "longer-secret"], 0);
    assert_eq!(
        redactor.redact("abc and longer-secret"),
        format!("abc and {REDACTION_MARKER}")
    );
}
