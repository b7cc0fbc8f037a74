//! Entry-point contract and failure classification.

use hashgen::{Engine, Failure, FailureKind, InvocationRequest};

fn request(payload: serde_json::Value, passcode: &str) -> InvocationRequest {
    let serde_json::Value::Object(map) = payload else {
        panic!("payload must be an object");
    };
    InvocationRequest::new(map, passcode)
}

fn run(source: &str) -> Result<String, Failure> {
    Engine::default().run(source, &request(serde_json::json!({"a": "1"}), "pw"))
}

#[test]
fn non_string_return_is_a_contract_error() {
    let failure = run("fn generate(payload, passcode) { return 42; }").expect_err("fails");
    assert_eq!(failure.kind, FailureKind::ContractError);
    assert_eq!(failure.detail, "generate must return a string, got int");
}

#[test]
fn missing_entry_point_is_a_contract_error() {
    let failure = run("fn helper(a, b) { return a; }").expect_err("fails");
    assert_eq!(failure.kind, FailureKind::ContractError);
    assert!(failure.detail.contains("generate"));
}

#[test]
fn entry_point_with_one_parameter_is_rejected() {
    let failure = run(r#"fn generate(payload) { return "x"; }"#).expect_err("fails");
    assert_eq!(failure.kind, FailureKind::ContractError);
}

#[test]
fn entry_point_requiring_five_arguments_is_rejected() {
    let failure = run(r#"fn generate(a, b, c, d, e) { return "x"; }"#).expect_err("fails");
    assert_eq!(failure.kind, FailureKind::ContractError);
}

#[test]
fn syntax_error_is_a_load_error() {
    let failure = run("fn generate(payload, passcode) { return 1 +; }").expect_err("fails");
    assert_eq!(failure.kind, FailureKind::LoadError);
    assert!(failure.detail.contains("line"), "detail: {}", failure.detail);
}

#[test]
fn engine_is_usable_after_a_load_error() {
    let engine = Engine::default();
    let req = request(serde_json::json!({}), "pw");
    assert_eq!(
        engine.run("fn generate(", &req).map_err(|f| f.kind),
        Err(FailureKind::LoadError)
    );
    assert_eq!(
        engine.run(r#"fn generate(p, c) { return "ok"; }"#, &req),
        Ok("ok".to_owned())
    );
}

#[test]
fn faults_inside_generate_are_runtime_errors() {
    let failure = run("fn generate(payload, passcode) { return str(1 / 0); }").expect_err("fails");
    assert_eq!(failure.kind, FailureKind::RuntimeError);
}

#[test]
fn fail_builtin_message_reaches_the_caller() {
    let failure = run(r#"fn generate(payload, passcode) { fail("bad payload"); }"#)
        .expect_err("fails");
    assert_eq!(failure.kind, FailureKind::RuntimeError);
    assert!(failure.detail.contains("bad payload"));
}

#[test]
fn check_accepts_valid_and_rejects_invalid_sources() {
    let engine = Engine::default();
    assert_eq!(
        engine.check(r#"fn generate(payload, passcode) { return "x"; }"#),
        Ok(())
    );
    assert_eq!(
        engine.check("let = 1;").map_err(|f| f.kind),
        Err(FailureKind::LoadError)
    );
    assert_eq!(
        engine.check("fn other(a, b) { return a; }").map_err(|f| f.kind),
        Err(FailureKind::ContractError)
    );
}

#[test]
fn unknown_function_is_a_runtime_error() {
    let failure = run("fn generate(payload, passcode) { return readFile(passcode); }")
        .expect_err("fails");
    assert_eq!(failure.kind, FailureKind::RuntimeError);
}
