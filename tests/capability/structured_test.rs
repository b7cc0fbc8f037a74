//! `parseStructured` / `serializeStructured` preserve structure and order.

use hashgen::{Engine, FailureKind, InvocationRequest};

fn run(src: &str, payload: serde_json::Value) -> Result<String, hashgen::Failure> {
    let serde_json::Value::Object(map) = payload else {
        panic!("payload must be an object");
    };
    Engine::default().run(src, &InvocationRequest::new(map, "pw"))
}

#[test]
fn json_round_trip_preserves_key_order() {
    let src = r#"
fn generate(payload, passcode) {
    return serializeStructured(parseStructured(payload["doc"]));
}
"#;
    let doc = r#"{"z":1,"a":[true,null,"s"],"m":{"y":2.5,"b":"c"}}"#;
    assert_eq!(
        run(src, serde_json::json!({ "doc": doc })),
        Ok(doc.to_owned())
    );
}

#[test]
fn payload_serializes_in_insertion_order() {
    let src = "fn generate(payload, passcode) { return serializeStructured(payload); }";
    assert_eq!(
        run(src, serde_json::json!({ "b": "2", "a": 1 })),
        Ok(r#"{"b":"2","a":1}"#.to_owned())
    );
}

#[test]
fn parsed_values_are_indexable() {
    let src = r#"
fn generate(payload, passcode) {
    let doc = parseStructured("{\"items\": [10, 20, 30]}");
    return str(doc["items"][-1] + len(doc["items"]));
}
"#;
    assert_eq!(run(src, serde_json::json!({})), Ok("33".to_owned()));
}

#[test]
fn invalid_json_is_a_runtime_error() {
    let src = r#"fn generate(payload, passcode) { return str(parseStructured("{oops")); }"#;
    let failure = run(src, serde_json::json!({})).expect_err("fails");
    assert_eq!(failure.kind, FailureKind::RuntimeError);
}

#[test]
fn bytes_cannot_be_serialized() {
    let src = r#"fn generate(payload, passcode) { return serializeStructured(hash("sha256", "x")); }"#;
    let failure = run(src, serde_json::json!({})).expect_err("fails");
    assert_eq!(failure.kind, FailureKind::RuntimeError);
}

#[test]
fn unsigned_64_bit_integers_round_trip_exactly() {
    let src = r#"
fn generate(payload, passcode) {
    return serializeStructured(parseStructured(payload["doc"]));
}
"#;
    let doc = r#"{"n":18446744073709551615,"m":-9223372036854775808}"#;
    assert_eq!(
        run(src, serde_json::json!({ "doc": doc })),
        Ok(doc.to_owned())
    );
}

#[test]
fn large_payload_integers_render_exactly() {
    let src = r#"fn generate(payload, passcode) { return str(payload["n"] - 1); }"#;
    let payload: serde_json::Value =
        serde_json::from_str(r#"{"n": 18446744073709551615}"#).expect("valid json");
    assert_eq!(run(src, payload), Ok("18446744073709551614".to_owned()));
}
