//! Reference digests for the seeded algorithms.

use std::sync::Arc;

use hashgen::store::defaults::{ABA_HMAC_SHA256, SORTED_HMAC_SHA256};
use hashgen::{Engine, FailureKind, Invoker, MemoryStore};
use serde_json::json;

const ABA_PASSCODE: &str = "secretkey0123456789abcdef";

fn invoker() -> Invoker {
    Invoker::new(Arc::new(MemoryStore::with_defaults()), Engine::default())
}

fn keys(names: &[&str]) -> Option<Vec<String>> {
    Some(names.iter().map(|k| (*k).to_owned()).collect())
}

#[test]
fn sorted_hmac_uses_sorted_key_order() {
    let digest = invoker()
        .invoke(SORTED_HMAC_SHA256, &json!({"b": "2", "a": "1"}), "key", None, None)
        .expect("runs");
    assert_eq!(
        digest,
        "9dbd4edd16f0ff60d8421dda7a074e4cb0264d29e6fbb51d63d79498fd47c59e"
    );
}

#[test]
fn sorted_hmac_honours_explicit_key_order() {
    let digest = invoker()
        .invoke(
            SORTED_HMAC_SHA256,
            &json!({"b": "2", "a": "1"}),
            "key",
            None,
            keys(&["b", "a"]),
        )
        .expect("runs");
    assert_eq!(
        digest,
        "2f2ef70fb33b7f152018c1f9abb511cf2e65814d2f11278de99e449db099336a"
    );
}

#[test]
fn sorted_hmac_renders_non_string_values() {
    let digest = invoker()
        .invoke(
            SORTED_HMAC_SHA256,
            &json!({"c": true, "a": 1, "b": 2.5}),
            "pw-sorted",
            None,
            None,
        )
        .expect("runs");
    assert_eq!(
        digest,
        "1e4b8636e0744f2d8331316a7733447cd0caa718b4b2580eca783b26da580bbc"
    );
}

#[test]
fn aba_signs_iv_api_key_and_values() {
    let digest = invoker()
        .invoke(
            ABA_HMAC_SHA256,
            &json!({"amount": "100", "currency": "USD", "hash": "ignored"}),
            ABA_PASSCODE,
            Some("API"),
            None,
        )
        .expect("runs");
    assert_eq!(
        digest,
        "b6ae7b29c519a1627f6be5509d86de241b3fe63bf3a4f0499bd31af0bb5fcfb5"
    );
}

#[test]
fn aba_follows_key_order() {
    let digest = invoker()
        .invoke(
            ABA_HMAC_SHA256,
            &json!({"amount": "100", "currency": "USD"}),
            ABA_PASSCODE,
            Some("API"),
            keys(&["currency", "amount"]),
        )
        .expect("runs");
    assert_eq!(
        digest,
        "c5a28aca760dda6e8d97112c3e8448baa92c66e9c8ebb9eb0f5d0079a96ce349"
    );
}

#[test]
fn aba_without_api_key_stringifies_numbers() {
    let digest = invoker()
        .invoke(
            ABA_HMAC_SHA256,
            &json!({"amount": 100, "currency": "USD", "n": 7}),
            ABA_PASSCODE,
            None,
            None,
        )
        .expect("runs");
    assert_eq!(
        digest,
        "196f12c6f1f17a1ca6dd9dbfeaf19a22ad08c102ce01d45847c54d147fd68305"
    );
}

#[test]
fn aba_renders_values_like_python_str() {
    let payload: serde_json::Value = serde_json::from_str(
        r#"{"a": true, "b": 1e-7, "c": {"x": 1}, "d": 18446744073709551615}"#,
    )
    .expect("valid json");
    let digest = invoker()
        .invoke(ABA_HMAC_SHA256, &payload, "kkkk0123456789abcdef", None, None)
        .expect("runs");
    assert_eq!(
        digest,
        "a8ba40b75b9153f86e4d2f97225f039232ea47da3fbd038dfbfe69f1eeaf871a"
    );
}

#[test]
fn aba_renders_nested_lists_and_special_floats_like_python() {
    let payload: serde_json::Value = serde_json::from_str(
        r#"{"list": [1, "it's", null, false, 2.5], "s": "plain", "big": 1e16, "neg": -0.0}"#,
    )
    .expect("valid json");
    let digest = invoker()
        .invoke(ABA_HMAC_SHA256, &payload, "kkkk0123456789abcdef", Some("API"), None)
        .expect("runs");
    assert_eq!(
        digest,
        "e31ff812fbae12b50d5cab7fad7d7a7ddc5c050bc21948a6f37cdd62cbc151af"
    );
}

#[test]
fn aba_rejects_short_passcode_without_echoing_it() {
    let failure = invoker()
        .invoke(ABA_HMAC_SHA256, &json!({"a": "1"}), "short-pass", None, None)
        .expect_err("fails");
    assert_eq!(failure.kind, FailureKind::RuntimeError);
    assert!(failure.detail.contains("16 characters"), "detail: {}", failure.detail);
    assert!(!failure.detail.contains("short-pass"));
}
