//! Digest, HMAC and encoding capabilities against published vectors.

use hashgen::{Engine, FailureKind, InvocationRequest};

fn eval(body: &str) -> Result<String, hashgen::Failure> {
    let src = format!("fn generate(payload, passcode) {{ {body} }}");
    Engine::default().run(&src, &InvocationRequest::new(serde_json::Map::new(), "key"))
}

#[test]
fn sha256_of_abc() {
    assert_eq!(
        eval(r#"return hex(hash("sha256", "abc"));"#),
        Ok("ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad".to_owned())
    );
}

#[test]
fn md5_and_sha1_of_empty_input() {
    assert_eq!(
        eval(r#"return hex(hash("md5", ""));"#),
        Ok("d41d8cd98f00b204e9800998ecf8427e".to_owned())
    );
    assert_eq!(
        eval(r#"return hex(hash("sha1", ""));"#),
        Ok("da39a3ee5e6b4b0d3255bfef95601890afd80709".to_owned())
    );
}

#[test]
fn hmac_sha256_of_the_fox() {
    let body = r#"return hex(keyedHash("sha256", passcode, "The quick brown fox jumps over the lazy dog"));"#;
    assert_eq!(
        eval(body),
        Ok("f7bc83f430538424b13298e6aa6fb143ef4d59a14946175997479dbc2d1a3cd8".to_owned())
    );
}

#[test]
fn hmac_digest_as_base64() {
    let body = r#"return encode(keyedHash("sha256", passcode, "The quick brown fox jumps over the lazy dog"));"#;
    assert_eq!(
        eval(body),
        Ok("97yD9DBThCSxMpjmqm+xQ+9NWaFJRhdZl0edvC0aPNg=".to_owned())
    );
}

#[test]
fn base64_round_trip_through_snippet() {
    assert_eq!(
        eval(r#"return text(decode(encode("héllo")));"#),
        Ok("héllo".to_owned())
    );
}

#[test]
fn unknown_algorithm_is_a_runtime_error() {
    let failure = eval(r#"return hex(hash("whirlpool", "abc"));"#).expect_err("fails");
    assert_eq!(failure.kind, FailureKind::RuntimeError);
    assert!(failure.detail.contains("whirlpool"));
}

#[test]
fn wrong_arity_is_a_runtime_error() {
    let failure = eval(r#"return hex(hash("sha256"));"#).expect_err("fails");
    assert_eq!(failure.kind, FailureKind::RuntimeError);
}
