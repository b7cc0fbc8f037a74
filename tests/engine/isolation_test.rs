//! Determinism, fresh environments, concurrency and the wall-clock budget.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use hashgen::capability::clock::FixedClock;
use hashgen::capability::CapabilityRegistry;
use hashgen::script::Limits;
use hashgen::{Engine, EngineConfig, FailureKind, InvocationRequest};

const FOX: &str = "The quick brown fox jumps over the lazy dog";

fn request(payload: serde_json::Value, passcode: &str) -> InvocationRequest {
    let serde_json::Value::Object(map) = payload else {
        panic!("payload must be an object");
    };
    InvocationRequest::new(map, passcode)
}

#[test]
fn identical_inputs_give_identical_digests() {
    let engine = Engine::default();
    let src = r#"
fn generate(payload, passcode) {
    return hex(keyedHash("sha256", passcode, payload["msg"]));
}
"#;
    let req = request(serde_json::json!({ "msg": FOX }), "key");
    let first = engine.run(src, &req).expect("runs");
    let second = engine.run(src, &req).expect("runs");
    assert_eq!(first, second);
    assert_eq!(
        first,
        "f7bc83f430538424b13298e6aa6fb143ef4d59a14946175997479dbc2d1a3cd8"
    );
}

#[test]
fn definitions_do_not_leak_between_invocations() {
    let engine = Engine::default();
    let req = request(serde_json::json!({}), "pw");
    let with_helper = r#"
fn helper() { return "from helper"; }
fn generate(payload, passcode) { return helper(); }
"#;
    assert_eq!(engine.run(with_helper, &req), Ok("from helper".to_owned()));

    let without_helper = "fn generate(payload, passcode) { return helper(); }";
    let failure = engine.run(without_helper, &req).expect_err("fails");
    assert_eq!(failure.kind, FailureKind::RuntimeError);
    assert!(failure.detail.contains("helper"));
}

#[test]
fn payload_mutation_inside_generate_is_not_visible_to_the_caller() {
    let engine = Engine::default();
    let src = r#"
fn generate(payload, passcode) {
    payload["injected"] = "yes";
    return str(len(payload));
}
"#;
    let req = request(serde_json::json!({ "a": "1" }), "pw");
    assert_eq!(engine.run(src, &req), Ok("2".to_owned()));
    assert_eq!(req.payload.len(), 1);
    assert_eq!(engine.run(src, &req), Ok("2".to_owned()));
}

#[test]
fn runaway_loop_times_out_and_engine_stays_usable() {
    let engine = Engine::new(EngineConfig {
        timeout: Some(Duration::from_millis(200)),
        limits: Limits {
            max_steps: 0,
            ..Limits::default()
        },
        ..EngineConfig::default()
    });
    let req = request(serde_json::json!({}), "pw");

    let started = Instant::now();
    let failure = engine
        .run("fn generate(p, c) { while true { } }", &req)
        .expect_err("times out");
    assert_eq!(failure.kind, FailureKind::Timeout);
    assert!(started.elapsed() < Duration::from_secs(5));

    assert_eq!(
        engine.run(r#"fn generate(p, c) { return "next"; }"#, &req),
        Ok("next".to_owned())
    );
}

#[test]
fn step_budget_stops_runaway_loops_without_a_timeout() {
    let engine = Engine::new(EngineConfig {
        timeout: None,
        limits: Limits {
            max_steps: 10_000,
            ..Limits::default()
        },
        ..EngineConfig::default()
    });
    let failure = engine
        .run(
            "fn generate(p, c) { while true { } }",
            &request(serde_json::json!({}), "pw"),
        )
        .expect_err("fails");
    assert_eq!(failure.kind, FailureKind::RuntimeError);
    assert!(failure.detail.contains("step budget"));
}

#[test]
fn deep_recursion_is_a_runtime_error() {
    let engine = Engine::default();
    let src = r#"
fn down(n) { return down(n + 1); }
fn generate(payload, passcode) { return down(0); }
"#;
    let failure = engine
        .run(src, &request(serde_json::json!({}), "pw"))
        .expect_err("fails");
    assert_eq!(failure.kind, FailureKind::RuntimeError);
    assert!(failure.detail.contains("RecursionError"));
}

#[test]
fn concurrent_runs_are_independent() {
    let engine = Arc::new(Engine::default());
    let src = r#"fn generate(payload, passcode) { return passcode + ":" + payload["n"]; }"#;

    let handles: Vec<_> = (0..16)
        .map(|i| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                let req = request(serde_json::json!({ "n": i.to_string() }), &format!("pw{i}"));
                (i, engine.run(src, &req))
            })
        })
        .collect();

    for handle in handles {
        let (i, out) = handle.join().expect("thread completes");
        assert_eq!(out, Ok(format!("pw{i}:{i}")));
    }
}

#[test]
fn injected_clock_makes_time_deterministic() {
    let clock = Arc::new(FixedClock::from_millis(1_700_000_000_123));
    let registry = CapabilityRegistry::with_clock(clock);
    let engine = Engine::with_capabilities(EngineConfig::default(), registry);
    let src = r#"
fn generate(payload, passcode) {
    return str(nowEpochSeconds()) + "/" + str(nowEpochMillis());
}
"#;
    assert_eq!(
        engine.run(src, &request(serde_json::json!({}), "pw")),
        Ok("1700000000/1700000000123".to_owned())
    );
}
