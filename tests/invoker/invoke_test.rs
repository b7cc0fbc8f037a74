//! Name resolution, request validation and async fan-out.

use std::sync::Arc;

use hashgen::store::defaults::SORTED_HMAC_SHA256;
use hashgen::{
    AlgorithmDefinition, AlgorithmStore, Engine, Failure, FailureKind, FileStore,
    InvocationRequest, Invoker, MemoryStore,
};
use serde_json::json;

fn invoker_over(store: Arc<dyn AlgorithmStore>) -> Invoker {
    Invoker::new(store, Engine::default())
}

#[test]
fn unknown_name_is_not_found() {
    let invoker = invoker_over(Arc::new(MemoryStore::with_defaults()));
    let failure = invoker
        .invoke("nonexistent-name", &json!({}), "pw", None, None)
        .expect_err("fails");
    assert_eq!(failure.kind, FailureKind::NotFound);
    assert_eq!(failure, Failure::not_found("nonexistent-name"));
}

#[test]
fn non_object_payload_is_invalid_input() {
    let invoker = invoker_over(Arc::new(MemoryStore::with_defaults()));
    for payload in [json!("text"), json!(1), json!(null), json!([1])] {
        let failure = invoker
            .invoke(SORTED_HMAC_SHA256, &payload, "pw", None, None)
            .expect_err("fails");
        assert_eq!(failure.kind, FailureKind::InvalidInput);
    }
}

#[test]
fn newly_saved_algorithm_is_invocable_by_name() {
    let store: Arc<dyn AlgorithmStore> = Arc::new(MemoryStore::new());
    let invoker = invoker_over(Arc::clone(&store));
    store
        .put(AlgorithmDefinition::new(
            "upper",
            "fn generate(payload, passcode) { return upper(payload[\"v\"]); }",
        ))
        .expect("put");
    assert_eq!(
        invoker.invoke("upper", &json!({"v": "abc"}), "pw", None, None),
        Ok("ABC".to_owned())
    );
}

#[test]
fn broken_stored_algorithm_is_a_load_error() {
    let store = MemoryStore::new();
    store
        .put(AlgorithmDefinition::new("broken", "fn generate(payload, passcode {"))
        .expect("put");
    let failure = invoker_over(Arc::new(store))
        .invoke("broken", &json!({}), "pw", None, None)
        .expect_err("fails");
    assert_eq!(failure.kind, FailureKind::LoadError);
}

#[test]
fn invoke_request_runs_against_a_file_store() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = FileStore::open(dir.path().join("snippets.json"), true).expect("open");
    let invoker = invoker_over(Arc::new(store));

    let mut payload = serde_json::Map::new();
    payload.insert("b".to_owned(), json!("2"));
    payload.insert("a".to_owned(), json!("1"));
    let request = InvocationRequest::new(payload, "key");
    assert_eq!(
        invoker.invoke_request(SORTED_HMAC_SHA256, &request),
        Ok("9dbd4edd16f0ff60d8421dda7a074e4cb0264d29e6fbb51d63d79498fd47c59e".to_owned())
    );
}

#[tokio::test]
async fn async_invocations_run_concurrently() {
    let invoker = Arc::new(invoker_over(Arc::new(MemoryStore::with_defaults())));

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let invoker = Arc::clone(&invoker);
            tokio::spawn(async move {
                invoker
                    .invoke_async(
                        SORTED_HMAC_SHA256.to_owned(),
                        json!({ "v": i.to_string() }),
                        "key".to_owned(),
                        None,
                        None,
                    )
                    .await
            })
        })
        .collect();

    let mut digests = Vec::new();
    for handle in handles {
        digests.push(handle.await.expect("task completes").expect("runs"));
    }
    digests.sort();
    digests.dedup();
    assert_eq!(digests.len(), 8);
}
