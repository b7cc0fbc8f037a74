//! `FileStore` persistence and on-disk format.

use std::fs;
use std::sync::Arc;
use std::thread;

use hashgen::store::defaults::{ABA_HMAC_SHA256, SORTED_HMAC_SHA256};
use hashgen::{AlgorithmDefinition, AlgorithmStore, FileStore, StoreError};

#[test]
fn fresh_store_lists_defaults_in_order() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = FileStore::open(dir.path().join("snippets.json"), true).expect("open");
    assert_eq!(
        store.list().expect("list"),
        vec![ABA_HMAC_SHA256.to_owned(), SORTED_HMAC_SHA256.to_owned()]
    );
    let aba = store.get(ABA_HMAC_SHA256).expect("present");
    assert_eq!(aba.description, "Original ABA HMAC-SHA256 Implementation");
    assert!(aba.source.contains("fn generate"));
}

#[test]
fn saved_algorithms_survive_reopen() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("snippets.json");
    {
        let store = FileStore::open(&path, false).expect("open");
        let definition = AlgorithmDefinition::new("  mine  ", "fn generate(p, c) { return c; }")
            .with_description("echo");
        store.put(definition).expect("put");
    }
    let reopened = FileStore::open(&path, true).expect("reopen");
    assert_eq!(reopened.list().expect("list"), vec!["mine".to_owned()]);
    let mine = reopened.get("mine").expect("present");
    assert_eq!(mine.source, "fn generate(p, c) { return c; }");
    assert_eq!(mine.description, "echo");
}

#[test]
fn delete_persists() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("snippets.json");
    let store = FileStore::open(&path, true).expect("open");
    store.delete(ABA_HMAC_SHA256).expect("delete");
    assert!(matches!(
        store.delete(ABA_HMAC_SHA256),
        Err(StoreError::NotFound(_))
    ));
    drop(store);

    let reopened = FileStore::open(&path, true).expect("reopen");
    assert_eq!(
        reopened.list().expect("list"),
        vec![SORTED_HMAC_SHA256.to_owned()]
    );
}

#[test]
fn reads_hand_written_catalogue() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("snippets.json");
    fs::write(
        &path,
        r#"{
  "legacy": { "code": "fn generate(p, c) { return \"L\"; }" },
  "described": { "code": "fn generate(p, c) { return \"D\"; }", "description": "has one" }
}"#,
    )
    .expect("write");
    let store = FileStore::open(&path, true).expect("open");
    assert_eq!(store.list().expect("list"), vec!["legacy", "described"]);
    assert_eq!(store.get("legacy").expect("present").description, "");
}

#[test]
fn on_disk_format_is_name_keyed_code_entries() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("snippets.json");
    let store = FileStore::open(&path, false).expect("open");
    store
        .put(AlgorithmDefinition::new("x", "SRC"))
        .expect("put");
    let doc: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&path).expect("read")).expect("json");
    assert_eq!(doc["x"]["code"], "SRC");
    assert_eq!(doc["x"]["description"], "");
}

#[test]
fn invalid_names_are_rejected() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = FileStore::open(dir.path().join("s.json"), false).expect("open");
    assert!(matches!(
        store.put(AlgorithmDefinition::new("   ", "src")),
        Err(StoreError::InvalidName(_))
    ));
}

#[test]
fn concurrent_writers_all_land() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("snippets.json");
    let store = Arc::new(FileStore::open(&path, false).expect("open"));

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                store
                    .put(AlgorithmDefinition::new(format!("algo-{i}"), "src"))
                    .expect("put");
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("thread completes");
    }
    drop(store);

    let reopened = FileStore::open(&path, false).expect("reopen");
    assert_eq!(reopened.list().expect("list").len(), 8);
}
