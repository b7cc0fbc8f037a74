//! `MemoryStore` behaviour through the `AlgorithmStore` trait.

use std::sync::Arc;

use hashgen::{AlgorithmDefinition, AlgorithmStore, MemoryStore, StoreError};

#[test]
fn put_get_overwrite_delete() {
    let store: Arc<dyn AlgorithmStore> = Arc::new(MemoryStore::new());
    store
        .put(AlgorithmDefinition::new("a", "v1"))
        .expect("put");
    store
        .put(AlgorithmDefinition::new("a", "v2"))
        .expect("overwrite");
    assert_eq!(store.get(" a ").expect("present").source, "v2");
    assert_eq!(store.list().expect("list"), vec!["a".to_owned()]);

    store.delete("a").expect("delete");
    assert!(matches!(store.get("a"), Err(StoreError::NotFound(_))));
}

#[test]
fn defaults_are_present() {
    let store = MemoryStore::with_defaults();
    assert_eq!(store.list().expect("list").len(), 2);
}
