//! In-memory store.

use std::sync::RwLock;

use super::{normalize_name, AlgorithmDefinition, AlgorithmStore, Catalog, StoreError};

/// Store that lives and dies with the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    catalog: RwLock<Catalog>,
}

impl MemoryStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with `definitions`, in order.
    pub fn with_definitions(definitions: Vec<AlgorithmDefinition>) -> Self {
        Self {
            catalog: RwLock::new(Catalog::with_definitions(definitions)),
        }
    }

    /// Store pre-populated with the built-in default algorithms.
    pub fn with_defaults() -> Self {
        Self::with_definitions(super::defaults::default_algorithms())
    }
}

fn poisoned() -> StoreError {
    StoreError::Io(std::io::Error::other("store lock poisoned"))
}

impl AlgorithmStore for MemoryStore {
    fn get(&self, name: &str) -> Result<AlgorithmDefinition, StoreError> {
        self.catalog.read().map_err(|_| poisoned())?.get(name)
    }

    fn put(&self, mut definition: AlgorithmDefinition) -> Result<(), StoreError> {
        definition.name = normalize_name(&definition.name)?;
        self.catalog
            .write()
            .map_err(|_| poisoned())?
            .insert(definition);
        Ok(())
    }

    fn list(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.catalog.read().map_err(|_| poisoned())?.names())
    }

    fn delete(&self, name: &str) -> Result<(), StoreError> {
        self.catalog.write().map_err(|_| poisoned())?.remove(name)
    }
}
