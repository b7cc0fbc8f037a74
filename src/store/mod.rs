//! Named algorithm persistence.
//!
//! [`AlgorithmStore`] is the seam: the invoker only ever sees the trait.
//! [`FileStore`] keeps the whole catalogue in one JSON document;
//! [`MemoryStore`] keeps it in memory.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

pub mod defaults;
pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

/// Store failures.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No definition is stored under the name.
    #[error("no algorithm named '{0}'")]
    NotFound(String),
    /// The name is empty or contains control characters.
    #[error("invalid algorithm name {0:?}")]
    InvalidName(String),
    /// Reading or writing the backing storage failed.
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// The backing storage holds something that is not a catalogue.
    #[error("store format error: {0}")]
    Format(String),
}

/// A named algorithm: source text plus an optional description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlgorithmDefinition {
    /// Unique name.
    pub name: String,
    /// Source text defining `generate`.
    pub source: String,
    /// Free-form description; empty when unset.
    #[serde(default)]
    pub description: String,
}

impl AlgorithmDefinition {
    /// Definition without a description.
    pub fn new(name: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: source.into(),
            description: String::new(),
        }
    }

    /// Set the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// Keyed persistence of algorithm definitions.
///
/// `put` is last-write-wins; there is no versioning. `list` returns names in
/// insertion order and overwriting a name keeps its position.
pub trait AlgorithmStore: Send + Sync + fmt::Debug {
    /// Fetch a definition.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] when absent, or a backing-storage error.
    fn get(&self, name: &str) -> Result<AlgorithmDefinition, StoreError>;

    /// Insert or replace a definition.
    ///
    /// # Errors
    ///
    /// [`StoreError::InvalidName`] or a backing-storage error.
    fn put(&self, definition: AlgorithmDefinition) -> Result<(), StoreError>;

    /// Stored names in insertion order.
    ///
    /// # Errors
    ///
    /// A backing-storage error.
    fn list(&self) -> Result<Vec<String>, StoreError>;

    /// Remove a definition.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] when absent, or a backing-storage error.
    fn delete(&self, name: &str) -> Result<(), StoreError>;
}

/// Trim `name` and reject empty or control-character names.
///
/// # Errors
///
/// [`StoreError::InvalidName`].
pub fn normalize_name(name: &str) -> Result<String, StoreError> {
    let trimmed = name.trim();
    if trimmed.is_empty() || trimmed.chars().any(char::is_control) {
        return Err(StoreError::InvalidName(name.to_owned()));
    }
    Ok(trimmed.to_owned())
}

// ---------------------------------------------------------------------------
// Catalogue
// ---------------------------------------------------------------------------

/// On-disk entry: `{ "code": ..., "description": ... }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct Entry {
    code: String,
    #[serde(default)]
    description: String,
}

/// Ordered catalogue shared by both store implementations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub(crate) struct Catalog {
    entries: IndexMap<String, Entry>,
}

impl Catalog {
    pub(crate) fn with_definitions(definitions: Vec<AlgorithmDefinition>) -> Self {
        let mut catalog = Self::default();
        for definition in definitions {
            catalog.insert(definition);
        }
        catalog
    }

    pub(crate) fn get(&self, name: &str) -> Result<AlgorithmDefinition, StoreError> {
        let key = name.trim();
        self.entries
            .get(key)
            .map(|entry| AlgorithmDefinition {
                name: key.to_owned(),
                source: entry.code.clone(),
                description: entry.description.clone(),
            })
            .ok_or_else(|| StoreError::NotFound(key.to_owned()))
    }

    /// Caller has already normalised the name.
    pub(crate) fn insert(&mut self, definition: AlgorithmDefinition) {
        self.entries.insert(
            definition.name,
            Entry {
                code: definition.source,
                description: definition.description,
            },
        );
    }

    pub(crate) fn remove(&mut self, name: &str) -> Result<(), StoreError> {
        let key = name.trim();
        self.entries
            .shift_remove(key)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(key.to_owned()))
    }

    pub(crate) fn names(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}
