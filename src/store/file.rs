//! JSON-file store.
//!
//! The whole catalogue is one pretty-printed JSON object keyed by name:
//!
//! ```json
//! { "ABA HMAC SHA256": { "code": "fn generate(...) { ... }", "description": "..." } }
//! ```
//!
//! The in-memory copy is authoritative while the store is open. Writes hold
//! the write lock across the file update, so readers always observe a state
//! that is also on disk.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use tracing::{debug, info, warn};

use super::{normalize_name, AlgorithmDefinition, AlgorithmStore, Catalog, StoreError};

/// Store persisted to a single JSON file.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    catalog: RwLock<Catalog>,
}

impl FileStore {
    /// Open the store at `path`.
    ///
    /// A missing file is created; it is seeded with the default algorithms
    /// when `seed_defaults` is set, otherwise left empty.
    ///
    /// # Errors
    ///
    /// [`StoreError::Format`] if the file exists but is not a catalogue
    /// (it is never silently replaced), or [`StoreError::Io`].
    pub fn open(path: impl Into<PathBuf>, seed_defaults: bool) -> Result<Self, StoreError> {
        let path = path.into();
        let catalog = match fs::read_to_string(&path) {
            Ok(text) => parse_catalog(&path, &text)?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                let catalog = if seed_defaults {
                    Catalog::with_definitions(super::defaults::default_algorithms())
                } else {
                    Catalog::default()
                };
                write_atomically(&path, &catalog)?;
                info!(
                    path = %path.display(),
                    count = catalog.len(),
                    "created algorithm store"
                );
                catalog
            }
            Err(e) => return Err(StoreError::Io(e)),
        };
        debug!(path = %path.display(), count = catalog.len(), "algorithm store opened");
        Ok(Self {
            path,
            catalog: RwLock::new(catalog),
        })
    }

    /// Backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn poisoned() -> StoreError {
    StoreError::Io(io::Error::other("store lock poisoned"))
}

fn parse_catalog(path: &Path, text: &str) -> Result<Catalog, StoreError> {
    if text.trim().is_empty() {
        return Ok(Catalog::default());
    }
    serde_json::from_str(text).map_err(|e| {
        warn!(path = %path.display(), error = %e, "algorithm store is corrupt");
        StoreError::Format(e.to_string())
    })
}

/// Write to a sibling temp file, then rename over `path`.
fn write_atomically(path: &Path, catalog: &Catalog) -> Result<(), StoreError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut text =
        serde_json::to_string_pretty(catalog).map_err(|e| StoreError::Format(e.to_string()))?;
    text.push('\n');

    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);
    fs::write(&tmp_path, text)?;
    if let Err(e) = fs::rename(&tmp_path, path) {
        // Best effort: leave no stray temp file behind.
        let _ = fs::remove_file(&tmp_path);
        return Err(StoreError::Io(e));
    }
    Ok(())
}

impl AlgorithmStore for FileStore {
    fn get(&self, name: &str) -> Result<AlgorithmDefinition, StoreError> {
        self.catalog.read().map_err(|_| poisoned())?.get(name)
    }

    fn put(&self, mut definition: AlgorithmDefinition) -> Result<(), StoreError> {
        definition.name = normalize_name(&definition.name)?;
        let mut catalog = self.catalog.write().map_err(|_| poisoned())?;
        let mut next = catalog.clone();
        let name = definition.name.clone();
        next.insert(definition);
        write_atomically(&self.path, &next)?;
        *catalog = next;
        debug!(algorithm = %name, "algorithm saved");
        Ok(())
    }

    fn list(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.catalog.read().map_err(|_| poisoned())?.names())
    }

    fn delete(&self, name: &str) -> Result<(), StoreError> {
        let mut catalog = self.catalog.write().map_err(|_| poisoned())?;
        let mut next = catalog.clone();
        next.remove(name)?;
        write_atomically(&self.path, &next)?;
        *catalog = next;
        debug!(algorithm = %name.trim(), "algorithm deleted");
        Ok(())
    }
}
