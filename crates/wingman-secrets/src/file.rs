//! JSON-file secret store.
//!
//! Persists all secrets as a single flat JSON object (`{"key": "value"}`)
//! in one file. Every write serializes the full map to a temporary file in
//! the same directory and renames it over the original, so readers never
//! observe a partially written file.
//!
//! The file is re-read on every `get` — the store holds no cache — which
//! keeps concurrent processes (CLI invocations) coherent at the cost of a
//! small read per lookup. Secret payloads here are a few kilobytes at
//! most.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::{Result, SecretStoreError};
use crate::SecretStore;

/// A [`SecretStore`] backed by a single JSON file.
#[derive(Debug)]
pub struct FileSecretStore {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process. Cross-process
    // writers race on the final rename, which is atomic per entry.
    write_lock: Mutex<()>,
}

impl FileSecretStore {
    /// Create a store backed by the file at `path`.
    ///
    /// The file and its parent directory are created lazily on first `set`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// The path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> Result<BTreeMap<String, String>> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn write_map(&self, map: &BTreeMap<String, String>) -> Result<()> {
        let parent = self.path.parent().unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(parent)?;

        let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
        serde_json::to_writer_pretty(&mut tmp, map)?;
        tmp.flush()?;
        tmp.persist(&self.path)
            .map_err(|e| SecretStoreError::Persist {
                reason: e.to_string(),
            })?;

        tracing::trace!(path = %self.path.display(), entries = map.len(), "secrets file written");
        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, ()>> {
        self.write_lock
            .lock()
            .map_err(|e| SecretStoreError::Poisoned {
                reason: e.to_string(),
            })
    }
}

impl SecretStore for FileSecretStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.read_map()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let _guard = self.lock()?;
        let mut map = self.read_map()?;
        map.insert(key.to_string(), value.to_string());
        self.write_map(&map)
    }

    fn delete(&self, key: &str) -> Result<()> {
        let _guard = self.lock()?;
        let mut map = self.read_map()?;
        if map.remove(key).is_some() {
            self.write_map(&map)?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
