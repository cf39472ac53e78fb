//! In-memory secret store.
//!
//! Backs the [`SecretStore`] trait with a plain `HashMap`. Nothing is
//! persisted across process restarts — use this for tests and for
//! environments where the host provides no durable storage.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::{Result, SecretStoreError};
use crate::SecretStore;

/// A [`SecretStore`] that keeps everything in process memory.
#[derive(Debug, Default)]
pub struct MemorySecretStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemorySecretStore {
    /// Create an empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.entries
            .lock()
            .map_err(|e| SecretStoreError::Poisoned {
                reason: e.to_string(),
            })
    }
}

impl SecretStore for MemorySecretStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.lock()?.remove(key);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_missing_key_is_none() {
        let store = MemorySecretStore::new();
        assert!(store.get("absent").unwrap().is_none());
    }

    #[test]
    fn set_then_get_round_trips() {
        let store = MemorySecretStore::new();
        store.set("token", "abc123").unwrap();
        assert_eq!(store.get("token").unwrap().as_deref(), Some("abc123"));
    }

    #[test]
    fn set_overwrites_existing_value() {
        let store = MemorySecretStore::new();
        store.set("token", "old").unwrap();
        store.set("token", "new").unwrap();
        assert_eq!(store.get("token").unwrap().as_deref(), Some("new"));
    }

    #[test]
    fn delete_removes_value() {
        let store = MemorySecretStore::new();
        store.set("token", "abc").unwrap();
        store.delete("token").unwrap();
        assert!(store.get("token").unwrap().is_none());
    }

    #[test]
    fn delete_absent_key_is_noop() {
        let store = MemorySecretStore::new();
        store.delete("never-set").unwrap();
    }

    #[test]
    fn store_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<MemorySecretStore>();
    }
}
