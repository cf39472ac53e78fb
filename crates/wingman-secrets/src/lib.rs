//! Secret persistence for Wingman.
//!
//! This crate defines the [`SecretStore`] trait — durable key→string
//! persistence with `get`/`set`/`delete` — and two implementations:
//!
//! - [`MemorySecretStore`]: a `HashMap` behind a mutex, for tests and
//!   short-lived processes.
//! - [`FileSecretStore`]: a single JSON file replaced atomically on every
//!   write, for the CLI.
//!
//! The auth core treats whatever implements this trait as the single
//! source of truth for session durability. Inside an IDE the trait would
//! be backed by the editor's secret storage API; here the file store fills
//! that role.
//!
//! All operations are synchronous. Callers that share a store across
//! threads wrap it in an `Arc`; each implementation serializes its own
//! interior access.

pub mod error;
pub mod file;
pub mod memory;

pub use error::{Result, SecretStoreError};
pub use file::FileSecretStore;
pub use memory::MemorySecretStore;

/// Durable key→string persistence.
///
/// Implementations must be safe to share across threads. `set` overwrites
/// any existing value; `delete` on an absent key is a no-op.
pub trait SecretStore: Send + Sync {
    /// Look up the value stored under `key`, if any.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove the value stored under `key`. Absent keys are ignored.
    fn delete(&self, key: &str) -> Result<()>;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trait_object_is_usable() {
        let store: Box<dyn SecretStore> = Box::new(MemorySecretStore::new());
        store.set("k", "v").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));
    }
}
