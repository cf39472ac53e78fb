//! Error types for the secrets crate.

/// Unified error type for secret store operations.
#[derive(Debug, thiserror::Error)]
pub enum SecretStoreError {
    /// Reading or writing the backing file failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The backing file could not be serialized or deserialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The store's interior lock was poisoned by a panicking thread.
    #[error("secret store lock poisoned: {reason}")]
    Poisoned {
        /// Details from the poisoned lock.
        reason: String,
    },

    /// Persisting the replacement file failed.
    #[error("failed to persist secrets file: {reason}")]
    Persist {
        /// Details about the failed rename.
        reason: String,
    },
}

/// Convenience alias used throughout this crate.
pub type Result<T> = std::result::Result<T, SecretStoreError>;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_poisoned() {
        let err = SecretStoreError::Poisoned {
            reason: "panicked holding lock".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "secret store lock poisoned: panicked holding lock"
        );
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SecretStoreError>();
    }
}
