//! Credential store trait definitions

use std::path::PathBuf;

use crate::models::Credential;

/// Errors raised by credential store backends
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Key is empty or could escape the store's namespace
    #[error("Invalid account key: {0:?}")]
    InvalidKey(String),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed credential for {key}: {source}")]
    Malformed {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Credential store lock poisoned")]
    Poisoned,
}

/// Trait for credential storage operations
///
/// One record per account, keyed by the account's email address. Backends
/// must tolerate concurrent readers; writes are rare and may be serialized
/// however the backend sees fit.
pub trait CredentialStore: Send + Sync {
    /// List the keys of all registered accounts, sorted ascending
    fn list_accounts(&self) -> Result<Vec<String>, StoreError>;

    /// Load the credential stored under `key`, if any
    fn load(&self, key: &str) -> Result<Option<Credential>, StoreError>;

    /// Insert or replace the credential stored under `key`
    fn save(&self, key: &str, credential: &Credential) -> Result<(), StoreError>;

    /// Remove the credential stored under `key`.
    ///
    /// Returns `false` if nothing was stored under that key.
    fn delete(&self, key: &str) -> Result<bool, StoreError>;

    /// Check if a credential exists for `key`
    fn contains(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.list_accounts()?.iter().any(|k| k == key))
    }
}

/// Reject keys that are empty, contain path separators or start with a dot
pub fn validate_key(key: &str) -> Result<(), StoreError> {
    let invalid = key.trim().is_empty()
        || key.starts_with('.')
        || key.contains(['/', '\\', '\0'])
        || key.chars().any(char::is_control);
    if invalid {
        return Err(StoreError::InvalidKey(key.to_string()));
    }
    Ok(())
}
