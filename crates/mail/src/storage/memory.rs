//! In-memory credential store
//!
//! Used in tests and for ephemeral deployments where tokens need not
//! survive a restart.

use std::collections::BTreeMap;
use std::sync::RwLock;

use super::traits::validate_key;
use super::{CredentialStore, StoreError};
use crate::models::Credential;

/// In-memory implementation of CredentialStore
///
/// Uses a BTreeMap behind an RwLock, so listing is naturally sorted.
#[derive(Default)]
pub struct InMemoryCredentialStore {
    credentials: RwLock<BTreeMap<String, Credential>>,
}

impl InMemoryCredentialStore {
    /// Create a new empty in-memory store
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialStore for InMemoryCredentialStore {
    fn list_accounts(&self) -> Result<Vec<String>, StoreError> {
        let credentials = self.credentials.read().map_err(|_| StoreError::Poisoned)?;
        Ok(credentials.keys().cloned().collect())
    }

    fn load(&self, key: &str) -> Result<Option<Credential>, StoreError> {
        validate_key(key)?;
        let credentials = self.credentials.read().map_err(|_| StoreError::Poisoned)?;
        Ok(credentials.get(key).cloned())
    }

    fn save(&self, key: &str, credential: &Credential) -> Result<(), StoreError> {
        validate_key(key)?;
        let mut credentials = self.credentials.write().map_err(|_| StoreError::Poisoned)?;
        credentials.insert(key.to_string(), credential.clone());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<bool, StoreError> {
        validate_key(key)?;
        let mut credentials = self.credentials.write().map_err(|_| StoreError::Poisoned)?;
        Ok(credentials.remove(key).is_some())
    }

    fn contains(&self, key: &str) -> Result<bool, StoreError> {
        let credentials = self.credentials.read().map_err(|_| StoreError::Poisoned)?;
        Ok(credentials.contains_key(key))
    }
}
