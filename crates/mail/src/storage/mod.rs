//! Credential storage traits and implementations
//!
//! This module defines the storage abstraction for per-account OAuth
//! credentials. The trait-based design allows swapping between flat files
//! and in-memory storage without touching the aggregator.

mod file;
mod memory;
mod traits;

pub use file::FileCredentialStore;
pub use memory::InMemoryCredentialStore;
pub use traits::{CredentialStore, StoreError, validate_key};
