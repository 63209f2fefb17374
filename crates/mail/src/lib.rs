//! Mail crate - Business logic for multi-account Gmail aggregation
//!
//! This crate provides platform-independent mail functionality including:
//! - Domain models (Credential, MessageSummary, AccountResult, AggregateResponse)
//! - Credential store trait with file and in-memory backends
//! - Gmail API client and OAuth token handling
//! - Per-account fetch adapters and the concurrent fan-out aggregator
//!
//! This crate has no HTTP server dependencies; the `courier` app wires it
//! to an HTTP surface.

pub mod aggregate;
pub mod config;
pub mod gmail;
pub mod models;
pub mod storage;

pub use aggregate::{FetchLimit, FetchMode, Mailbox, MailboxConnector, aggregate};
pub use config::{CredentialSource, GmailCredentials};
pub use gmail::{GmailApiError, GmailAuth, GmailClient, GmailConnector, api::ProfileResponse};
pub use models::{AccountResult, AggregateResponse, Credential, MessageId, MessageSummary, NO_ACCOUNTS_MESSAGE};
pub use storage::{CredentialStore, FileCredentialStore, InMemoryCredentialStore, StoreError};
