//! Provider seam used by the fetch adapters

use anyhow::Result;

use super::FetchMode;
use crate::models::{Credential, MessageId, MessageSummary};

/// One authenticated remote mailbox
///
/// Implementations may block on network I/O; each instance is used from
/// a single fetch task.
pub trait Mailbox {
    /// Resolve the account's email address
    fn account_email(&self) -> Result<String>;

    /// List up to `limit` message IDs for `mode`, newest first
    fn list_message_ids(&self, mode: FetchMode, limit: usize) -> Result<Vec<MessageId>>;

    /// Fetch one message and project its summary fields
    fn message_summary(&self, id: &MessageId) -> Result<MessageSummary>;
}

/// Authenticates stored credentials against the mail provider
pub trait MailboxConnector: Send + Sync {
    /// Open a mailbox for the account a credential belongs to
    fn connect(&self, credential: &Credential) -> Result<Box<dyn Mailbox>>;
}
