//! Gmail-backed implementations of the mailbox traits

use anyhow::Result;

use super::{GmailAuth, GmailClient, labels, resolve_access_token, summarize_message};
use crate::aggregate::{FetchMode, Mailbox, MailboxConnector};
use crate::models::{Credential, MessageId, MessageSummary};

/// Connects stored credentials to live Gmail mailboxes
///
/// The OAuth client is optional: credentials that embed their own client
/// id/secret can still be refreshed without one.
pub struct GmailConnector {
    auth: Option<GmailAuth>,
}

impl GmailConnector {
    pub fn new(auth: Option<GmailAuth>) -> Self {
        Self { auth }
    }
}

impl MailboxConnector for GmailConnector {
    fn connect(&self, credential: &Credential) -> Result<Box<dyn Mailbox>> {
        let access_token = resolve_access_token(credential, self.auth.as_ref())?;
        Ok(Box::new(GmailMailbox::new(GmailClient::new(access_token))))
    }
}

/// One authenticated Gmail account
pub struct GmailMailbox {
    client: GmailClient,
}

impl GmailMailbox {
    pub fn new(client: GmailClient) -> Self {
        Self { client }
    }
}

impl Mailbox for GmailMailbox {
    fn account_email(&self) -> Result<String> {
        Ok(self.client.get_profile()?.email_address)
    }

    fn list_message_ids(&self, mode: FetchMode, limit: usize) -> Result<Vec<MessageId>> {
        let query = match mode {
            FetchMode::Unread => Some("is:unread"),
            FetchMode::Latest => None,
        };

        let response = self.client.list_messages(query, &[labels::INBOX], limit)?;
        Ok(response
            .messages
            .unwrap_or_default()
            .into_iter()
            .take(limit)
            .map(|m| MessageId::new(m.id))
            .collect())
    }

    fn message_summary(&self, id: &MessageId) -> Result<MessageSummary> {
        let message = self.client.get_message_metadata(id)?;
        Ok(summarize_message(&message))
    }
}
