//! Gmail API integration
//!
//! This module provides:
//! - OAuth2 web flow and token refresh
//! - Gmail API client for profiles, message lists and message metadata
//! - Projection of Gmail messages to [`MessageSummary`](crate::models::MessageSummary)
//! - [`GmailConnector`], the production [`MailboxConnector`](crate::aggregate::MailboxConnector)

mod auth;
mod client;
mod mailbox;
mod normalize;

pub use auth::{GmailAuth, resolve_access_token};
pub use client::{GmailApiError, GmailClient};
pub use mailbox::{GmailConnector, GmailMailbox};
pub use normalize::summarize_message;

/// Label IDs used by Gmail for system mailboxes
pub mod labels {
    pub const INBOX: &str = "INBOX";
}

/// Gmail API response types
pub mod api {
    use serde::{Deserialize, Serialize};

    /// Response from the profile endpoint
    #[derive(Debug, Clone, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ProfileResponse {
        pub email_address: String,
    }

    /// Response from listing messages
    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ListMessagesResponse {
        pub messages: Option<Vec<MessageRef>>,
    }

    /// Reference to a message in a listing
    #[derive(Debug, Deserialize)]
    pub struct MessageRef {
        pub id: String,
    }

    /// Message from Gmail API (`format=metadata`)
    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct GmailMessage {
        #[serde(default)]
        pub snippet: String,
        pub payload: Option<MessagePayload>,
    }

    /// Message payload containing headers
    #[derive(Debug, Deserialize)]
    pub struct MessagePayload {
        pub headers: Option<Vec<Header>>,
    }

    /// Email header (name-value pair)
    #[derive(Debug, Deserialize, Serialize)]
    pub struct Header {
        pub name: String,
        pub value: String,
    }
}
