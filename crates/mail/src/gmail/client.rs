//! Gmail API HTTP client
//!
//! Provides the read-only calls the aggregator needs: profile lookup,
//! message listing and per-message metadata.
//! Uses synchronous HTTP (ureq) to be executor-agnostic.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;

use super::api::{GmailMessage, ListMessagesResponse, ProfileResponse};
use crate::models::MessageId;

/// Operation name used for refresh-token grants
pub(crate) const TOKEN_REFRESH: &str = "token refresh";

/// Non-success HTTP status returned by a Google endpoint
#[derive(Debug, thiserror::Error)]
pub enum GmailApiError {
    #[error("{operation} failed: Gmail API returned HTTP {code}")]
    Status { operation: &'static str, code: u16 },
}

impl GmailApiError {
    /// HTTP status code of the failed call
    pub fn code(&self) -> u16 {
        match self {
            Self::Status { code, .. } => *code,
        }
    }

    /// Whether the credential itself was rejected
    ///
    /// The token endpoint answers a revoked or expired refresh token with
    /// 400 `invalid_grant`, so a 400 from a refresh counts too.
    pub fn is_auth_failure(&self) -> bool {
        match self {
            Self::Status { code: 401 | 403, .. } => true,
            Self::Status { operation, code: 400 } => *operation == TOKEN_REFRESH,
            Self::Status { .. } => false,
        }
    }
}

/// Convert a ureq error, keeping HTTP status codes inspectable
pub(crate) fn status_error(err: ureq::Error, operation: &'static str) -> anyhow::Error {
    match err {
        ureq::Error::StatusCode(code) => GmailApiError::Status { operation, code }.into(),
        other => anyhow::Error::new(other).context(format!("Failed to send {} request", operation)),
    }
}

/// Gmail API client bound to one account's access token
pub struct GmailClient {
    access_token: String,
}

impl GmailClient {
    /// Gmail API base URL
    const BASE_URL: &'static str = "https://gmail.googleapis.com/gmail/v1";

    /// Largest page the list endpoint accepts
    const MAX_PAGE_SIZE: usize = 500;

    /// Headers requested with `format=metadata`
    const METADATA_HEADERS: [&'static str; 3] = ["From", "Subject", "Date"];

    /// Create a new Gmail client
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
        }
    }

    /// Get the authenticated user's profile
    pub fn get_profile(&self) -> Result<ProfileResponse> {
        let url = format!("{}/users/me/profile", Self::BASE_URL);
        self.get_json(&url, "get profile")
    }

    /// List message IDs, newest first
    ///
    /// # Arguments
    /// * `query` - Optional Gmail search query (e.g. `is:unread`)
    /// * `label_ids` - Only return messages carrying all of these labels
    /// * `max_results` - Maximum number of messages to return (capped at 500)
    pub fn list_messages(
        &self,
        query: Option<&str>,
        label_ids: &[&str],
        max_results: usize,
    ) -> Result<ListMessagesResponse> {
        let url = Self::list_messages_url(query, label_ids, max_results);
        self.get_json(&url, "list messages")
    }

    /// Get message headers and snippet by ID
    pub fn get_message_metadata(&self, id: &MessageId) -> Result<GmailMessage> {
        let mut url = format!(
            "{}/users/me/messages/{}?format=metadata",
            Self::BASE_URL,
            urlencoding::encode(id.as_str())
        );
        for header in Self::METADATA_HEADERS {
            url.push_str(&format!("&metadataHeaders={}", header));
        }
        self.get_json(&url, "get message")
    }

    fn list_messages_url(query: Option<&str>, label_ids: &[&str], max_results: usize) -> String {
        let mut url = format!(
            "{}/users/me/messages?maxResults={}",
            Self::BASE_URL,
            max_results.clamp(1, Self::MAX_PAGE_SIZE)
        );
        for label in label_ids {
            url.push_str(&format!("&labelIds={}", urlencoding::encode(label)));
        }
        if let Some(q) = query {
            url.push_str(&format!("&q={}", urlencoding::encode(q)));
        }
        url
    }

    fn get_json<T: DeserializeOwned>(&self, url: &str, operation: &'static str) -> Result<T> {
        let mut response = ureq::get(url)
            .header("Authorization", &format!("Bearer {}", self.access_token))
            .call()
            .map_err(|e| status_error(e, operation))?;

        response
            .body_mut()
            .read_json()
            .with_context(|| format!("Failed to parse {} response", operation))
    }
}
