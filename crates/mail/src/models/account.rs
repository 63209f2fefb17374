//! Per-account fetch outcomes and the aggregate response

use serde::{Deserialize, Serialize};

use super::MessageSummary;

/// Informational message returned when no account is registered
pub const NO_ACCOUNTS_MESSAGE: &str = "No authenticated accounts found. Please add an account first.";

/// Outcome of fetching one registered account
///
/// Serializes as either `{email, count, messages, warning?}` or
/// `{email, error, messages: []}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AccountResult {
    /// The account was fetched; some individual messages may have been skipped
    Fetched {
        email: String,
        count: usize,
        messages: Vec<MessageSummary>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        warning: Option<String>,
    },
    /// The account could not be fetched at all
    Failed {
        email: String,
        error: String,
        #[serde(default)]
        messages: Vec<MessageSummary>,
    },
}

impl AccountResult {
    /// Build a successful result; `count` always equals the number of messages
    pub fn fetched(email: impl Into<String>, messages: Vec<MessageSummary>) -> Self {
        Self::Fetched {
            email: email.into(),
            count: messages.len(),
            messages,
            warning: None,
        }
    }

    /// Attach a warning for `failed` messages that could not be loaded.
    ///
    /// No-op for zero failures or a failed account.
    pub fn with_failed_messages(mut self, failed: usize) -> Self {
        if failed > 0
            && let Self::Fetched { warning, .. } = &mut self
        {
            *warning = Some(format!("Failed to load {} messages due to API errors", failed));
        }
        self
    }

    /// Build a failure entry under the best-known identifier for the account
    pub fn failed(email: impl Into<String>, error: impl Into<String>) -> Self {
        Self::Failed {
            email: email.into(),
            error: error.into(),
            messages: Vec::new(),
        }
    }

    /// Email address (or fallback identifier) of the account
    pub fn email(&self) -> &str {
        match self {
            Self::Fetched { email, .. } | Self::Failed { email, .. } => email,
        }
    }

    /// Number of messages returned for the account
    pub fn count(&self) -> usize {
        match self {
            Self::Fetched { count, .. } => *count,
            Self::Failed { .. } => 0,
        }
    }

    pub fn messages(&self) -> &[MessageSummary] {
        match self {
            Self::Fetched { messages, .. } | Self::Failed { messages, .. } => messages,
        }
    }

    pub fn warning(&self) -> Option<&str> {
        match self {
            Self::Fetched { warning, .. } => warning.as_deref(),
            Self::Failed { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Fetched { .. } => None,
            Self::Failed { error, .. } => Some(error),
        }
    }

    pub fn is_fetched(&self) -> bool {
        matches!(self, Self::Fetched { .. })
    }
}

/// Combined result of querying every registered account
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregateResponse {
    /// One entry per account registered when the fetch started
    pub accounts: Vec<AccountResult>,
    /// Informational message, set only when there is nothing to report
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl AggregateResponse {
    pub fn new(accounts: Vec<AccountResult>) -> Self {
        Self {
            accounts,
            message: None,
        }
    }

    /// Response for an empty account set. This is not an error.
    pub fn no_accounts() -> Self {
        Self {
            accounts: Vec::new(),
            message: Some(NO_ACCOUNTS_MESSAGE.to_string()),
        }
    }
}
