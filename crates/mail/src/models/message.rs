//! Message models projected from the Gmail API

use serde::{Deserialize, Serialize};

/// Unique identifier for a message (Gmail message ID)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub String);

impl MessageId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for MessageId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for MessageId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// The fields of one remote message that end up in an aggregate response.
///
/// Every field is an empty string when the provider did not supply it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageSummary {
    /// Raw `From` header
    pub from: String,
    /// Raw `Subject` header
    pub subject: String,
    /// Raw `Date` header
    pub date: String,
    /// Short plain-text preview of the body
    pub snippet: String,
}

impl MessageSummary {
    /// Create a summary builder
    pub fn builder() -> MessageSummaryBuilder {
        MessageSummaryBuilder::default()
    }
}

/// Builder for creating MessageSummary instances
#[derive(Default)]
pub struct MessageSummaryBuilder {
    summary: MessageSummary,
}

impl MessageSummaryBuilder {
    pub fn from(mut self, from: impl Into<String>) -> Self {
        self.summary.from = from.into();
        self
    }

    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.summary.subject = subject.into();
        self
    }

    pub fn date(mut self, date: impl Into<String>) -> Self {
        self.summary.date = date.into();
        self
    }

    pub fn snippet(mut self, snippet: impl Into<String>) -> Self {
        self.summary.snippet = snippet.into();
        self
    }

    pub fn build(self) -> MessageSummary {
        self.summary
    }
}
