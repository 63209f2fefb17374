//! Gmail API response projection
//!
//! Converts Gmail API messages to the summaries returned by the aggregator.

use super::api::{GmailMessage, MessagePayload};
use crate::models::MessageSummary;

/// Project a Gmail message to its summary fields
///
/// Missing headers become empty strings.
pub fn summarize_message(gmail_msg: &GmailMessage) -> MessageSummary {
    let header = |name: &str| {
        gmail_msg
            .payload
            .as_ref()
            .and_then(|payload| extract_header(payload, name))
            .unwrap_or_default()
    };

    MessageSummary::builder()
        .from(header("From"))
        .subject(header("Subject"))
        .date(header("Date"))
        .snippet(decode_html_entities(&gmail_msg.snippet))
        .build()
}

/// Extract a header value by name
fn extract_header(payload: &MessagePayload, name: &str) -> Option<String> {
    payload.headers.as_ref()?.iter().find_map(|h| {
        if h.name.eq_ignore_ascii_case(name) {
            Some(h.value.clone())
        } else {
            None
        }
    })
}

/// Decode HTML entities in snippet text
fn decode_html_entities(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}
