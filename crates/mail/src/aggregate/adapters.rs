//! Per-account fetch adapters

use anyhow::{Context, Result};
use log::{debug, warn};

use super::{FetchLimit, FetchMode, Mailbox, MailboxConnector};
use crate::models::{AccountResult, MessageSummary};
use crate::storage::CredentialStore;

/// Fetch unread messages for one account
///
/// Any failure, including a single message's detail fetch, fails the account.
pub fn fetch_unread(mailbox: &dyn Mailbox, email: &str, limit: FetchLimit) -> Result<AccountResult> {
    let ids = mailbox.list_message_ids(FetchMode::Unread, limit.get())?;

    let messages = ids
        .iter()
        .take(limit.get())
        .map(|id| {
            mailbox
                .message_summary(id)
                .with_context(|| format!("Failed to fetch message {}", id.as_str()))
        })
        .collect::<Result<Vec<MessageSummary>>>()?;

    Ok(AccountResult::fetched(email, messages))
}

/// Fetch the most recent inbox messages for one account
///
/// Listing failures fail the account; individual message failures are
/// skipped and reported through the result's warning.
pub fn fetch_latest(mailbox: &dyn Mailbox, email: &str, limit: FetchLimit) -> Result<AccountResult> {
    let ids = mailbox.list_message_ids(FetchMode::Latest, limit.get())?;

    let mut messages = Vec::with_capacity(ids.len());
    let mut failed = 0usize;
    for id in ids.iter().take(limit.get()) {
        match mailbox.message_summary(id) {
            Ok(summary) => messages.push(summary),
            Err(e) => {
                warn!("Failed to fetch message {} for {}: {:#}", id.as_str(), email, e);
                failed += 1;
            }
        }
    }

    Ok(AccountResult::fetched(email, messages).with_failed_messages(failed))
}

/// Run the whole pipeline for one stored account.
///
/// `identity` starts as the store key and is replaced by the resolved email
/// as soon as it is known, so callers can label failures accurately.
pub(crate) fn fetch_account(
    store: &dyn CredentialStore,
    connector: &dyn MailboxConnector,
    key: &str,
    mode: FetchMode,
    limit: FetchLimit,
    identity: &mut String,
) -> Result<AccountResult> {
    let credential = store
        .load(key)?
        .with_context(|| format!("No credential stored for {}", key))?;

    let mailbox = connector.connect(&credential)?;
    let email = mailbox.account_email()?;
    debug!("Resolved account {} as {}", key, email);
    *identity = email;

    match mode {
        FetchMode::Unread => fetch_unread(&*mailbox, identity.as_str(), limit),
        FetchMode::Latest => fetch_latest(&*mailbox, identity.as_str(), limit),
    }
}
