//! Integration tests for the fan-out aggregator
//!
//! These tests drive `aggregate` end to end with a scripted mail provider.

use anyhow::{Result, anyhow};
use mail::models::{Credential, MessageId, MessageSummary, NO_ACCOUNTS_MESSAGE};
use mail::storage::{CredentialStore, FileCredentialStore, InMemoryCredentialStore};
use mail::{FetchLimit, FetchMode, GmailApiError, Mailbox, MailboxConnector, aggregate};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;
use tempfile::TempDir;

/// Scripted behaviour for one fake account
#[derive(Clone, Default)]
struct FakeAccount {
    email: String,
    inbox: Vec<MessageSummary>,
    failing_messages: HashSet<usize>,
    list_fails: bool,
    panics: bool,
}

impl FakeAccount {
    fn healthy(email: &str, messages: usize) -> Self {
        Self {
            email: email.to_string(),
            inbox: (0..messages)
                .map(|i| {
                    MessageSummary::builder()
                        .from(format!("sender{}@example.com", i))
                        .subject(format!("Message {} for {}", i, email))
                        .date("Mon, 7 Oct 2024 09:30:00 +0000")
                        .snippet(format!("snippet {}", i))
                        .build()
                })
                .collect(),
            ..Self::default()
        }
    }

    fn failing_messages(mut self, indices: &[usize]) -> Self {
        self.failing_messages = indices.iter().copied().collect();
        self
    }
}

/// Waits until `expected` tasks are inside the provider at the same time
struct Gate {
    arrived: Mutex<usize>,
    all_here: Condvar,
    expected: usize,
}

impl Gate {
    fn new(expected: usize) -> Self {
        Self {
            arrived: Mutex::new(0),
            all_here: Condvar::new(),
            expected,
        }
    }

    fn arrive(&self) -> bool {
        let mut arrived = self.arrived.lock().unwrap();
        *arrived += 1;
        self.all_here.notify_all();
        let (_guard, result) = self
            .all_here
            .wait_timeout_while(arrived, Duration::from_secs(5), |n| *n < self.expected)
            .unwrap();
        !result.timed_out()
    }
}

/// Connector keyed by access token; tokens starting with "revoked" are rejected
#[derive(Default)]
struct FakeConnector {
    accounts: HashMap<String, FakeAccount>,
    gate: Option<Arc<Gate>>,
}

impl FakeConnector {
    fn with(mut self, token: &str, account: FakeAccount) -> Self {
        self.accounts.insert(token.to_string(), account);
        self
    }
}

impl MailboxConnector for FakeConnector {
    fn connect(&self, credential: &Credential) -> Result<Box<dyn Mailbox>> {
        if credential.access_token.starts_with("revoked") {
            return Err(GmailApiError::Status {
                operation: "get profile",
                code: 401,
            }
            .into());
        }
        let account = self
            .accounts
            .get(&credential.access_token)
            .cloned()
            .ok_or_else(|| anyhow!("unknown token {}", credential.access_token))?;
        Ok(Box::new(FakeMailbox {
            account,
            gate: self.gate.clone(),
        }))
    }
}

struct FakeMailbox {
    account: FakeAccount,
    gate: Option<Arc<Gate>>,
}

impl Mailbox for FakeMailbox {
    fn account_email(&self) -> Result<String> {
        if self.account.panics {
            panic!("provider exploded for {}", self.account.email);
        }
        if let Some(gate) = &self.gate
            && !gate.arrive()
        {
            return Err(anyhow!("accounts were not fetched concurrently"));
        }
        Ok(self.account.email.clone())
    }

    fn list_message_ids(&self, _mode: FetchMode, limit: usize) -> Result<Vec<MessageId>> {
        if self.account.list_fails {
            return Err(anyhow!("list messages failed: HTTP 500"));
        }
        Ok((0..self.account.inbox.len().min(limit))
            .map(|i| MessageId::new(i.to_string()))
            .collect())
    }

    fn message_summary(&self, id: &MessageId) -> Result<MessageSummary> {
        let index: usize = id.as_str().parse()?;
        if self.account.failing_messages.contains(&index) {
            return Err(anyhow!("get message {} failed: HTTP 500", index));
        }
        Ok(self.account.inbox[index].clone())
    }
}

fn store_with(tokens: &[(&str, &str)]) -> InMemoryCredentialStore {
    let store = InMemoryCredentialStore::new();
    for (key, token) in tokens {
        store.save(key, &Credential::new(*token)).unwrap();
    }
    store
}

fn limit(n: usize) -> FetchLimit {
    FetchLimit::new(n).unwrap()
}

#[test]
fn test_no_accounts_is_informational() {
    let store = InMemoryCredentialStore::new();
    let connector = FakeConnector::default();

    for mode in [FetchMode::Unread, FetchMode::Latest] {
        let response = aggregate(&store, &connector, mode, FetchLimit::DEFAULT).unwrap();
        assert!(response.accounts.is_empty());
        assert_eq!(response.message.as_deref(), Some(NO_ACCOUNTS_MESSAGE));
    }
}

#[test]
fn test_one_result_per_healthy_account() {
    let store = store_with(&[
        ("a@example.com", "tok-a"),
        ("b@example.com", "tok-b"),
        ("c@example.com", "tok-c"),
    ]);
    let connector = FakeConnector::default()
        .with("tok-a", FakeAccount::healthy("a@example.com", 3))
        .with("tok-b", FakeAccount::healthy("b@example.com", 10))
        .with("tok-c", FakeAccount::healthy("c@example.com", 0));

    let response = aggregate(&store, &connector, FetchMode::Unread, limit(7)).unwrap();

    assert_eq!(response.accounts.len(), 3);
    assert!(response.message.is_none());
    let counts: Vec<(&str, usize)> = response
        .accounts
        .iter()
        .map(|a| (a.email(), a.count()))
        .collect();
    assert_eq!(
        counts,
        vec![("a@example.com", 3), ("b@example.com", 7), ("c@example.com", 0)]
    );
    for account in &response.accounts {
        assert!(account.is_fetched());
        assert_eq!(account.count(), account.messages().len());
        assert!(account.warning().is_none());
    }
}

#[test]
fn test_unauthorized_account_is_isolated() {
    let store = store_with(&[
        ("good@example.com", "tok-good"),
        ("stale@example.com", "revoked-token"),
        ("other@example.com", "tok-other"),
    ]);
    let connector = FakeConnector::default()
        .with("tok-good", FakeAccount::healthy("good@example.com", 4))
        .with("tok-other", FakeAccount::healthy("other@example.com", 2));

    let response = aggregate(&store, &connector, FetchMode::Latest, limit(7)).unwrap();
    assert_eq!(response.accounts.len(), 3);

    let stale = response
        .accounts
        .iter()
        .find(|a| a.email() == "stale@example.com")
        .unwrap();
    assert!(stale.error().unwrap().contains("HTTP 401"));
    assert!(stale.messages().is_empty());
    assert_eq!(stale.count(), 0);

    let healthy: Vec<_> = response.accounts.iter().filter(|a| a.is_fetched()).collect();
    assert_eq!(healthy.len(), 2);
    assert!(healthy.iter().all(|a| a.count() > 0));
}

#[test]
fn test_latest_partial_message_failures_produce_warning() {
    let store = store_with(&[("partial@example.com", "tok-p")]);
    let connector = FakeConnector::default().with(
        "tok-p",
        FakeAccount::healthy("partial@example.com", 7).failing_messages(&[1, 4]),
    );

    let response = aggregate(&store, &connector, FetchMode::Latest, limit(7)).unwrap();
    let account = &response.accounts[0];

    assert!(account.is_fetched());
    assert_eq!(account.count(), 5);
    assert_eq!(account.messages().len(), 5);
    assert_eq!(
        account.warning(),
        Some("Failed to load 2 messages due to API errors")
    );
    assert!(
        account
            .messages()
            .iter()
            .all(|m| m.subject != "Message 1 for partial@example.com")
    );
}

#[test]
fn test_unread_message_failure_fails_account_under_email() {
    let store = store_with(&[("key-only", "tok-u")]);
    let connector = FakeConnector::default().with(
        "tok-u",
        FakeAccount::healthy("resolved@example.com", 3).failing_messages(&[2]),
    );

    let response = aggregate(&store, &connector, FetchMode::Unread, limit(7)).unwrap();
    let account = &response.accounts[0];

    assert!(!account.is_fetched());
    // The email was resolved before the failure, so it labels the entry
    assert_eq!(account.email(), "resolved@example.com");
    assert!(account.error().unwrap().contains("Failed to fetch message 2"));
}

#[test]
fn test_latest_list_failure_fails_account() {
    let store = store_with(&[("l@example.com", "tok-l")]);
    let mut broken = FakeAccount::healthy("l@example.com", 3);
    broken.list_fails = true;
    let connector = FakeConnector::default().with("tok-l", broken);

    let response = aggregate(&store, &connector, FetchMode::Latest, limit(7)).unwrap();
    assert_eq!(response.accounts.len(), 1);
    assert!(response.accounts[0].error().unwrap().contains("list messages failed"));
}

#[test]
fn test_panicking_task_becomes_error_entry() {
    let store = store_with(&[("boom@example.com", "tok-boom"), ("fine@example.com", "tok-fine")]);
    let mut exploding = FakeAccount::healthy("boom@example.com", 1);
    exploding.panics = true;
    let connector = FakeConnector::default()
        .with("tok-boom", exploding)
        .with("tok-fine", FakeAccount::healthy("fine@example.com", 2));

    let response = aggregate(&store, &connector, FetchMode::Unread, limit(7)).unwrap();
    assert_eq!(response.accounts.len(), 2);

    let boom = &response.accounts[0];
    assert_eq!(boom.email(), "boom@example.com");
    assert!(boom.error().unwrap().contains("panicked"));
    assert!(response.accounts[1].is_fetched());
}

#[test]
fn test_accounts_fetched_concurrently() {
    let keys: Vec<String> = (0..6).map(|i| format!("user{}@example.com", i)).collect();
    let store = InMemoryCredentialStore::new();
    let mut connector = FakeConnector {
        gate: Some(Arc::new(Gate::new(keys.len()))),
        ..FakeConnector::default()
    };
    for key in &keys {
        let token = format!("tok-{}", key);
        store.save(key, &Credential::new(token.clone())).unwrap();
        connector = connector.with(&token, FakeAccount::healthy(key, 1));
    }

    let response = aggregate(&store, &connector, FetchMode::Latest, limit(3)).unwrap();

    assert_eq!(response.accounts.len(), keys.len());
    for account in &response.accounts {
        assert!(account.is_fetched(), "{:?}", account.error());
    }
}

#[test]
fn test_repeated_calls_are_identical() {
    let store = store_with(&[("a@example.com", "tok-a"), ("bad@example.com", "revoked")]);
    let connector = FakeConnector::default()
        .with("tok-a", FakeAccount::healthy("a@example.com", 5).failing_messages(&[0]));

    let first = aggregate(&store, &connector, FetchMode::Latest, limit(7)).unwrap();
    let second = aggregate(&store, &connector, FetchMode::Latest, limit(7)).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_file_store_end_to_end() {
    let dir = TempDir::new().unwrap();
    let store = FileCredentialStore::open(dir.path()).unwrap();
    store
        .save("alice@example.com", &Credential::new("tok-alice"))
        .unwrap();
    std::fs::write(dir.path().join("corrupt@example.com.json"), "{ nope").unwrap();

    let connector =
        FakeConnector::default().with("tok-alice", FakeAccount::healthy("alice@example.com", 2));

    let response = aggregate(&store, &connector, FetchMode::Unread, FetchLimit::DEFAULT).unwrap();
    assert_eq!(response.accounts.len(), 2);

    let alice = &response.accounts[0];
    assert_eq!(alice.email(), "alice@example.com");
    assert_eq!(alice.count(), 2);

    // Unreadable credential falls back to its store key
    let corrupt = &response.accounts[1];
    assert_eq!(corrupt.email(), "corrupt@example.com");
    assert!(corrupt.error().unwrap().contains("Malformed credential"));
}

#[test]
fn test_account_removed_between_calls_is_not_reported() {
    let store = store_with(&[("a@example.com", "tok-a"), ("b@example.com", "tok-b")]);
    let connector = FakeConnector::default()
        .with("tok-a", FakeAccount::healthy("a@example.com", 1))
        .with("tok-b", FakeAccount::healthy("b@example.com", 1));

    let before = aggregate(&store, &connector, FetchMode::Unread, limit(7)).unwrap();
    assert_eq!(before.accounts.len(), 2);

    assert!(store.delete("b@example.com").unwrap());
    let after = aggregate(&store, &connector, FetchMode::Unread, limit(7)).unwrap();
    assert_eq!(after.accounts.len(), 1);
    assert_eq!(after.accounts[0].email(), "a@example.com");
}
