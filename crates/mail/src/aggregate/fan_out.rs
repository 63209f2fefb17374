//! Concurrent fan-out across registered accounts

use log::{error, info, warn};
use rayon::ThreadPoolBuilder;
use rayon::prelude::*;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::thread;
use std::time::Instant;

use super::adapters::fetch_account;
use super::{FetchLimit, FetchMode, MailboxConnector};
use crate::gmail::GmailApiError;
use crate::models::{AccountResult, AggregateResponse};
use crate::storage::{CredentialStore, StoreError};

/// Fetch every registered account concurrently and merge the results
///
/// Accounts are enumerated once, at the start of the call. Each account
/// gets its own worker in a pool sized to the account count, and the call
/// waits for all of them. Every account yields exactly one entry, in key
/// order; per-account failures (including panics) become `error` entries.
///
/// # Errors
/// Only if the credential store cannot be enumerated at all.
pub fn aggregate(
    store: &dyn CredentialStore,
    connector: &dyn MailboxConnector,
    mode: FetchMode,
    limit: FetchLimit,
) -> Result<AggregateResponse, StoreError> {
    let keys = store.list_accounts()?;
    if keys.is_empty() {
        info!("No accounts registered; skipping {} fetch", mode);
        return Ok(AggregateResponse::no_accounts());
    }

    let start = Instant::now();
    let pool = ThreadPoolBuilder::new()
        .num_threads(keys.len())
        .thread_name(|i| format!("fetch-{}", i))
        .build();

    let accounts: Vec<AccountResult> = match pool {
        Ok(pool) => pool.install(|| {
            keys.par_iter()
                .with_max_len(1)
                .map(|key| fetch_isolated(store, connector, key, mode, limit))
                .collect()
        }),
        Err(e) => {
            warn!("Failed to build fetch pool ({}); using scoped threads", e);
            fetch_on_scoped_threads(store, connector, &keys, mode, limit)
        }
    };

    let failed = accounts.iter().filter(|a| !a.is_fetched()).count();
    info!(
        "Fetched {} for {} accounts ({} failed) in {}ms",
        mode,
        accounts.len(),
        failed,
        start.elapsed().as_millis()
    );

    Ok(AggregateResponse::new(accounts))
}

/// One plain thread per account, joined in key order
fn fetch_on_scoped_threads(
    store: &dyn CredentialStore,
    connector: &dyn MailboxConnector,
    keys: &[String],
    mode: FetchMode,
    limit: FetchLimit,
) -> Vec<AccountResult> {
    thread::scope(|scope| {
        let tasks: Vec<_> = keys
            .iter()
            .enumerate()
            .map(|(i, key)| {
                let spawned = thread::Builder::new()
                    .name(format!("fetch-{}", i))
                    .spawn_scoped(scope, move || {
                        fetch_isolated(store, connector, key, mode, limit)
                    });
                (key, spawned)
            })
            .collect();

        tasks
            .into_iter()
            .map(|(key, spawned)| match spawned {
                Ok(handle) => handle.join().unwrap_or_else(|_| {
                    AccountResult::failed(key.as_str(), "Fetch task panicked")
                }),
                Err(e) => {
                    warn!("Failed to spawn fetch thread for {} ({}); fetching inline", key, e);
                    fetch_isolated(store, connector, key, mode, limit)
                }
            })
            .collect()
    })
}

/// Task boundary: nothing raised inside escapes as anything but data
fn fetch_isolated(
    store: &dyn CredentialStore,
    connector: &dyn MailboxConnector,
    key: &str,
    mode: FetchMode,
    limit: FetchLimit,
) -> AccountResult {
    let mut identity = key.to_string();
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        fetch_account(store, connector, key, mode, limit, &mut identity)
    }));

    match outcome {
        Ok(Ok(result)) => result,
        Ok(Err(e)) => {
            let rejected = e
                .chain()
                .find_map(|cause| cause.downcast_ref::<GmailApiError>())
                .is_some_and(GmailApiError::is_auth_failure);
            if rejected {
                warn!("Credential for {} was rejected; re-add the account: {:#}", identity, e);
            } else {
                warn!("Failed to fetch {} for {}: {:#}", mode, identity, e);
            }
            AccountResult::failed(identity, format!("{:#}", e))
        }
        Err(payload) => {
            let reason = panic_message(payload.as_ref());
            error!("Fetch task for {} panicked: {}", identity, reason);
            AccountResult::failed(identity, format!("Fetch task panicked: {}", reason))
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
