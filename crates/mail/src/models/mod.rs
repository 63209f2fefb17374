//! Domain models for accounts, credentials and fetched mail

mod account;
mod credential;
mod message;

pub use account::{AccountResult, AggregateResponse, NO_ACCOUNTS_MESSAGE};
pub use credential::Credential;
pub use message::{MessageId, MessageSummary};
