//! Multi-account fan-out fetch
//!
//! Given every registered account, fetch each one concurrently and merge
//! the outcomes into one [`AggregateResponse`](crate::models::AggregateResponse).
//! A failure in one account never affects another.

mod adapters;
mod fan_out;
mod limit;
mod mailbox;

pub use adapters::{fetch_latest, fetch_unread};
pub use fan_out::aggregate;
pub use limit::{FetchLimit, FetchMode};
pub use mailbox::{Mailbox, MailboxConnector};
