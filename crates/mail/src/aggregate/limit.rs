//! Fetch mode and per-account message limit

use std::fmt;
use std::num::NonZeroUsize;

/// Which per-account fetch to perform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchMode {
    /// Unread messages in the inbox
    Unread,
    /// Most recent messages in the inbox, read or not
    Latest,
}

impl FetchMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unread => "unread",
            Self::Latest => "latest",
        }
    }
}

impl fmt::Display for FetchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Maximum number of messages fetched per account (always positive)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchLimit(NonZeroUsize);

impl FetchLimit {
    /// Limit used when the caller supplies none, or an unusable one
    pub const DEFAULT: Self = match NonZeroUsize::new(7) {
        Some(n) => Self(n),
        None => panic!("default limit must be positive"),
    };

    /// Create a limit; `None` for zero
    pub fn new(limit: usize) -> Option<Self> {
        NonZeroUsize::new(limit).map(Self)
    }

    /// Parse a caller-supplied limit.
    ///
    /// Missing, non-numeric, zero or negative input falls back to
    /// [`FetchLimit::DEFAULT`] rather than failing.
    pub fn parse(raw: Option<&str>) -> Self {
        raw.and_then(|s| s.trim().parse::<usize>().ok())
            .and_then(Self::new)
            .unwrap_or(Self::DEFAULT)
    }

    pub fn get(self) -> usize {
        self.0.get()
    }
}

impl Default for FetchLimit {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for FetchLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
