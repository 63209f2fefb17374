//! Server settings read from the environment

use log::warn;
use std::path::PathBuf;
use std::str::FromStr;

const ENV_HOST: &str = "HOST";
const ENV_PORT: &str = "PORT";
const ENV_TOKENS_DIR: &str = "TOKENS_DIR";
const ENV_WORKERS: &str = "HTTP_WORKERS";

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 5000;
const DEFAULT_WORKERS: usize = 4;

/// Directory name for account tokens under the config directory
const TOKENS_DIR: &str = "tokens";

/// Listener and storage settings for the HTTP server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Directory holding one credential file per account
    pub tokens_dir: PathBuf,
    /// Number of threads accepting requests
    pub workers: usize,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from a custom environment lookup.
    ///
    /// Unparsable values are logged and replaced by their defaults.
    pub fn from_lookup<F>(env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let value = |key: &str| env(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let tokens_dir = value(ENV_TOKENS_DIR)
            .map(PathBuf::from)
            .or_else(|| config::config_path(TOKENS_DIR))
            .unwrap_or_else(|| PathBuf::from(TOKENS_DIR));

        let workers = parse_or(value(ENV_WORKERS), ENV_WORKERS, DEFAULT_WORKERS);

        Self {
            host: value(ENV_HOST).unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: parse_or(value(ENV_PORT), ENV_PORT, DEFAULT_PORT),
            tokens_dir,
            workers: if workers == 0 {
                warn!("{} must be at least 1; using {}", ENV_WORKERS, DEFAULT_WORKERS);
                DEFAULT_WORKERS
            } else {
                workers
            },
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<T: FromStr + Copy + std::fmt::Display>(raw: Option<String>, key: &str, default: T) -> T {
    match raw {
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("Ignoring invalid {}={:?}; using {}", key, raw, default);
            default
        }),
        None => default,
    }
}
