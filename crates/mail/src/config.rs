//! OAuth client configuration for Gmail access
//!
//! Client credentials are resolved through a single [`CredentialSource`]:
//! 1. Environment variables (`GOOGLE_CLIENT_ID`, `GOOGLE_CLIENT_SECRET`, `GOOGLE_REDIRECT_URI`)
//! 2. JSON file in Google Cloud Console format (`web` or `installed` section)
//!
//! [`CredentialSource::Auto`] tries them in that order.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Credentials filename looked up in the working and config directories
const CREDENTIALS_FILE: &str = "credentials.json";

const ENV_CLIENT_ID: &str = "GOOGLE_CLIENT_ID";
const ENV_CLIENT_SECRET: &str = "GOOGLE_CLIENT_SECRET";
const ENV_REDIRECT_URI: &str = "GOOGLE_REDIRECT_URI";
const ENV_CREDENTIALS_FILE: &str = "GOOGLE_CREDENTIALS_FILE";

/// OAuth client credentials for the Gmail API
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GmailCredentials {
    pub client_id: String,
    pub client_secret: String,
    /// Redirect URI registered for the web flow; derived per request when absent
    pub redirect_uri: Option<String>,
}

/// Where to look for OAuth client credentials
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialSource {
    /// Environment variables only
    Env,
    /// A specific Google Cloud Console credential file
    File(PathBuf),
    /// Environment first, then the first credential file that exists
    Auto,
}

/// Google Cloud Console credential file format
#[derive(Deserialize)]
struct GoogleCredentialFile {
    installed: Option<ClientSection>,
    web: Option<ClientSection>,
}

#[derive(Deserialize)]
struct ClientSection {
    client_id: String,
    client_secret: String,
    #[serde(default)]
    redirect_uris: Vec<String>,
}

impl GmailCredentials {
    /// Load credentials using [`CredentialSource::Auto`]
    pub fn load() -> Result<Self> {
        Self::resolve(&CredentialSource::Auto)
    }

    /// Load credentials from the given source
    pub fn resolve(source: &CredentialSource) -> Result<Self> {
        Self::resolve_with(source, |key| std::env::var(key).ok())
    }

    /// Resolve credentials with a custom environment lookup
    pub fn resolve_with<F>(source: &CredentialSource, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        match source {
            CredentialSource::Env => Self::from_lookup(&env),
            CredentialSource::File(path) => Self::from_file_with(path, &env),
            CredentialSource::Auto => {
                if let Ok(creds) = Self::from_lookup(&env) {
                    return Ok(creds);
                }
                let path = Self::candidate_files(&env)
                    .into_iter()
                    .find(|p| p.is_file())
                    .with_context(|| {
                        format!(
                            "No OAuth credentials found. Set {} and {}, or add {}",
                            ENV_CLIENT_ID, ENV_CLIENT_SECRET, CREDENTIALS_FILE
                        )
                    })?;
                Self::from_file_with(&path, &env)
            }
        }
    }

    /// Parse credentials from JSON string (Google Cloud Console format)
    pub fn from_json(json: &str) -> Result<Self> {
        let creds: GoogleCredentialFile =
            serde_json::from_str(json).context("Failed to parse credentials JSON")?;
        Self::from_credential_file(creds)
    }

    /// Default credentials file in the config directory (~/.config/courier/credentials.json)
    pub fn default_credentials_path() -> Option<PathBuf> {
        config::config_path(CREDENTIALS_FILE)
    }

    fn from_lookup<F>(env: &F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| env(key).filter(|v| !v.trim().is_empty());

        let client_id = non_empty(ENV_CLIENT_ID)
            .with_context(|| format!("{} environment variable not set", ENV_CLIENT_ID))?;
        let client_secret = non_empty(ENV_CLIENT_SECRET)
            .with_context(|| format!("{} environment variable not set", ENV_CLIENT_SECRET))?;

        Ok(Self {
            client_id,
            client_secret,
            redirect_uri: non_empty(ENV_REDIRECT_URI),
        })
    }

    fn from_file_with<F>(path: &Path, env: &F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let file: GoogleCredentialFile = config::load_json_file(path)?;
        let mut creds = Self::from_credential_file(file)?;

        // An explicit redirect URI in the environment wins over the file
        if let Some(uri) = env(ENV_REDIRECT_URI).filter(|v| !v.trim().is_empty()) {
            creds.redirect_uri = Some(uri);
        }
        Ok(creds)
    }

    /// Parse credentials from a GoogleCredentialFile
    fn from_credential_file(creds: GoogleCredentialFile) -> Result<Self> {
        // Support both "web" (server) and "installed" (desktop) credential types
        let section = creds
            .web
            .or(creds.installed)
            .context("Credentials file missing 'installed' or 'web' section")?;

        Ok(Self {
            client_id: section.client_id,
            client_secret: section.client_secret,
            redirect_uri: section.redirect_uris.into_iter().next(),
        })
    }

    /// Credential files tried by [`CredentialSource::Auto`], in priority order
    fn candidate_files<F>(env: &F) -> Vec<PathBuf>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut paths = Vec::new();
        if let Some(explicit) = env(ENV_CREDENTIALS_FILE) {
            paths.push(PathBuf::from(explicit));
        }
        paths.push(PathBuf::from(CREDENTIALS_FILE));
        if let Some(default) = Self::default_credentials_path() {
            paths.push(default);
        }
        paths
    }
}
