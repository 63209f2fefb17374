//! Courier - Multi-account Gmail inbox aggregator
//!
//! Serves a small web page plus a JSON API that fans out over every
//! registered Gmail account and merges their unread or latest messages.

use anyhow::{Context, Result};
use log::{error, info, warn};
use mail::{FileCredentialStore, GmailAuth, GmailConnector, GmailCredentials};

mod assets;
mod enroll;
mod http;
mod routes;
mod server;
mod settings;
mod state;

use enroll::Enrollment;
use settings::ServerConfig;
use state::AppState;

fn main() {
    // Pick up .env before anything reads the environment
    dotenvy::dotenv().ok();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    if let Err(e) = run() {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    if let Err(e) = config::init() {
        error!("Failed to initialize config directory: {}", e);
    }

    let settings = ServerConfig::from_env();
    let store = FileCredentialStore::open(&settings.tokens_dir)
        .with_context(|| format!("Failed to open token directory {}", settings.tokens_dir.display()))?;
    info!("Storing account tokens in {}", store.dir().display());

    let auth = match GmailCredentials::load() {
        Ok(creds) => {
            info!("Gmail OAuth client loaded");
            Some(GmailAuth::new(&creds))
        }
        Err(e) => {
            warn!("Gmail OAuth client not configured: {:#}", e);
            if let Some(path) = GmailCredentials::default_credentials_path() {
                warn!(
                    "To add accounts, either:\n\
                     1. Place your Google OAuth credentials at: {}\n\
                     2. Or set environment variables: GOOGLE_CLIENT_ID and GOOGLE_CLIENT_SECRET",
                    path.display()
                );
            }
            None
        }
    };

    let mut state = AppState::new(Box::new(store), Box::new(GmailConnector::new(auth.clone())));
    if let Some(auth) = auth {
        state = state.with_enrollment(Enrollment::new(auth));
    }

    server::run(&settings, state)
}
