//! Web OAuth enrollment of new accounts
//!
//! `/add_user` starts a consent flow with a fresh `state` value and
//! `/oauth2callback` finishes it: the state is checked (one use only), the
//! code is exchanged for tokens, the account email is looked up with the new
//! access token and the credential is saved under that email.

use anyhow::Result;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use log::{info, warn};
use rand::Rng;
use std::collections::VecDeque;
use std::sync::Mutex;

use mail::{Credential, CredentialStore, GmailAuth, GmailClient, StoreError};

/// Path Google redirects back to after consent
pub const CALLBACK_PATH: &str = "/oauth2callback";

/// Oldest unfinished flows are forgotten beyond this many
const MAX_PENDING: usize = 64;

/// The provider side of the authorization code flow
pub trait OAuthFlow: Send + Sync {
    /// Redirect URI fixed by configuration, if any
    fn configured_redirect_uri(&self) -> Option<&str>;

    fn authorization_url(&self, redirect_uri: &str, state: &str) -> String;

    fn exchange_code(&self, code: &str, redirect_uri: &str) -> Result<Credential>;

    /// Email address of the account a fresh credential belongs to
    fn account_email(&self, credential: &Credential) -> Result<String>;
}

impl OAuthFlow for GmailAuth {
    fn configured_redirect_uri(&self) -> Option<&str> {
        self.redirect_uri()
    }

    fn authorization_url(&self, redirect_uri: &str, state: &str) -> String {
        GmailAuth::authorization_url(self, redirect_uri, state)
    }

    fn exchange_code(&self, code: &str, redirect_uri: &str) -> Result<Credential> {
        GmailAuth::exchange_code(self, code, redirect_uri)
    }

    fn account_email(&self, credential: &Credential) -> Result<String> {
        let profile = GmailClient::new(credential.access_token.clone()).get_profile()?;
        Ok(profile.email_address)
    }
}

/// Errors that end an enrollment attempt
#[derive(Debug, thiserror::Error)]
pub enum EnrollError {
    #[error("Authorization was denied: {0}")]
    Denied(String),

    #[error("Authorization response did not include a code")]
    MissingCode,

    #[error("Unknown or already used OAuth state; start again from /add_user")]
    UnknownState,

    #[error("{0:#}")]
    Provider(anyhow::Error),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Pending OAuth state lock poisoned")]
    Poisoned,
}

impl EnrollError {
    /// Whether the attempt failed because of the request rather than the server
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Denied(_) | Self::MissingCode | Self::UnknownState)
    }
}

/// Query parameters Google sends to the callback
#[derive(Debug, Default, Clone)]
pub struct CallbackParams<'a> {
    pub code: Option<&'a str>,
    pub state: Option<&'a str>,
    pub error: Option<&'a str>,
}

/// Enrollment flows in progress
pub struct Enrollment {
    flow: Box<dyn OAuthFlow>,
    pending: Mutex<VecDeque<String>>,
}

impl Enrollment {
    pub fn new(flow: impl OAuthFlow + 'static) -> Self {
        Self {
            flow: Box::new(flow),
            pending: Mutex::new(VecDeque::new()),
        }
    }

    /// Redirect URI for a request arriving at `base_url`
    pub fn redirect_uri(&self, base_url: &str) -> String {
        match self.flow.configured_redirect_uri() {
            Some(uri) => uri.to_string(),
            None => format!("{}{}", base_url.trim_end_matches('/'), CALLBACK_PATH),
        }
    }

    /// Start a flow and return the consent URL to redirect the browser to
    pub fn begin(&self, base_url: &str) -> Result<String, EnrollError> {
        let state = new_state();
        {
            let mut pending = self.pending.lock().map_err(|_| EnrollError::Poisoned)?;
            if pending.len() >= MAX_PENDING {
                pending.pop_front();
            }
            pending.push_back(state.clone());
        }

        Ok(self.flow.authorization_url(&self.redirect_uri(base_url), &state))
    }

    /// Finish a flow and store the new credential; returns the account email
    pub fn complete(
        &self,
        params: &CallbackParams<'_>,
        base_url: &str,
        store: &dyn CredentialStore,
    ) -> Result<String, EnrollError> {
        let known_state = match params.state {
            Some(state) => self.take_state(state)?,
            None => false,
        };

        if let Some(error) = params.error {
            warn!("OAuth consent returned an error: {}", error);
            return Err(EnrollError::Denied(error.to_string()));
        }
        if !known_state {
            return Err(EnrollError::UnknownState);
        }
        let code = params
            .code
            .filter(|c| !c.is_empty())
            .ok_or(EnrollError::MissingCode)?;

        let redirect_uri = self.redirect_uri(base_url);
        let credential = self
            .flow
            .exchange_code(code, &redirect_uri)
            .map_err(EnrollError::Provider)?;
        let email = self
            .flow
            .account_email(&credential)
            .map_err(EnrollError::Provider)?;

        let replaced = store.contains(&email)?;
        store.save(&email, &credential)?;
        if replaced {
            info!("Replaced credential for {}", email);
        } else {
            info!("Added account {}", email);
        }
        Ok(email)
    }

    fn take_state(&self, state: &str) -> Result<bool, EnrollError> {
        let mut pending = self.pending.lock().map_err(|_| EnrollError::Poisoned)?;
        match pending.iter().position(|s| s == state) {
            Some(index) => {
                pending.remove(index);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/// Random URL-safe state value (32 bytes of entropy)
fn new_state() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use anyhow::anyhow;
    use mail::InMemoryCredentialStore;

    /// Flow that accepts the code "good" and owns the account "new@example.com"
    pub(crate) struct FakeFlow {
        pub redirect_uri: Option<String>,
    }

    impl OAuthFlow for FakeFlow {
        fn configured_redirect_uri(&self) -> Option<&str> {
            self.redirect_uri.as_deref()
        }

        fn authorization_url(&self, redirect_uri: &str, state: &str) -> String {
            format!("https://consent.test/auth?redirect_uri={}&state={}", redirect_uri, state)
        }

        fn exchange_code(&self, code: &str, _redirect_uri: &str) -> Result<Credential> {
            if code == "good" {
                Ok(Credential::new("fresh-access").with_refresh_token("fresh-refresh"))
            } else {
                Err(anyhow!("invalid_grant"))
            }
        }

        fn account_email(&self, _credential: &Credential) -> Result<String> {
            Ok("new@example.com".to_string())
        }
    }

    pub(crate) fn state_from(url: &str) -> String {
        url.split("state=").nth(1).unwrap().to_string()
    }

    fn enrollment() -> Enrollment {
        Enrollment::new(FakeFlow { redirect_uri: None })
    }

    #[test]
    fn test_new_state_is_random_base64url() {
        let a = new_state();
        let b = new_state();
        assert_ne!(a, b);
        assert_eq!(a.len(), 43);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn test_redirect_uri_derived_or_configured() {
        let derived = enrollment();
        assert_eq!(
            derived.redirect_uri("https://mail.example.com/"),
            "https://mail.example.com/oauth2callback"
        );

        let fixed = Enrollment::new(FakeFlow {
            redirect_uri: Some("http://localhost:5000/oauth2callback".to_string()),
        });
        assert_eq!(
            fixed.redirect_uri("https://ignored.example.com"),
            "http://localhost:5000/oauth2callback"
        );
    }

    #[test]
    fn test_complete_saves_credential_under_email() {
        let enrollment = enrollment();
        let store = InMemoryCredentialStore::new();
        let url = enrollment.begin("http://localhost:5000").unwrap();
        let state = state_from(&url);

        let params = CallbackParams {
            code: Some("good"),
            state: Some(&state),
            error: None,
        };
        let email = enrollment.complete(&params, "http://localhost:5000", &store).unwrap();

        assert_eq!(email, "new@example.com");
        let saved = store.load("new@example.com").unwrap().unwrap();
        assert_eq!(saved.access_token, "fresh-access");
    }

    #[test]
    fn test_state_is_single_use() {
        let enrollment = enrollment();
        let store = InMemoryCredentialStore::new();
        let state = state_from(&enrollment.begin("http://localhost").unwrap());
        let params = CallbackParams {
            code: Some("good"),
            state: Some(&state),
            error: None,
        };

        assert!(enrollment.complete(&params, "http://localhost", &store).is_ok());
        let replay = enrollment.complete(&params, "http://localhost", &store);
        assert!(matches!(replay, Err(EnrollError::UnknownState)));
    }

    #[test]
    fn test_unknown_state_and_denied_consent() {
        let enrollment = enrollment();
        let store = InMemoryCredentialStore::new();

        let forged = CallbackParams {
            code: Some("good"),
            state: Some("forged"),
            error: None,
        };
        assert!(matches!(
            enrollment.complete(&forged, "http://localhost", &store),
            Err(EnrollError::UnknownState)
        ));

        let state = state_from(&enrollment.begin("http://localhost").unwrap());
        let denied = CallbackParams {
            code: None,
            state: Some(&state),
            error: Some("access_denied"),
        };
        let err = enrollment
            .complete(&denied, "http://localhost", &store)
            .unwrap_err();
        assert!(err.is_client_error());
        assert!(err.to_string().contains("access_denied"));
        assert!(store.list_accounts().unwrap().is_empty());
    }

    #[test]
    fn test_exchange_failure_is_provider_error() {
        let enrollment = enrollment();
        let store = InMemoryCredentialStore::new();
        let state = state_from(&enrollment.begin("http://localhost").unwrap());
        let params = CallbackParams {
            code: Some("expired"),
            state: Some(&state),
            error: None,
        };

        let err = enrollment.complete(&params, "http://localhost", &store).unwrap_err();
        assert!(!err.is_client_error());
        assert_eq!(err.to_string(), "invalid_grant");
    }

    #[test]
    fn test_pending_states_are_bounded() {
        let enrollment = enrollment();
        let first = state_from(&enrollment.begin("http://localhost").unwrap());
        for _ in 0..MAX_PENDING {
            enrollment.begin("http://localhost").unwrap();
        }
        assert!(!enrollment.take_state(&first).unwrap());
    }
}
