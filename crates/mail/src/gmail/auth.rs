//! Gmail OAuth2 authentication
//!
//! Implements the server side of the OAuth2 authorization code flow
//! (consent URL + code exchange) and access-token refresh for stored
//! credentials. Uses synchronous HTTP (ureq) to be executor-agnostic.

use anyhow::{Context, Result};
use log::debug;
use serde::Deserialize;

use super::client::{TOKEN_REFRESH, status_error};
use crate::config::GmailCredentials;
use crate::models::Credential;

/// OAuth2 client configuration for Gmail
#[derive(Debug, Clone)]
pub struct GmailAuth {
    client_id: String,
    client_secret: String,
    redirect_uri: Option<String>,
}

/// Token response from Google
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: Option<u64>,
    scope: Option<String>,
}

impl GmailAuth {
    /// Gmail API OAuth2 endpoints
    const AUTH_URL: &'static str = "https://accounts.google.com/o/oauth2/auth";
    const TOKEN_URL: &'static str = "https://oauth2.googleapis.com/token";

    /// Read-only access is all the aggregator needs
    pub const GMAIL_READONLY_SCOPE: &'static str =
        "https://www.googleapis.com/auth/gmail.readonly";

    /// Create a new GmailAuth from resolved client credentials
    pub fn new(credentials: &GmailCredentials) -> Self {
        Self {
            client_id: credentials.client_id.clone(),
            client_secret: credentials.client_secret.clone(),
            redirect_uri: credentials.redirect_uri.clone(),
        }
    }

    /// Redirect URI configured for this client, if any
    pub fn redirect_uri(&self) -> Option<&str> {
        self.redirect_uri.as_deref()
    }

    /// Build the consent URL the user is redirected to
    ///
    /// Requests offline access and forces the consent prompt so Google
    /// always hands back a refresh token.
    pub fn authorization_url(&self, redirect_uri: &str, state: &str) -> String {
        format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&state={}&access_type=offline&include_granted_scopes=true&prompt=consent",
            Self::AUTH_URL,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(redirect_uri),
            urlencoding::encode(Self::GMAIL_READONLY_SCOPE),
            urlencoding::encode(state),
        )
    }

    /// Exchange an authorization code for a credential
    pub fn exchange_code(&self, code: &str, redirect_uri: &str) -> Result<Credential> {
        let token = request_token(
            Self::TOKEN_URL,
            &[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("code", code),
                ("grant_type", "authorization_code"),
                ("redirect_uri", redirect_uri),
            ],
            "authorization code exchange",
        )?;

        let mut credential = credential_from_response(token, None);
        credential.token_uri = Some(Self::TOKEN_URL.to_string());
        credential.client_id = Some(self.client_id.clone());
        credential.client_secret = Some(self.client_secret.clone());
        Ok(credential)
    }

    /// Refresh an expired credential.
    ///
    /// Prefers the client recorded in the credential itself, since a refresh
    /// token is only valid for the client that obtained it.
    pub fn refresh(&self, credential: &Credential) -> Result<Credential> {
        refresh_with_client(
            credential,
            Some((self.client_id.as_str(), self.client_secret.as_str())),
        )
    }
}

/// Get a usable access token for a stored credential, refreshing if needed.
///
/// The refreshed token is not written back to the store, so once the stored
/// access token has expired every call for that account goes through the
/// token endpoint again. Fetching stays read-only on the store as a result.
pub fn resolve_access_token(credential: &Credential, auth: Option<&GmailAuth>) -> Result<String> {
    if !credential.is_expired() {
        return Ok(credential.access_token.clone());
    }

    let refreshed = match auth {
        Some(auth) => auth.refresh(credential)?,
        None => refresh_with_client(credential, None)?,
    };
    Ok(refreshed.access_token)
}

fn refresh_with_client(credential: &Credential, fallback: Option<(&str, &str)>) -> Result<Credential> {
    let refresh_token = credential
        .refresh_token
        .as_deref()
        .context("Access token expired and no refresh token is stored")?;

    let (client_id, client_secret) = match (&credential.client_id, &credential.client_secret) {
        (Some(id), Some(secret)) => (id.as_str(), secret.as_str()),
        _ => fallback.context("Access token expired and no OAuth client is configured to refresh it")?,
    };

    let token_url = credential
        .token_uri
        .as_deref()
        .unwrap_or(GmailAuth::TOKEN_URL);

    debug!("Refreshing access token via {}", token_url);
    let token = request_token(
        token_url,
        &[
            ("client_id", client_id),
            ("client_secret", client_secret),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ],
        TOKEN_REFRESH,
    )?;

    Ok(credential_from_response(token, Some(credential)))
}

fn request_token(url: &str, form: &[(&str, &str)], operation: &'static str) -> Result<TokenResponse> {
    let mut response = ureq::post(url)
        .send_form(form.iter().copied())
        .map_err(|e| status_error(e, operation))?;

    response
        .body_mut()
        .read_json()
        .with_context(|| format!("Failed to parse {} response", operation))
}

/// Merge a token response into a credential, keeping fields Google omits on refresh
fn credential_from_response(token: TokenResponse, previous: Option<&Credential>) -> Credential {
    let mut credential = match previous {
        Some(prev) => Credential {
            access_token: token.access_token,
            expires_at: None,
            ..prev.clone()
        },
        None => Credential::new(token.access_token),
    };

    if let Some(refresh_token) = token.refresh_token {
        credential.refresh_token = Some(refresh_token);
    }
    if let Some(scope) = token.scope {
        credential.scopes = scope.split_whitespace().map(str::to_string).collect();
    }
    match token.expires_in {
        Some(secs) => credential.with_expires_in(secs),
        None => credential,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn test_auth() -> GmailAuth {
        GmailAuth::new(&GmailCredentials {
            client_id: "client id".to_string(),
            client_secret: "secret".to_string(),
            redirect_uri: Some("http://localhost:5000/oauth2callback".to_string()),
        })
    }

    #[test]
    fn test_authorization_url() {
        let auth = test_auth();
        let url = auth.authorization_url("http://localhost:5000/oauth2callback", "xyz");

        assert!(url.starts_with("https://accounts.google.com/o/oauth2/auth?"));
        assert!(url.contains("client_id=client%20id"));
        assert!(url.contains("redirect_uri=http%3A%2F%2Flocalhost%3A5000%2Foauth2callback"));
        assert!(url.contains("response_type=code"));
        assert!(url.contains("state=xyz"));
        assert!(url.contains("access_type=offline"));
        assert!(url.contains("include_granted_scopes=true"));
        assert!(url.contains("prompt=consent"));
        assert!(url.contains("gmail.readonly"));
    }

    #[test]
    fn test_valid_token_used_without_refresh() {
        let cred = Credential::new("still-good").with_expires_at(Utc::now() + Duration::hours(1));
        assert_eq!(resolve_access_token(&cred, None).unwrap(), "still-good");
    }

    #[test]
    fn test_expired_without_refresh_token_fails() {
        let cred = Credential::new("stale").with_expires_at(Utc::now() - Duration::hours(1));
        let err = resolve_access_token(&cred, Some(&test_auth())).unwrap_err();
        assert!(err.to_string().contains("no refresh token"));
    }

    #[test]
    fn test_expired_without_any_client_fails() {
        let cred = Credential::new("stale")
            .with_refresh_token("refresh")
            .with_expires_at(Utc::now() - Duration::hours(1));
        let err = resolve_access_token(&cred, None).unwrap_err();
        assert!(err.to_string().contains("no OAuth client"));
    }

    #[test]
    fn test_refresh_response_preserves_refresh_token() {
        let previous = Credential::new("old")
            .with_refresh_token("keep-me")
            .with_client("id", "secret");
        let token = TokenResponse {
            access_token: "new".to_string(),
            refresh_token: None,
            expires_in: Some(3600),
            scope: Some("a b".to_string()),
        };

        let merged = credential_from_response(token, Some(&previous));
        assert_eq!(merged.access_token, "new");
        assert_eq!(merged.refresh_token.as_deref(), Some("keep-me"));
        assert_eq!(merged.client_id.as_deref(), Some("id"));
        assert_eq!(merged.scopes, vec!["a".to_string(), "b".to_string()]);
        assert!(!merged.is_expired());
    }
}
