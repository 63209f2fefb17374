//! Request routing and JSON API handlers

use log::{error, info, warn};
use serde::Deserialize;
use serde_json::json;

use mail::{FetchLimit, FetchMode, StoreError};

use crate::assets;
use crate::enroll::{CALLBACK_PATH, CallbackParams, EnrollError};
use crate::http::{HttpRequest, HttpResponse, escape_html};
use crate::state::AppState;

/// Paths that exist under some method; anything else is a 404
const KNOWN_PATHS: &[&str] = &[
    "/",
    "/unread",
    "/latest",
    "/accounts",
    "/delete_user",
    "/add_user",
    CALLBACK_PATH,
];

/// Errors surfaced to API clients as `{"error": ...}`
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Email is required")]
    EmailRequired,

    #[error("User not found")]
    UserNotFound,

    #[error("Not found")]
    NotFound,

    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ApiError {
    pub fn status(&self) -> u16 {
        match self {
            Self::EmailRequired => 400,
            Self::UserNotFound | Self::NotFound => 404,
            Self::MethodNotAllowed => 405,
            Self::Store(_) => 500,
        }
    }

    fn into_response(self) -> HttpResponse {
        if let Self::Store(e) = &self {
            error!("Credential store error: {}", e);
        }
        HttpResponse::json(self.status(), &json!({ "error": self.to_string() }))
    }
}

/// Dispatch one request; every response carries CORS headers
pub fn handle(state: &AppState, request: &HttpRequest) -> HttpResponse {
    let response = if request.method == "OPTIONS" {
        HttpResponse::new(204)
            .with_header("Access-Control-Allow-Methods", "GET, POST, OPTIONS")
            .with_header("Access-Control-Allow-Headers", "Content-Type")
            .with_header("Access-Control-Max-Age", "86400")
    } else {
        route(state, request)
    };

    response.with_header("Access-Control-Allow-Origin", "*")
}

fn route(state: &AppState, request: &HttpRequest) -> HttpResponse {
    let result = match (request.method.as_str(), request.path.as_str()) {
        ("GET", "/") => Ok(index()),
        ("GET", "/unread") => aggregate(state, request, FetchMode::Unread),
        ("GET", "/latest") => aggregate(state, request, FetchMode::Latest),
        ("GET", "/accounts") => accounts(state),
        ("POST", "/delete_user") => delete_user(state, request),
        ("GET", "/add_user") => Ok(add_user(state, request)),
        ("GET", CALLBACK_PATH) => Ok(oauth_callback(state, request)),
        (_, path) if KNOWN_PATHS.contains(&path) => Err(ApiError::MethodNotAllowed),
        _ => Err(ApiError::NotFound),
    };

    result.unwrap_or_else(ApiError::into_response)
}

fn index() -> HttpResponse {
    match assets::index_html() {
        Some(html) => HttpResponse::html(200, html.into_owned()),
        None => HttpResponse::html(404, "<p>Frontend not bundled</p>"),
    }
}

fn aggregate(state: &AppState, request: &HttpRequest, mode: FetchMode) -> Result<HttpResponse, ApiError> {
    let limit = FetchLimit::parse(request.query_param("max"));
    let response = mail::aggregate(&*state.store, &*state.connector, mode, limit)?;
    Ok(HttpResponse::json(200, &response))
}

fn accounts(state: &AppState) -> Result<HttpResponse, ApiError> {
    let accounts = state.store.list_accounts()?;
    Ok(HttpResponse::json(200, &json!({ "accounts": accounts })))
}

#[derive(Deserialize)]
struct DeleteUserRequest {
    #[serde(default)]
    email: Option<String>,
}

fn delete_user(state: &AppState, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
    let email = serde_json::from_slice::<DeleteUserRequest>(&request.body)
        .ok()
        .and_then(|body| body.email)
        .map(|email| email.trim().to_string())
        .filter(|email| !email.is_empty())
        .ok_or(ApiError::EmailRequired)?;

    match state.store.delete(&email) {
        Ok(true) => {
            info!("Deleted account {}", email);
            Ok(HttpResponse::json(
                200,
                &json!({ "message": format!("User {} deleted successfully", email) }),
            ))
        }
        // A key the store would refuse cannot name a registered account
        Ok(false) | Err(StoreError::InvalidKey(_)) => Err(ApiError::UserNotFound),
        Err(e) => Err(e.into()),
    }
}

fn add_user(state: &AppState, request: &HttpRequest) -> HttpResponse {
    let Some(enrollment) = &state.enrollment else {
        return error_page(
            500,
            "Error setting up OAuth: no Google OAuth client is configured",
        );
    };

    match enrollment.begin(&request.base_url()) {
        Ok(url) => HttpResponse::redirect(&url),
        Err(e) => {
            error!("Failed to start OAuth flow: {}", e);
            error_page(500, &format!("Error setting up OAuth: {}", e))
        }
    }
}

fn oauth_callback(state: &AppState, request: &HttpRequest) -> HttpResponse {
    let Some(enrollment) = &state.enrollment else {
        return error_page(
            500,
            "Error adding account: no Google OAuth client is configured",
        );
    };

    let params = CallbackParams {
        code: request.query_param("code"),
        state: request.query_param("state"),
        error: request.query_param("error"),
    };

    match enrollment.complete(&params, &request.base_url(), &*state.store) {
        Ok(email) => HttpResponse::html(
            200,
            format!(
                "<p>Successfully added account: {}</p><p><a href='/'>Go to homepage</a></p>",
                escape_html(&email)
            ),
        ),
        Err(e) => {
            let status = if e.is_client_error() { 400 } else { 500 };
            if !matches!(e, EnrollError::Denied(_)) {
                warn!("Failed to add account: {}", e);
            }
            error_page(status, &format!("Error adding account: {}", e))
        }
    }
}

fn error_page(status: u16, message: &str) -> HttpResponse {
    HttpResponse::html(
        status,
        format!(
            "<p>{}</p><p><a href='/'>Go to homepage</a></p>",
            escape_html(message)
        ),
    )
}
