//! Classification of transport failures.
//!
//! Everything the HTTP layer can fail with is mapped onto the [`BibError`]
//! taxonomy here, so callers above the transport only ever see classified
//! errors.

use reqwest::StatusCode;
use serde::Deserialize;

use crate::error::BibError;

/// Error body the service sends alongside non-2xx statuses.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Pull a message out of an error response body, if it has one.
pub fn extract_message(body: &str) -> Option<String> {
    let body = body.trim();
    if body.is_empty() {
        return None;
    }
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) => parsed.message.or(parsed.error),
        Err(_) if body.len() <= 200 && !body.starts_with('<') => Some(body.to_string()),
        Err(_) => None,
    }
}

/// Map a non-success HTTP status to an error.
pub fn classify_status(status: StatusCode, body: &str, resource: &str) -> BibError {
    let message = extract_message(body);
    match status {
        StatusCode::UNAUTHORIZED => BibError::Unauthorized,
        StatusCode::FORBIDDEN => BibError::Forbidden,
        StatusCode::NOT_FOUND => BibError::NotFound(resource.to_string()),
        s if s.is_server_error() => BibError::Server {
            status: s.as_u16(),
            message: message.unwrap_or_else(|| {
                s.canonical_reason().unwrap_or("server error").to_string()
            }),
        },
        s => BibError::Api(match message {
            Some(m) => format!("{m} (HTTP {})", s.as_u16()),
            None => format!("HTTP {}", s),
        }),
    }
}

/// Map a `reqwest` failure to an error.
pub fn classify_transport(err: reqwest::Error) -> BibError {
    if let Some(status) = err.status() {
        return classify_status(status, "", err.url().map(|u| u.path()).unwrap_or(""));
    }
    if err.is_timeout() {
        return BibError::Offline(format!("request timed out: {err}"));
    }
    if err.is_connect() {
        return BibError::Offline(err.to_string());
    }
    if err.is_decode() {
        return BibError::Decoding(err.to_string());
    }
    if err.is_builder() {
        return BibError::InvalidRequest(err.to_string());
    }
    BibError::Transport(err.to_string())
}

impl From<reqwest::Error> for BibError {
    fn from(err: reqwest::Error) -> Self {
        classify_transport(err)
    }
}

impl From<url::ParseError> for BibError {
    fn from(err: url::ParseError) -> Self {
        BibError::InvalidRequest(err.to_string())
    }
}
