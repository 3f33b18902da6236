//! API-specific error types
//!
//! Every failure of an authenticated call is reported as an [`ApiError`].
//! Errors are `Clone` because a single refresh outcome is handed to every
//! request that was waiting on it.

use std::fmt;
use std::time::Duration;

use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;
use tidylinker_common::StoreError;
use tidylinker_domain::constants::PROFILE_MISSING_MARKERS;
use tidylinker_domain::TidyLinkerError;

/// Categories of API errors, used for logging and by callers that branch on
/// the kind of failure rather than the exact variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorCategory {
    /// 401/403
    Authentication,
    /// 429
    RateLimit,
    /// 5xx
    Server,
    /// Other 4xx and undecodable bodies
    Client,
    /// Transport failures and timeouts
    Network,
    /// Misconfiguration and local storage failures
    Config,
    /// The session was ended (refresh failed or profile gone)
    Session,
}

/// Non-2xx response as seen by the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorResponse {
    pub status: u16,
    pub url: String,
    /// Body parsed as JSON, when it was JSON.
    pub body: Option<Value>,
    /// Body as received.
    pub raw: String,
}

impl ErrorResponse {
    pub fn new(status: StatusCode, url: impl Into<String>, raw: String) -> Self {
        let body = serde_json::from_str(&raw).ok();
        Self { status: status.as_u16(), url: url.into(), body, raw }
    }

    /// Human readable message from the backend's `detail` or `errormessage`
    /// field.
    pub fn detail(&self) -> Option<&str> {
        let body = self.body.as_ref()?;
        ["detail", "errormessage"].iter().find_map(|key| body.get(*key).and_then(Value::as_str))
    }

    /// Whether the backend says the signed-in profile no longer exists.
    pub fn is_profile_missing(&self) -> bool {
        let Some(body) = self.body.as_ref() else {
            return false;
        };
        ["errormessage", "detail"]
            .iter()
            .filter_map(|key| body.get(*key).and_then(Value::as_str))
            .any(|text| PROFILE_MISSING_MARKERS.iter().any(|marker| text.contains(marker)))
    }
}

impl fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} returned status {}", self.url, self.status)?;
        match self.detail() {
            Some(detail) => write!(f, ": {detail}"),
            None if !self.raw.is_empty() && self.body.is_none() => write!(f, ": {}", self.raw),
            None => Ok(()),
        }
    }
}

/// API operation errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ApiError {
    #[error("Authentication failed: {0}")]
    Auth(ErrorResponse),

    #[error("Rate limit exceeded: {0}")]
    RateLimit(ErrorResponse),

    #[error("Server error: {0}")]
    Server(ErrorResponse),

    #[error("Client error: {0}")]
    Client(ErrorResponse),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Credential storage error: {0}")]
    Storage(String),

    #[error("Credential refresh failed: {0}")]
    RefreshFailed(Box<ApiError>),

    #[error("Profile no longer exists: {0}")]
    ProfileMissing(ErrorResponse),
}

impl ApiError {
    /// Build the error for a non-2xx response.
    pub fn from_response(response: ErrorResponse) -> Self {
        match response.status {
            401 | 403 => Self::Auth(response),
            429 => Self::RateLimit(response),
            500..=599 => Self::Server(response),
            _ => Self::Client(response),
        }
    }

    /// Get the error category for this error
    pub fn category(&self) -> ApiErrorCategory {
        match self {
            Self::Auth(_) => ApiErrorCategory::Authentication,
            Self::RateLimit(_) => ApiErrorCategory::RateLimit,
            Self::Server(_) => ApiErrorCategory::Server,
            Self::Client(_) | Self::Decode(_) => ApiErrorCategory::Client,
            Self::Network(_) | Self::Timeout(_) => ApiErrorCategory::Network,
            Self::Config(_) | Self::Storage(_) => ApiErrorCategory::Config,
            Self::RefreshFailed(_) | Self::ProfileMissing(_) => ApiErrorCategory::Session,
        }
    }

    /// The backend response behind this error, if there was one.
    pub fn response(&self) -> Option<&ErrorResponse> {
        match self {
            Self::Auth(r)
            | Self::RateLimit(r)
            | Self::Server(r)
            | Self::Client(r)
            | Self::ProfileMissing(r) => Some(r),
            Self::RefreshFailed(inner) => inner.response(),
            _ => None,
        }
    }

    /// HTTP status of the response behind this error.
    pub fn status(&self) -> Option<u16> {
        self.response().map(|r| r.status)
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Auth(r) if r.status == 401)
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        Self::Storage(err.to_string())
    }
}

/// Map transport-level errors from [`crate::http::HttpClient`].
impl From<TidyLinkerError> for ApiError {
    fn from(err: TidyLinkerError) -> Self {
        match err {
            TidyLinkerError::Config(msg) | TidyLinkerError::InvalidInput(msg) => Self::Config(msg),
            TidyLinkerError::Storage(msg) => Self::Storage(msg),
            other => Self::Network(other.to_string()),
        }
    }
}
