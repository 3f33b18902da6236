//! Request descriptions
//!
//! A [`RequestSpec`] is a plain value, so the client can rebuild and resend
//! the same call after a credential refresh.

use reqwest::Method;
use serde::Serialize;
use serde_json::Value;
use tidylinker_domain::constants::{ADMIN_LOGIN_PATH, LOGIN_PATH, REFRESH_PATH};

use super::errors::ApiError;

/// How a request is authenticated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthMode {
    /// Bearer token when one is stored, plus cookies.
    #[default]
    Bearer,
    /// Cookies only, no bearer header. Used by refresh and logout.
    CookieOnly,
    /// Neither bearer header nor cookies, and never refreshed.
    Anonymous,
}

/// One HTTP call against the backend.
#[derive(Debug, Clone)]
pub struct RequestSpec {
    pub method: Method,
    /// Path relative to the base URL, or an absolute `http(s)` URL.
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    pub auth: AuthMode,
}

impl RequestSpec {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self { method, path: path.into(), query: Vec::new(), body: None, auth: AuthMode::Bearer }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Attach a JSON body.
    ///
    /// # Errors
    /// Returns [`ApiError::Decode`] if `body` cannot be serialized.
    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Result<Self, ApiError> {
        let value = serde_json::to_value(body)
            .map_err(|e| ApiError::Decode(format!("Failed to serialize body: {e}")))?;
        self.body = Some(value);
        Ok(self)
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Send without credentials of any kind.
    pub fn skip_auth(mut self) -> Self {
        self.auth = AuthMode::Anonymous;
        self
    }

    /// Send cookies but no bearer header.
    pub fn cookie_only(mut self) -> Self {
        self.auth = AuthMode::CookieOnly;
        self
    }

    pub fn is_login(&self) -> bool {
        self.path.contains(LOGIN_PATH) || self.path.contains(ADMIN_LOGIN_PATH)
    }

    pub fn is_refresh(&self) -> bool {
        self.path.contains(REFRESH_PATH)
    }

    /// Full URL for this request against `base_url`.
    pub(crate) fn url(&self, base_url: &str) -> String {
        if self.path.starts_with("http://") || self.path.starts_with("https://") {
            return self.path.clone();
        }
        if self.path.starts_with('/') {
            format!("{base_url}{}", self.path)
        } else {
            format!("{base_url}/{}", self.path)
        }
    }
}
