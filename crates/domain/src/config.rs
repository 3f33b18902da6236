//! Configuration management

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_API_BASE_URL, DEFAULT_CREDENTIAL_FILE, DEFAULT_HTTP_TIMEOUT_MS,
    DEFAULT_KEYCHAIN_SERVICE, DEFAULT_USER_AGENT, LOGOUT_GRACE_MS, RECONNECT_BASE_MS,
    RECONNECT_MAX_MS,
};

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub realtime: RealtimeConfig,
    pub session: SessionConfig,
    pub storage: StorageConfig,
}

/// HTTP backend configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Backend origin, e.g. `https://cgsabiozard.co.uk`
    pub base_url: String,
    pub timeout_ms: u64,
    pub user_agent: String,
}

impl ApiConfig {
    /// Base URL without trailing slashes.
    pub fn normalized_base_url(&self) -> String {
        self.base_url.trim_end_matches('/').to_string()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_string(),
            timeout_ms: DEFAULT_HTTP_TIMEOUT_MS,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// Realtime (WebSocket) configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RealtimeConfig {
    /// Dedicated WebSocket origin. Falls back to the API base URL when unset.
    pub ws_base_url: Option<String>,
    pub reconnect_base_ms: u64,
    pub reconnect_max_ms: u64,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            ws_base_url: None,
            reconnect_base_ms: RECONNECT_BASE_MS,
            reconnect_max_ms: RECONNECT_MAX_MS,
        }
    }
}

/// Session behaviour configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Window after a logout during which 401s are not turned into refreshes.
    pub logout_grace_ms: u64,
}

impl SessionConfig {
    pub fn logout_grace(&self) -> Duration {
        Duration::from_millis(self.logout_grace_ms)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { logout_grace_ms: LOGOUT_GRACE_MS }
    }
}

/// Where durable session values are kept
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    File,
    Keychain,
    Memory,
}

impl std::str::FromStr for StorageBackend {
    type Err = String;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "file" => Ok(Self::File),
            "keychain" => Ok(Self::Keychain),
            "memory" => Ok(Self::Memory),
            other => Err(format!("unknown credential store backend: {other}")),
        }
    }
}

/// Credential storage configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// File used by the `file` backend
    pub path: PathBuf,
    /// Service name used by the `keychain` backend
    pub keychain_service: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::File,
            path: PathBuf::from(DEFAULT_CREDENTIAL_FILE),
            keychain_service: DEFAULT_KEYCHAIN_SERVICE.to_string(),
        }
    }
}
