//! Access token cache with write-through persistence
//!
//! Holds the current access credential and the last logout time. Reads are
//! synchronous and served from memory so request building never awaits
//! storage; writes update memory first and then persist.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use parking_lot::RwLock;
use tidylinker_domain::constants::{ACCESS_TOKEN_KEY, LOGGED_OUT_AT_KEY};
use tracing::{debug, info};

use super::store::{CredentialStore, StoreError};

#[derive(Debug, Default)]
struct TokenState {
    access_token: Option<String>,
    logged_out_at: Option<DateTime<Utc>>,
}

/// Shared, process-wide view of the session credential.
///
/// At most one access token is current; every write replaces it for all
/// later requests and socket connections.
pub struct TokenStore {
    store: Arc<dyn CredentialStore>,
    state: RwLock<TokenState>,
}

impl TokenStore {
    /// Create an empty token store over `store` without reading it.
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self { store, state: RwLock::new(TokenState::default()) }
    }

    /// Create a token store hydrated from whatever `store` already holds.
    ///
    /// # Errors
    /// Returns the underlying [`StoreError`] if the store cannot be read.
    pub async fn load(store: Arc<dyn CredentialStore>) -> Result<Self, StoreError> {
        let access_token = store.load(ACCESS_TOKEN_KEY).await?.filter(|t| !t.is_empty());
        let logged_out_at = store.load(LOGGED_OUT_AT_KEY).await?.as_deref().and_then(parse_timestamp);

        debug!(
            has_token = access_token.is_some(),
            has_logout_marker = logged_out_at.is_some(),
            "token store hydrated"
        );

        Ok(Self { store, state: RwLock::new(TokenState { access_token, logged_out_at }) })
    }

    /// Current access token, if any.
    pub fn access_token(&self) -> Option<String> {
        self.state.read().access_token.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.read().access_token.is_some()
    }

    /// Replace the access token.
    ///
    /// # Errors
    /// The in-memory value is updated even when persisting fails.
    pub async fn set_access_token(&self, token: impl Into<String>) -> Result<(), StoreError> {
        let token = token.into();
        self.state.write().access_token = Some(token.clone());
        self.store.save(ACCESS_TOKEN_KEY, &token).await?;
        debug!("access token stored");
        Ok(())
    }

    /// Remove the access token.
    ///
    /// # Errors
    /// The in-memory value is cleared even when persisting fails.
    pub async fn clear_access_token(&self) -> Result<(), StoreError> {
        self.state.write().access_token = None;
        self.store.remove(ACCESS_TOKEN_KEY).await?;
        debug!("access token cleared");
        Ok(())
    }

    /// Record that the session just ended.
    ///
    /// # Errors
    /// The in-memory marker is set even when persisting fails.
    pub async fn mark_logged_out(&self) -> Result<(), StoreError> {
        let now = Utc::now();
        self.state.write().logged_out_at = Some(now);
        self.store.save(LOGGED_OUT_AT_KEY, &now.timestamp_millis().to_string()).await?;
        info!(logged_out_at = %now, "logout recorded");
        Ok(())
    }

    pub fn logged_out_at(&self) -> Option<DateTime<Utc>> {
        self.state.read().logged_out_at
    }

    /// Whether the last logout happened less than `window` ago.
    pub fn logged_out_within(&self, window: Duration) -> bool {
        let Some(at) = self.logged_out_at() else {
            return false;
        };
        let elapsed = Utc::now().signed_duration_since(at);
        match elapsed.to_std() {
            Ok(elapsed) => elapsed < window,
            // Marker in the future (clock moved back): treat as recent.
            Err(_) => true,
        }
    }
}

impl std::fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read();
        f.debug_struct("TokenStore")
            .field("has_token", &state.access_token.is_some())
            .field("logged_out_at", &state.logged_out_at)
            .finish()
    }
}

/// Accepts epoch milliseconds or RFC 3339.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ms) = raw.parse::<i64>() {
        return Utc.timestamp_millis_opt(ms).single();
    }
    DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.with_timezone(&Utc))
}
