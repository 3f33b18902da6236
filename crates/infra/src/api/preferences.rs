//! Notification preference endpoints

use std::sync::Arc;

use serde_json::{json, Map, Value};
use tidylinker_domain::constants::{
    PREFERENCES_EVENTS_PATH, PREFERENCES_PATH, PREFERENCES_RESET_PATH,
};
use tidylinker_domain::NotificationPreferences;

use super::client::ApiClient;
use super::errors::ApiError;

#[derive(Clone)]
pub struct PreferencesService {
    client: Arc<ApiClient>,
}

impl PreferencesService {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }

    pub async fn get(&self) -> Result<NotificationPreferences, ApiError> {
        self.client.get(PREFERENCES_PATH).await
    }

    /// Update only the given settings.
    pub async fn patch(
        &self,
        changes: &Map<String, Value>,
    ) -> Result<NotificationPreferences, ApiError> {
        self.client.patch(PREFERENCES_PATH, changes).await
    }

    /// Replace all settings.
    pub async fn replace(
        &self,
        preferences: &NotificationPreferences,
    ) -> Result<NotificationPreferences, ApiError> {
        self.client.put(PREFERENCES_PATH, preferences).await
    }

    pub async fn reset(&self) -> Result<NotificationPreferences, ApiError> {
        self.client.post(PREFERENCES_RESET_PATH, &json!({})).await
    }

    pub async fn available_events(&self) -> Result<Value, ApiError> {
        self.client.get(PREFERENCES_EVENTS_PATH).await
    }
}
