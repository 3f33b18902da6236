//! Notification endpoints

use std::sync::Arc;

use serde_json::Value;
use tidylinker_domain::constants::{
    NOTIFICATIONS_MARK_ALL_READ_PATH, NOTIFICATIONS_PATH, NOTIFICATIONS_UNREAD_COUNT_PATH,
};
use tidylinker_domain::{EntityId, NotificationPage, UnreadCount};

use super::client::ApiClient;
use super::errors::ApiError;
use super::request::RequestSpec;

#[derive(Clone)]
pub struct NotificationsService {
    client: Arc<ApiClient>,
}

impl NotificationsService {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }

    /// List notifications. `params` are passed through as query parameters
    /// (`page`, `is_read`, ...).
    pub async fn list(&self, params: &[(&str, &str)]) -> Result<NotificationPage, ApiError> {
        self.client.get_with_query(NOTIFICATIONS_PATH, params).await
    }

    pub async fn unread_count(&self) -> Result<u64, ApiError> {
        let count: UnreadCount = self.client.get(NOTIFICATIONS_UNREAD_COUNT_PATH).await?;
        Ok(count.unread_count)
    }

    pub async fn mark_read(&self, id: &EntityId) -> Result<Value, ApiError> {
        let path = format!("{NOTIFICATIONS_PATH}{id}/mark_as_read/");
        self.client.request(RequestSpec::post(path)).await
    }

    pub async fn mark_all_read(&self) -> Result<Value, ApiError> {
        self.client.request(RequestSpec::post(NOTIFICATIONS_MARK_ALL_READ_PATH)).await
    }
}
