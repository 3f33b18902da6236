//! Chat message endpoints

use std::sync::Arc;

use serde_json::Value;
use tidylinker_domain::constants::{MESSAGES_PATH, MESSAGES_UNREAD_COUNT_PATH};
use tidylinker_domain::{EntityId, SendMessageRequest, UnreadCount};

use super::client::ApiClient;
use super::errors::ApiError;
use super::request::RequestSpec;

#[derive(Clone)]
pub struct MessagesService {
    client: Arc<ApiClient>,
}

impl MessagesService {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }

    /// Messages of one chat. The backend decides the page shape, so the raw
    /// JSON is returned; realtime frames go through `ChatMessage` instead.
    pub async fn list_chat_messages(
        &self,
        chat: &EntityId,
        params: &[(&str, &str)],
    ) -> Result<Value, ApiError> {
        let path = format!("{MESSAGES_PATH}chat/{chat}/messages");
        self.client.get_with_query(&path, params).await
    }

    pub async fn send(&self, chat: &EntityId, content: &str) -> Result<Value, ApiError> {
        let body = SendMessageRequest { chat: chat.clone(), content: content.to_string() };
        self.client.post(MESSAGES_PATH, &body).await
    }

    /// Unread count across all chats. Unknown shapes count as zero.
    pub async fn unread_count(&self) -> Result<u64, ApiError> {
        let value: Value = self.client.get(MESSAGES_UNREAD_COUNT_PATH).await?;
        if value.get("unread_count").is_some() {
            let count: UnreadCount = serde_json::from_value(value)
                .map_err(|e| ApiError::Decode(format!("Failed to parse unread count: {e}")))?;
            return Ok(count.unread_count);
        }
        Ok(value.get("count").and_then(Value::as_u64).unwrap_or_default())
    }

    pub async fn mark_read(&self, message: &EntityId) -> Result<Value, ApiError> {
        let path = format!("{MESSAGES_PATH}{message}/mark-as-read/");
        self.client.request(RequestSpec::post(path)).await
    }

    pub async fn mark_all_read(&self, chat: &EntityId) -> Result<Value, ApiError> {
        let path = format!("{MESSAGES_PATH}chat/{chat}/mark-all-read/");
        self.client.request(RequestSpec::post(path)).await
    }
}
