//! Chat and moderation endpoints

use std::sync::Arc;

use serde_json::{json, Value};
use tidylinker_domain::constants::{CHATS_PATH, FLAGGED_CHATS_PATH};
use tidylinker_domain::{CreateChatRequest, EntityId, FlagChatRequest, ResolveFlagRequest};

use super::client::ApiClient;
use super::errors::ApiError;

#[derive(Clone)]
pub struct ChatsService {
    client: Arc<ApiClient>,
}

impl ChatsService {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }

    /// Chats of the signed-in user, e.g. `[("include_archived", "1")]`.
    pub async fn list(&self, params: &[(&str, &str)]) -> Result<Value, ApiError> {
        self.client.get_with_query(CHATS_PATH, params).await
    }

    pub async fn create(&self, employer: EntityId, cleaner: EntityId) -> Result<Value, ApiError> {
        self.client.post(CHATS_PATH, &CreateChatRequest { employer, cleaner }).await
    }

    pub async fn archive(&self, chat: &EntityId, reason: &str) -> Result<Value, ApiError> {
        let path = format!("{CHATS_PATH}{chat}/archive/");
        self.client.post(&path, &json!({ "reason": reason })).await
    }

    /// Report a chat to moderators.
    pub async fn flag(&self, chat: EntityId, reason: &str) -> Result<Value, ApiError> {
        let body = FlagChatRequest { chat, reason: reason.to_string() };
        self.client.post(FLAGGED_CHATS_PATH, &body).await
    }

    pub async fn list_flagged(&self, params: &[(&str, &str)]) -> Result<Value, ApiError> {
        self.client.get_with_query(FLAGGED_CHATS_PATH, params).await
    }

    pub async fn resolve_flag(
        &self,
        flag: &EntityId,
        resolved: bool,
        notes: Option<&str>,
    ) -> Result<Value, ApiError> {
        let path = format!("{FLAGGED_CHATS_PATH}{flag}/");
        let body = ResolveFlagRequest { resolved, resolution_notes: notes.map(String::from) };
        self.client.patch(&path, &body).await
    }
}
