//! Wire types exchanged with the TidyLinker backend
//!
//! Shapes follow the backend's JSON. Optional or loosely typed fields stay
//! optional here; unknown fields are kept in `extra` maps where callers may
//! need them.

pub mod auth;
pub mod chat;
pub mod notifications;
pub mod preferences;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use auth::{
    AccessTokenResponse, ActivationResponse, CurrentUser, LoginRequest, PasswordChangeRequest,
    PasswordResetConfirmRequest, PasswordResetRequest, RegistrationRequest, UserCredentials,
};
pub use chat::{
    ChatEvent, ChatMessage, CreateChatRequest, FlagChatRequest, OutgoingChatFrame,
    ResolveFlagRequest, SendMessageRequest,
};
pub use notifications::{Notification, NotificationEvent, NotificationPage, UnreadCount};
pub use preferences::NotificationPreferences;

/// Identifier as emitted by the backend: usually an integer primary key,
/// occasionally a string (UUIDs, legacy ids).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityId {
    Int(i64),
    Text(String),
}

impl EntityId {
    /// Reads an id from a JSON value, rejecting null, empty strings and zero.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Number(n) => n.as_i64().filter(|v| *v != 0).map(Self::Int),
            serde_json::Value::String(s) if !s.is_empty() => Some(Self::Text(s.clone())),
            _ => None,
        }
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Text(v) => f.write_str(v),
        }
    }
}

impl From<i64> for EntityId {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<&str> for EntityId {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn entity_id_accepts_numbers_and_strings() {
        assert_eq!(EntityId::from_json(&json!(42)), Some(EntityId::Int(42)));
        assert_eq!(EntityId::from_json(&json!("a1")), Some(EntityId::Text("a1".into())));
        assert_eq!(EntityId::from_json(&json!(0)), None);
        assert_eq!(EntityId::from_json(&json!("")), None);
        assert_eq!(EntityId::from_json(&json!(null)), None);
    }

    #[test]
    fn entity_id_displays_raw_value() {
        assert_eq!(EntityId::Int(7).to_string(), "7");
        assert_eq!(EntityId::from("abc").to_string(), "abc");
    }
}
