//! Chat payloads and realtime chat frames
//!
//! The chat socket emits several shapes for the same logical message. This
//! module turns them into a single [`ChatMessage`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::EntityId;

/// Normalized chat message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: EntityId,
    pub chat: EntityId,
    pub content: String,
    pub sender_id: Option<EntityId>,
    pub sender_role: Option<String>,
    /// `"e"` for employer, `"c"` for cleaner, otherwise whatever the backend sent.
    pub sender: Option<String>,
    pub sent_at: Option<String>,
    pub is_read: bool,
    pub sender_name: Option<String>,
}

impl ChatMessage {
    /// Builds a message from an inbound frame.
    ///
    /// Reads from the nested `message` object when there is one. Returns
    /// `None` for frames without an id or with blank content.
    pub fn from_frame(chat: &EntityId, frame: &Value) -> Option<Self> {
        let msg = match frame.get("message") {
            Some(nested @ Value::Object(_)) => nested,
            _ => frame,
        };
        if !msg.is_object() {
            return None;
        }

        let id = first_id(msg, &["id", "pk", "message_id"])?;
        let content = first_str(msg, &["content", "message", "text"])
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())?;

        let sender_id = first_id(msg, &["sender_id", "sender_user_id"])
            .or_else(|| msg.pointer("/sender/id").and_then(EntityId::from_json))
            .or_else(|| msg.pointer("/sender/user/id").and_then(EntityId::from_json));
        let sender_role = first_str(msg, &["sender_role", "senderRole", "role"]).map(String::from);
        let sender = match sender_role.as_deref() {
            Some("employer") => Some("e".to_string()),
            Some("cleaner") => Some("c".to_string()),
            _ => msg.get("sender").and_then(Value::as_str).map(String::from),
        };
        let sender_name = first_str(msg, &["sender_name", "senderName"])
            .or_else(|| msg.pointer("/sender/name").and_then(Value::as_str))
            .map(String::from);

        Some(Self {
            id,
            chat: chat.clone(),
            content,
            sender_id,
            sender_role,
            sender,
            sent_at: first_str(msg, &["sent_at", "created_at", "timestamp", "time"])
                .map(String::from),
            is_read: msg.get("is_read").and_then(Value::as_bool).unwrap_or(false),
            sender_name,
        })
    }
}

/// Inbound chat socket event after classification
#[derive(Debug, Clone, PartialEq)]
pub enum ChatEvent {
    Message(ChatMessage),
    Typing(Value),
    Status(Value),
    Read { last_read_message_id: EntityId },
    Error(Value),
}

impl ChatEvent {
    /// Classifies a decoded frame by its `type` field.
    ///
    /// Handshake and keepalive frames, unknown types, read receipts without
    /// an id and unusable messages all yield `None`.
    pub fn classify(chat: &EntityId, frame: &Value) -> Option<Self> {
        let kind = frame.get("type").and_then(Value::as_str).unwrap_or("").to_ascii_lowercase();

        match kind.as_str() {
            "connected" | "connection" | "ping" | "pong" => None,
            "error" => Some(Self::Error(frame.clone())),
            "typing" => Some(Self::Typing(frame.clone())),
            "status" => Some(Self::Status(frame.clone())),
            "read" => first_id(frame, &["last_read_message_id", "last_read_id", "message_id", "id"])
                .map(|last_read_message_id| Self::Read { last_read_message_id }),
            "" | "message" | "chat_message" | "new_message" => {
                ChatMessage::from_frame(chat, frame).map(Self::Message)
            }
            _ => None,
        }
    }
}

/// Frames the client sends on the chat socket
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutgoingChatFrame {
    Message { message: String },
    Typing { is_typing: bool },
    Read { last_read_message_id: Option<EntityId> },
}

/// Body for `POST /api/messages/`
#[derive(Debug, Clone, Serialize)]
pub struct SendMessageRequest {
    pub chat: EntityId,
    pub content: String,
}

/// Body for `POST /api/chats/`
#[derive(Debug, Clone, Serialize)]
pub struct CreateChatRequest {
    pub employer: EntityId,
    pub cleaner: EntityId,
}

/// Body for `POST /api/flagged-chats/`
#[derive(Debug, Clone, Serialize)]
pub struct FlagChatRequest {
    pub chat: EntityId,
    pub reason: String,
}

/// Body for `PATCH /api/flagged-chats/{id}/`
#[derive(Debug, Clone, Serialize)]
pub struct ResolveFlagRequest {
    pub resolved: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution_notes: Option<String>,
}

fn first_id(value: &Value, keys: &[&str]) -> Option<EntityId> {
    keys.iter().find_map(|key| value.get(*key).and_then(EntityId::from_json))
}

fn first_str<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a str> {
    keys.iter().find_map(|key| value.get(*key).and_then(Value::as_str))
}
