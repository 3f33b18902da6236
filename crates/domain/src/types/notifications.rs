//! Notification payloads (REST and realtime)

use serde::{Deserialize, Serialize};

use super::EntityId;

/// A notification as listed by `/api/notifications/`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    #[serde(default)]
    pub id: Option<EntityId>,
    #[serde(default)]
    pub verb: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub is_read: bool,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// The list endpoint answers either a bare array or a paginated envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NotificationPage {
    Paginated {
        results: Vec<Notification>,
        #[serde(default)]
        count: Option<u64>,
        #[serde(default)]
        next: Option<String>,
        #[serde(default)]
        previous: Option<String>,
    },
    List(Vec<Notification>),
}

impl NotificationPage {
    pub fn items(&self) -> &[Notification] {
        match self {
            Self::Paginated { results, .. } => results,
            Self::List(items) => items,
        }
    }

    /// Total count reported by the server, or the page length when absent.
    pub fn total(&self) -> u64 {
        match self {
            Self::Paginated { count: Some(count), .. } => *count,
            other => other.items().len() as u64,
        }
    }
}

/// `{ "unread_count": n }`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnreadCount {
    #[serde(default)]
    pub unread_count: u64,
}

/// Envelope pushed on the notifications socket: an optional `type` plus an
/// arbitrary payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationEvent {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(flatten)]
    pub payload: serde_json::Map<String, serde_json::Value>,
}

impl NotificationEvent {
    /// Parses a text frame. Anything that is not a JSON object yields `None`.
    pub fn parse(text: &str) -> Option<Self> {
        serde_json::from_str(text).ok()
    }
}
