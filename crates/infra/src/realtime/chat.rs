//! Per-chat socket
//!
//! Unlike the notification socket there is one connection per open chat.
//! It uses the same reconnect policy and stays up until closed or dropped.

use std::sync::Arc;

use serde_json::{json, Value};
use tidylinker_common::{ExponentialBackoff, TokenStore};
use tidylinker_domain::{ChatEvent, ChatMessage, EntityId, OutgoingChatFrame};
use tracing::{debug, warn};

use super::socket::{ReconnectingSocket, SocketDelegate};
use super::url::chat_path;

/// Callbacks for one chat connection. Only `on_message` is required.
pub trait ChatHandler: Send + Sync {
    fn on_message(&self, message: ChatMessage);

    fn on_typing(&self, _frame: &Value) {}

    fn on_status(&self, _frame: &Value) {}

    /// The other side has read everything up to `last_read_message_id`.
    fn on_read(&self, _last_read_message_id: &EntityId) {}

    fn on_error(&self, _error: &Value) {}

    fn on_connected(&self) {}
}

struct ChatChannel {
    chat: EntityId,
    handler: Arc<dyn ChatHandler>,
}

impl SocketDelegate for ChatChannel {
    fn label(&self) -> &'static str {
        "chat"
    }

    fn path(&self, token: &str) -> String {
        chat_path(&self.chat, token)
    }

    fn on_open(&self) {
        self.handler.on_connected();
    }

    fn on_text(&self, text: &str) {
        let Ok(frame) = serde_json::from_str::<Value>(text) else {
            debug!(chat = %self.chat, "dropping unparseable chat frame");
            return;
        };

        match ChatEvent::classify(&self.chat, &frame) {
            Some(ChatEvent::Message(message)) => self.handler.on_message(message),
            Some(ChatEvent::Typing(frame)) => self.handler.on_typing(&frame),
            Some(ChatEvent::Status(frame)) => self.handler.on_status(&frame),
            Some(ChatEvent::Read { last_read_message_id }) => {
                self.handler.on_read(&last_read_message_id)
            }
            Some(ChatEvent::Error(frame)) => self.handler.on_error(&frame),
            None => debug!(chat = %self.chat, "chat frame skipped"),
        }
    }

    fn on_missing_token(&self) {
        self.handler.on_error(&json!({ "message": "Authentication token not found" }));
    }

    fn on_disconnect(&self, error: Option<&str>) {
        if let Some(error) = error {
            self.handler.on_error(&json!({ "message": error }));
        }
    }
}

/// Live connection to one chat room.
pub struct ChatSocket {
    socket: ReconnectingSocket<ChatChannel>,
}

impl ChatSocket {
    /// Connect to `chat` right away.
    ///
    /// Without a stored token no connection is made and the handler's
    /// `on_error` is told so. Must be called inside a tokio runtime.
    pub fn open(
        chat: EntityId,
        handler: Arc<dyn ChatHandler>,
        tokens: Arc<TokenStore>,
        ws_base: impl Into<String>,
        backoff: ExponentialBackoff,
    ) -> Self {
        let socket = ReconnectingSocket::new(ChatChannel { chat, handler }, tokens, ws_base, backoff);
        socket.connect();
        Self { socket }
    }

    pub fn chat(&self) -> &EntityId {
        &self.socket.delegate().chat
    }

    /// Send a chat message. Blank content is rejected.
    pub fn send_message(&self, content: &str) -> bool {
        let message = content.trim();
        if message.is_empty() {
            return false;
        }
        self.send(&OutgoingChatFrame::Message { message: message.to_string() })
    }

    pub fn send_typing(&self, is_typing: bool) -> bool {
        self.send(&OutgoingChatFrame::Typing { is_typing })
    }

    pub fn send_read(&self, last_read_message_id: Option<EntityId>) -> bool {
        self.send(&OutgoingChatFrame::Read { last_read_message_id })
    }

    fn send(&self, frame: &OutgoingChatFrame) -> bool {
        match serde_json::to_string(frame) {
            Ok(text) => self.socket.send_text(text),
            Err(err) => {
                warn!(error = %err, "chat frame could not be encoded");
                false
            }
        }
    }

    /// Reopen with the current token.
    pub fn reconnect(&self) {
        self.socket.reconnect();
    }

    pub fn is_connected(&self) -> bool {
        self.socket.is_connected()
    }

    pub fn retry_count(&self) -> u32 {
        self.socket.retry_count()
    }

    pub fn close(&self) {
        self.socket.close();
    }
}
