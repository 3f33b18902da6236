//! One WebSocket connection driven by a background task
//!
//! The task reports what happens through a callback and never reconnects on
//! its own; reconnect policy lives in [`super::socket`].

use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use tidylinker_domain::constants::WS_CLOSE_REASON;
use tidylinker_domain::TidyLinkerError;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::errors::InfraError;

/// Lifecycle of a single connection attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ConnectionEvent {
    Opened,
    Message(String),
    /// The connection ended or never opened. Not reported after a
    /// client-initiated close.
    Closed { error: Option<String> },
}

pub(crate) type EventSink = Arc<dyn Fn(ConnectionEvent) + Send + Sync>;

/// Owner side of a running connection task.
///
/// Dropping the handle closes the socket with a normal close frame.
pub(crate) struct ConnectionHandle {
    outbound: mpsc::UnboundedSender<Message>,
    cancel: CancellationToken,
    _task: JoinHandle<()>,
}

impl ConnectionHandle {
    pub(crate) fn spawn(url: String, on_event: EventSink) -> Self {
        let (outbound, rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let task = tokio::spawn(drive(url, rx, cancel.clone(), on_event));
        Self { outbound, cancel, _task: task }
    }

    /// Queue a text frame. Returns `false` once the task has stopped.
    pub(crate) fn send_text(&self, text: String) -> bool {
        self.outbound.send(Message::Text(text)).is_ok()
    }
}

impl Drop for ConnectionHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn drive(
    url: String,
    mut outbound: mpsc::UnboundedReceiver<Message>,
    cancel: CancellationToken,
    on_event: EventSink,
) {
    let connected = tokio::select! {
        _ = cancel.cancelled() => return,
        result = connect_async(url.as_str()) => result,
    };

    let stream = match connected {
        Ok((stream, _response)) => stream,
        Err(err) => {
            let err = TidyLinkerError::from(InfraError::from(err));
            debug!(error = %err, "websocket connect failed");
            on_event(ConnectionEvent::Closed { error: Some(err.to_string()) });
            return;
        }
    };

    on_event(ConnectionEvent::Opened);
    let (mut write, mut read) = stream.split();

    let error = loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                let frame = CloseFrame { code: CloseCode::Normal, reason: WS_CLOSE_REASON.into() };
                if let Err(err) = write.send(Message::Close(Some(frame))).await {
                    debug!(error = %err, "close frame not delivered");
                }
                return;
            }
            Some(message) = outbound.recv() => {
                if let Err(err) = write.send(message).await {
                    break Some(err.to_string());
                }
            }
            incoming = read.next() => match incoming {
                Some(Ok(Message::Text(text))) => on_event(ConnectionEvent::Message(text)),
                Some(Ok(Message::Close(frame))) => {
                    debug!(?frame, "server closed websocket");
                    break None;
                }
                // Pings are answered by tungstenite itself.
                Some(Ok(_)) => {}
                Some(Err(err)) => {
                    warn!(error = %err, "websocket read failed");
                    break Some(err.to_string());
                }
                None => break None,
            },
        }
    };

    on_event(ConnectionEvent::Closed { error });
}
