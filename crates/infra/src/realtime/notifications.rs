//! Shared notification socket
//!
//! One connection serves every listener of the session. The connection is
//! opened when the first listener registers and closed when the last one
//! leaves; in between it reconnects with capped exponential backoff.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::Mutex;
use tidylinker_common::{ExponentialBackoff, TokenStore};
use tidylinker_domain::NotificationEvent;
use tracing::{debug, warn};

use super::socket::{ConnectionState, ReconnectingSocket, SocketDelegate, WeakSocket};
use super::url::notifications_path;

/// Receives every event pushed on the notification socket.
pub trait NotificationListener: Send + Sync {
    fn on_event(&self, event: &NotificationEvent);
}

impl<F> NotificationListener for F
where
    F: Fn(&NotificationEvent) + Send + Sync,
{
    fn on_event(&self, event: &NotificationEvent) {
        self(event)
    }
}

type Listener = Arc<dyn NotificationListener>;

fn same_listener(a: &Listener, b: &Listener) -> bool {
    std::ptr::eq(Arc::as_ptr(a) as *const (), Arc::as_ptr(b) as *const ())
}

#[derive(Default)]
struct NotificationHub {
    listeners: Mutex<Vec<Listener>>,
}

impl NotificationHub {
    fn snapshot(&self) -> Vec<Listener> {
        self.listeners.lock().clone()
    }
}

impl SocketDelegate for NotificationHub {
    fn label(&self) -> &'static str {
        "notifications"
    }

    fn path(&self, token: &str) -> String {
        notifications_path(token)
    }

    fn should_stay_connected(&self) -> bool {
        !self.listeners.lock().is_empty()
    }

    fn on_text(&self, text: &str) {
        let Some(event) = NotificationEvent::parse(text) else {
            debug!(len = text.len(), "dropping unparseable notification frame");
            return;
        };

        for listener in self.snapshot() {
            let delivered = catch_unwind(AssertUnwindSafe(|| listener.on_event(&event)));
            if delivered.is_err() {
                warn!(kind = ?event.kind, "notification listener panicked");
            }
        }
    }
}

/// Registration handle returned by [`NotificationSocketManager::add_listener`].
///
/// Dropping it does not unsubscribe; call [`Subscription::unsubscribe`].
pub struct Subscription {
    socket: WeakSocket<NotificationHub>,
    listener: Listener,
}

impl Subscription {
    pub fn unsubscribe(self) {
        if let Some(socket) = self.socket.upgrade() {
            NotificationSocketManager { socket }.remove_listener(&self.listener);
        }
    }
}

/// Owner of the single notification connection of a session.
#[derive(Clone)]
pub struct NotificationSocketManager {
    socket: ReconnectingSocket<NotificationHub>,
}

impl NotificationSocketManager {
    pub fn new(
        tokens: Arc<TokenStore>,
        ws_base: impl Into<String>,
        backoff: ExponentialBackoff,
    ) -> Self {
        Self {
            socket: ReconnectingSocket::new(NotificationHub::default(), tokens, ws_base, backoff),
        }
    }

    /// Register `listener`. The first listener opens the connection.
    ///
    /// Registering the same `Arc` twice keeps a single registration.
    pub fn add_listener(&self, listener: Arc<dyn NotificationListener>) -> Subscription {
        let first = {
            let mut listeners = self.socket.delegate().listeners.lock();
            if listeners.iter().any(|l| same_listener(l, &listener)) {
                debug!("listener already registered");
                false
            } else {
                listeners.push(listener.clone());
                debug!(total = listeners.len(), "notification listener added");
                listeners.len() == 1
            }
        };

        if first {
            self.socket.connect();
        }

        Subscription { socket: self.socket.downgrade(), listener }
    }

    /// Deregister `listener`. Removing the last one closes the connection.
    pub fn remove_listener(&self, listener: &Arc<dyn NotificationListener>) {
        let now_empty = {
            let mut listeners = self.socket.delegate().listeners.lock();
            let before = listeners.len();
            listeners.retain(|l| !same_listener(l, listener));
            if listeners.len() == before {
                return;
            }
            debug!(total = listeners.len(), "notification listener removed");
            listeners.is_empty()
        };

        if now_empty {
            self.release_connection();
        }
    }

    /// Close after the last listener left.
    ///
    /// A listener registering between the removal and the close saw the old
    /// attempt still running and did not connect, so reopen for it.
    fn release_connection(&self) {
        self.socket.close();
        if self.socket.delegate().should_stay_connected() {
            debug!("listener registered while closing, reopening");
            self.socket.connect();
        }
    }

    /// Open the connection if listeners exist and none is open or opening.
    pub fn connect(&self) {
        self.socket.connect();
    }

    pub fn close(&self) {
        self.socket.close();
    }

    /// Reopen with the current token. Used after login and refresh.
    pub fn reconnect(&self) {
        self.socket.reconnect();
    }

    pub fn state(&self) -> ConnectionState {
        self.socket.state()
    }

    pub fn is_connected(&self) -> bool {
        self.socket.is_connected()
    }

    pub fn retry_count(&self) -> u32 {
        self.socket.retry_count()
    }

    pub fn listener_count(&self) -> usize {
        self.socket.delegate().listeners.lock().len()
    }
}
