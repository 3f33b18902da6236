//! Reconnecting WebSocket core shared by the notification and chat sockets
//!
//! State transitions for one socket:
//!
//! ```text
//! Disconnected --connect()--> Connecting --open--> Connected
//!      ^                          |                    |
//!      +------- close / error ----+--------------------+
//!      |
//!      +-- backoff timer --> connect()   (unless closing or no longer wanted)
//! ```
//!
//! Every connection attempt gets a generation number. Callbacks from an
//! attempt that has since been replaced or closed are ignored.
//!
//! Lock order: socket state first, then whatever the delegate locks. The
//! socket never holds its own lock while calling `on_open`, `on_text`,
//! `on_missing_token` or `on_disconnect`.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tidylinker_common::{ExponentialBackoff, TokenStore};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::connection::{ConnectionEvent, ConnectionHandle, EventSink};
use super::url::build_ws_url;

/// Externally observable connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

/// What a concrete socket adds on top of the reconnect machinery.
pub(crate) trait SocketDelegate: Send + Sync + 'static {
    fn label(&self) -> &'static str;

    /// Path and query (including the token) to connect to.
    fn path(&self, token: &str) -> String;

    /// Whether a connection should exist right now. Checked before
    /// connecting and before scheduling a reconnect.
    fn should_stay_connected(&self) -> bool {
        true
    }

    fn on_open(&self) {}

    fn on_text(&self, text: &str);

    fn on_missing_token(&self) {}

    fn on_disconnect(&self, _error: Option<&str>) {}
}

#[derive(Default)]
struct SocketState {
    connection: ConnectionState,
    /// Set by `close()`; suppresses the reconnect after the close completes.
    closing: bool,
    generation: u64,
    retry_count: u32,
    handle: Option<ConnectionHandle>,
    reconnect_timer: Option<JoinHandle<()>>,
}

impl Drop for SocketState {
    fn drop(&mut self) {
        if let Some(timer) = self.reconnect_timer.take() {
            timer.abort();
        }
    }
}

struct Inner<D> {
    delegate: D,
    tokens: Arc<TokenStore>,
    ws_base: String,
    backoff: ExponentialBackoff,
    state: Mutex<SocketState>,
}

pub(crate) struct ReconnectingSocket<D> {
    inner: Arc<Inner<D>>,
}

impl<D> Clone for ReconnectingSocket<D> {
    fn clone(&self) -> Self {
        Self { inner: self.inner.clone() }
    }
}

pub(crate) struct WeakSocket<D> {
    inner: Weak<Inner<D>>,
}

impl<D> Clone for WeakSocket<D> {
    fn clone(&self) -> Self {
        Self { inner: self.inner.clone() }
    }
}

impl<D: SocketDelegate> WeakSocket<D> {
    pub(crate) fn upgrade(&self) -> Option<ReconnectingSocket<D>> {
        self.inner.upgrade().map(|inner| ReconnectingSocket { inner })
    }
}

impl<D: SocketDelegate> ReconnectingSocket<D> {
    pub(crate) fn new(
        delegate: D,
        tokens: Arc<TokenStore>,
        ws_base: impl Into<String>,
        backoff: ExponentialBackoff,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                delegate,
                tokens,
                ws_base: ws_base.into(),
                backoff,
                state: Mutex::new(SocketState::default()),
            }),
        }
    }

    pub(crate) fn downgrade(&self) -> WeakSocket<D> {
        WeakSocket { inner: Arc::downgrade(&self.inner) }
    }

    pub(crate) fn delegate(&self) -> &D {
        &self.inner.delegate
    }

    /// Open a connection unless one is open or opening.
    ///
    /// Must be called inside a tokio runtime.
    pub(crate) fn connect(&self) {
        connect(&self.inner);
    }

    /// Close the connection and cancel any pending reconnect.
    pub(crate) fn close(&self) {
        let handle = {
            let mut state = self.inner.state.lock();
            state.closing = true;
            if let Some(timer) = state.reconnect_timer.take() {
                timer.abort();
            }
            state.generation += 1;
            state.connection = ConnectionState::Disconnected;
            state.handle.take()
        };

        if handle.is_some() {
            info!(socket = self.inner.delegate.label(), "closing websocket");
        }
        // Dropping the handle sends the normal close frame.
        drop(handle);
    }

    /// Close and open again with the current token.
    pub(crate) fn reconnect(&self) {
        self.close();
        self.inner.state.lock().closing = false;
        if self.inner.delegate.should_stay_connected() {
            self.connect();
        }
    }

    /// Send a text frame. Returns `false` unless the socket is open.
    pub(crate) fn send_text(&self, text: String) -> bool {
        let state = self.inner.state.lock();
        match (&state.connection, &state.handle) {
            (ConnectionState::Connected, Some(handle)) => handle.send_text(text),
            _ => false,
        }
    }

    pub(crate) fn state(&self) -> ConnectionState {
        self.inner.state.lock().connection
    }

    pub(crate) fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    pub(crate) fn retry_count(&self) -> u32 {
        self.inner.state.lock().retry_count
    }
}

fn connect<D: SocketDelegate>(inner: &Arc<Inner<D>>) {
    let label = inner.delegate.label();
    if !inner.delegate.should_stay_connected() {
        debug!(socket = label, "nothing wants this socket, not connecting");
        return;
    }

    let mut state = inner.state.lock();
    if state.connection != ConnectionState::Disconnected {
        debug!(socket = label, state = ?state.connection, "already connecting or connected");
        return;
    }

    let Some(token) = inner.tokens.access_token() else {
        drop(state);
        warn!(socket = label, "no access token, skipping connection");
        inner.delegate.on_missing_token();
        return;
    };

    if let Some(timer) = state.reconnect_timer.take() {
        timer.abort();
    }
    state.closing = false;
    state.generation += 1;
    state.connection = ConnectionState::Connecting;

    let generation = state.generation;
    let url = build_ws_url(&inner.ws_base, &inner.delegate.path(&token));
    let weak = Arc::downgrade(inner);
    let sink: EventSink = Arc::new(move |event| {
        if let Some(inner) = weak.upgrade() {
            handle_event(&inner, generation, event);
        }
    });

    info!(socket = label, "connecting websocket");
    state.handle = Some(ConnectionHandle::spawn(url, sink));
}

fn handle_event<D: SocketDelegate>(inner: &Arc<Inner<D>>, generation: u64, event: ConnectionEvent) {
    let label = inner.delegate.label();

    match event {
        ConnectionEvent::Opened => {
            {
                let mut state = inner.state.lock();
                if state.generation != generation {
                    return;
                }
                state.connection = ConnectionState::Connected;
                state.retry_count = 0;
            }
            info!(socket = label, "websocket connected");
            inner.delegate.on_open();
        }
        ConnectionEvent::Message(text) => {
            if inner.state.lock().generation != generation {
                return;
            }
            inner.delegate.on_text(&text);
        }
        ConnectionEvent::Closed { error } => {
            let stale_handle = {
                let mut state = inner.state.lock();
                if state.generation != generation {
                    return;
                }
                state.connection = ConnectionState::Disconnected;
                let handle = state.handle.take();

                if !state.closing && inner.delegate.should_stay_connected() {
                    schedule_reconnect(inner, &mut state, generation);
                } else {
                    debug!(socket = label, "websocket closed, not reconnecting");
                }
                handle
            };
            drop(stale_handle);

            match error.as_deref() {
                Some(error) => warn!(socket = label, error, "websocket closed with error"),
                None => info!(socket = label, "websocket closed"),
            }
            inner.delegate.on_disconnect(error.as_deref());
        }
    }
}

fn schedule_reconnect<D: SocketDelegate>(
    inner: &Arc<Inner<D>>,
    state: &mut SocketState,
    generation: u64,
) {
    let delay = inner.backoff.calculate_delay(state.retry_count);
    state.retry_count = state.retry_count.saturating_add(1);
    info!(
        socket = inner.delegate.label(),
        delay_ms = delay.as_millis() as u64,
        attempt = state.retry_count,
        "scheduling websocket reconnect"
    );

    let weak = Arc::downgrade(inner);
    state.reconnect_timer = Some(tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        let Some(inner) = weak.upgrade() else {
            return;
        };
        {
            let mut state = inner.state.lock();
            if state.generation != generation || state.closing {
                return;
            }
            // This task is finishing; forget its handle so connect() leaves it alone.
            state.reconnect_timer.take();
        }
        connect(&inner);
    }));
}
