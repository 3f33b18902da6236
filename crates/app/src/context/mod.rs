//! Session context - dependency injection container
//!
//! One [`SessionContext`] owns everything a signed-in session needs: the
//! token store, the event bus, the API client with its services and the
//! notification socket. A background watcher keeps the socket in step with
//! the session: it reconnects after login or refresh and closes on logout.

use std::sync::Arc;

use parking_lot::Mutex;
use tidylinker_common::{
    CredentialStore, ExponentialBackoff, SessionEvent, SessionSignals, TokenStore,
};
use tidylinker_domain::{Config, EntityId, Result};
use tidylinker_infra::realtime::ws_base;
use tidylinker_infra::{
    credential_store_from_config, ApiClient, ApiClientConfig, AuthService, ChatHandler,
    ChatSocket, ChatsService, InfraError, MessagesService, NotificationSocketManager,
    NotificationsService, PreferencesService,
};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Session context - holds all services of one session
pub struct SessionContext {
    pub config: Config,
    /// Correlates log lines of this session.
    pub session_id: Uuid,
    pub tokens: Arc<TokenStore>,
    pub signals: Arc<SessionSignals>,
    pub api: Arc<ApiClient>,

    // Endpoint services
    pub auth: AuthService,
    pub chats: ChatsService,
    pub notifications: NotificationsService,
    pub messages: MessagesService,
    pub preferences: PreferencesService,

    // Realtime
    pub notification_socket: NotificationSocketManager,
    ws_base: String,
    backoff: ExponentialBackoff,

    shutdown: CancellationToken,
    watcher: Mutex<Option<JoinHandle<()>>>,
}

impl SessionContext {
    /// Create a session context using the credential store named in `config`.
    ///
    /// # Errors
    /// Fails when stored credentials cannot be read or the HTTP client cannot
    /// be built.
    pub async fn new(config: Config) -> Result<Self> {
        let store = credential_store_from_config(&config.storage);
        Self::with_store(config, store).await
    }

    /// Create a session context over an explicit credential store.
    ///
    /// Tests use this to run against memory or temporary file stores. Must
    /// be called inside a tokio runtime.
    pub async fn with_store(config: Config, store: Arc<dyn CredentialStore>) -> Result<Self> {
        let session_id = Uuid::new_v4();

        let tokens = Arc::new(TokenStore::load(store).await.map_err(|e| {
            warn!(%session_id, error = %e, "failed to read stored credentials");
            InfraError::from(e)
        })?);
        let signals = Arc::new(SessionSignals::new());

        let api = Arc::new(
            ApiClient::new(ApiClientConfig::from(&config), tokens.clone(), signals.clone())
                .map_err(InfraError::from)?,
        );

        let ws_base = ws_base(&config);
        let backoff = ExponentialBackoff::from_millis(
            config.realtime.reconnect_base_ms,
            config.realtime.reconnect_max_ms,
        );
        let notification_socket =
            NotificationSocketManager::new(tokens.clone(), ws_base.clone(), backoff);

        let shutdown = CancellationToken::new();
        let watcher =
            spawn_session_watcher(&signals, notification_socket.clone(), shutdown.clone());

        info!(
            %session_id,
            base_url = %api.base_url(),
            ws_base = %ws_base,
            authenticated = tokens.is_authenticated(),
            "session context ready"
        );

        Ok(Self {
            config,
            session_id,
            auth: AuthService::new(api.clone()),
            chats: ChatsService::new(api.clone()),
            notifications: NotificationsService::new(api.clone()),
            messages: MessagesService::new(api.clone()),
            preferences: PreferencesService::new(api.clone()),
            tokens,
            signals,
            api,
            notification_socket,
            ws_base,
            backoff,
            shutdown,
            watcher: Mutex::new(Some(watcher)),
        })
    }

    /// WebSocket origin used by this session's sockets.
    pub fn ws_base(&self) -> &str {
        &self.ws_base
    }

    /// Open a socket for `chat`, sharing this session's credential and
    /// reconnect policy.
    pub fn open_chat(&self, chat: EntityId, handler: Arc<dyn ChatHandler>) -> ChatSocket {
        ChatSocket::open(chat, handler, self.tokens.clone(), self.ws_base.clone(), self.backoff)
    }

    /// Stop the session watcher and close the notification socket.
    ///
    /// Safe to call more than once. Stored credentials are kept.
    pub async fn shutdown(&self) -> Result<()> {
        info!(session_id = %self.session_id, "shutdown called on SessionContext");

        self.shutdown.cancel();
        self.notification_socket.close();

        let watcher = self.watcher.lock().take();
        if let Some(watcher) = watcher {
            if let Err(err) = watcher.await {
                warn!(error = %err, "session watcher ended abnormally");
            }
        }

        Ok(())
    }
}

impl Drop for SessionContext {
    fn drop(&mut self) {
        self.shutdown.cancel();
        self.notification_socket.close();
    }
}

/// Keep the notification socket in step with session transitions.
///
/// Subscribes before spawning so no event emitted after construction is
/// missed.
fn spawn_session_watcher(
    signals: &SessionSignals,
    socket: NotificationSocketManager,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    let mut events = signals.subscribe();

    tokio::spawn(async move {
        loop {
            let event = tokio::select! {
                _ = shutdown.cancelled() => break,
                event = events.recv() => event,
            };

            match event {
                Ok(SessionEvent::LoggedIn | SessionEvent::CredentialRefreshed) => {
                    debug!("credential changed; reconnecting notification socket");
                    socket.reconnect();
                }
                Ok(SessionEvent::LoggedOut | SessionEvent::ForcedLogout(_)) => {
                    debug!("session ended; closing notification socket");
                    socket.close();
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "session watcher lagged behind events");
                }
                Err(RecvError::Closed) => break,
            }
        }
        debug!("session watcher stopped");
    })
}
