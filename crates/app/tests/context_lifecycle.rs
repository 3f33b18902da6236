//! Integration tests for SessionContext lifecycle
//!
//! Tests verify that a SessionContext can be created, follows session
//! transitions with its notification socket, and shuts down gracefully.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use serde_json::json;
use tidylinker_common::testing::poll_until;
use tidylinker_common::{CredentialStore, MemoryCredentialStore};
use tidylinker_domain::constants::{ACCESS_TOKEN_KEY, LOGIN_PATH, LOGOUT_PATH, REFRESH_PATH};
use tidylinker_domain::{
    ApiConfig, Config, NotificationEvent, RealtimeConfig, StorageBackend, StorageConfig,
};
use tidylinker_infra::{ConnectionState, NotificationListener};
use tidylinker_lib::SessionContext;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{accept_hdr_async, WebSocketStream};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

type Accepted = mpsc::UnboundedReceiver<(String, WebSocketStream<TcpStream>)>;

/// Start a WebSocket server that reports each accepted connection's path.
async fn start_ws_server() -> (String, Accepted) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("ws://{}", listener.local_addr().unwrap());
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let tx = tx.clone();
            tokio::spawn(async move {
                let mut path = String::new();
                let callback =
                    |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
                        path = req.uri().to_string();
                        Ok(resp)
                    };
                if let Ok(ws) = accept_hdr_async(stream, callback).await {
                    let _ = tx.send((path, ws));
                }
            });
        }
    });

    (base, rx)
}

fn test_config(api_base: &str, ws_base: Option<&str>) -> Config {
    Config {
        api: ApiConfig { base_url: api_base.to_string(), ..Default::default() },
        realtime: RealtimeConfig {
            ws_base_url: ws_base.map(String::from),
            reconnect_base_ms: 20,
            reconnect_max_ms: 100,
        },
        storage: StorageConfig { backend: StorageBackend::Memory, ..Default::default() },
        ..Default::default()
    }
}

fn quiet_listener() -> Arc<dyn NotificationListener> {
    Arc::new(|_: &NotificationEvent| {})
}

async fn wait_for(mut condition: impl FnMut() -> bool) -> bool {
    poll_until(Duration::from_secs(3), Duration::from_millis(10), || {
        let ready = condition();
        async move { ready }
    })
    .await
}

/// Test that SessionContext::new succeeds with an empty memory store
///
/// This test verifies:
/// - The context can be created without errors
/// - No credential is present and the socket is idle
/// - The WebSocket origin is derived from the API base URL
#[tokio::test(flavor = "multi_thread")]
async fn test_context_creation_succeeds() {
    let config = test_config("https://api.example.com/", None);

    let context = SessionContext::new(config).await.expect("context should build");

    assert!(!context.tokens.is_authenticated());
    assert_eq!(context.ws_base(), "wss://api.example.com");
    assert_eq!(context.api.base_url(), "https://api.example.com");
    assert_eq!(context.notification_socket.state(), ConnectionState::Disconnected);

    context.shutdown().await.expect("shutdown should succeed");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_context_resumes_stored_session() {
    let store = Arc::new(MemoryCredentialStore::new());
    store.save(ACCESS_TOKEN_KEY, "persisted").await.unwrap();

    let context = SessionContext::with_store(test_config("http://localhost:8000", None), store)
        .await
        .unwrap();

    assert_eq!(context.tokens.access_token().as_deref(), Some("persisted"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_context_uses_file_backend_from_config() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config("http://localhost:8000", None);
    config.storage = StorageConfig {
        backend: StorageBackend::File,
        path: dir.path().join("session.json"),
        ..Default::default()
    };

    let context = SessionContext::new(config.clone()).await.unwrap();
    context.tokens.set_access_token("on-disk").await.unwrap();
    context.shutdown().await.unwrap();
    drop(context);

    let resumed = SessionContext::new(config).await.unwrap();
    assert_eq!(resumed.tokens.access_token().as_deref(), Some("on-disk"));
}

/// Test that shutdown() is idempotent and bounded
///
/// This test verifies:
/// - shutdown() can be called multiple times on the same context
/// - Each call completes within a reasonable time
#[tokio::test(flavor = "multi_thread")]
async fn test_shutdown_is_idempotent() {
    let context = SessionContext::new(test_config("http://localhost:8000", None)).await.unwrap();

    for i in 1..=3 {
        let result = tokio::time::timeout(Duration::from_secs(5), context.shutdown()).await;
        assert!(result.is_ok(), "shutdown() call #{} should not hang", i);
        assert!(result.unwrap().is_ok(), "shutdown() call #{} should succeed", i);
    }
}

/// Test that the notification socket follows login and logout
///
/// This test verifies:
/// - Without a credential a registered listener opens nothing
/// - Logging in connects with the new token
/// - Logging out closes the connection normally
#[tokio::test(flavor = "multi_thread")]
async fn test_socket_follows_login_and_logout() {
    let api = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(LOGIN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "access": "fresh" })))
        .mount(&api)
        .await;
    Mock::given(method("POST"))
        .and(path(LOGOUT_PATH))
        .respond_with(ResponseTemplate::new(205))
        .mount(&api)
        .await;
    let (ws_base, mut accepted) = start_ws_server().await;

    let context = SessionContext::new(test_config(&api.uri(), Some(&ws_base))).await.unwrap();
    let _subscription = context.notification_socket.add_listener(quiet_listener());
    assert!(tokio::time::timeout(Duration::from_millis(200), accepted.recv()).await.is_err());

    context.auth.login("a@b.co", "pw").await.unwrap();

    let (path, mut ws) = tokio::time::timeout(Duration::from_secs(3), accepted.recv())
        .await
        .expect("socket should connect after login")
        .unwrap();
    assert_eq!(path, "/ws/notifications/?token=fresh");
    assert!(wait_for(|| context.notification_socket.is_connected()).await);

    context.auth.logout().await.unwrap();

    let closed = tokio::time::timeout(Duration::from_secs(3), async {
        loop {
            match ws.next().await {
                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                Some(Ok(_)) => continue,
            }
        }
    })
    .await;
    assert!(closed.is_ok(), "logout should close the socket");
    assert!(
        wait_for(|| context.notification_socket.state() == ConnectionState::Disconnected).await
    );

    context.shutdown().await.unwrap();
}

/// Test that a forced logout tears the socket down for good
///
/// This test verifies:
/// - A failed refresh ends the session
/// - The notification socket is closed and not reopened
#[tokio::test(flavor = "multi_thread")]
async fn test_forced_logout_closes_socket() {
    let api = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/data"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&api)
        .await;
    Mock::given(method("POST"))
        .and(path(REFRESH_PATH))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&api)
        .await;
    let (ws_base, mut accepted) = start_ws_server().await;

    let store = Arc::new(MemoryCredentialStore::new());
    store.save(ACCESS_TOKEN_KEY, "stale").await.unwrap();
    let context =
        SessionContext::with_store(test_config(&api.uri(), Some(&ws_base)), store).await.unwrap();
    let _subscription = context.notification_socket.add_listener(quiet_listener());
    let (_, _ws) = tokio::time::timeout(Duration::from_secs(3), accepted.recv())
        .await
        .expect("stored session should connect")
        .unwrap();

    let err = context.api.get::<serde_json::Value>("/api/data").await.unwrap_err();
    assert!(matches!(err, tidylinker_infra::ApiError::RefreshFailed(_)));

    assert!(
        wait_for(|| context.notification_socket.state() == ConnectionState::Disconnected).await
    );
    assert!(tokio::time::timeout(Duration::from_millis(300), accepted.recv()).await.is_err());
    assert!(context.signals.last_forced_logout().is_some());
}

/// Test that dropping the context without shutdown() does not hang
#[tokio::test(flavor = "multi_thread")]
async fn test_cleanup_via_drop_without_shutdown() {
    {
        let _context =
            SessionContext::new(test_config("http://localhost:8000", None)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    tokio::time::sleep(Duration::from_millis(50)).await;
}
