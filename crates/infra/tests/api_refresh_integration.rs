//! Refresh coordination against a mock backend.
//!
//! Covers the session guarantees of the API client:
//! - concurrent 401s share one refresh and are all replayed
//! - a failed refresh rejects every waiter and ends the session
//! - login, anonymous calls and the logout grace window never refresh
//! - a vanished profile ends the session

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use tidylinker_common::testing::next_session_event;
use tidylinker_common::{
    ForcedLogoutReason, MemoryCredentialStore, SessionEvent, SessionSignals, TokenStore,
};
use tidylinker_domain::constants::{CURRENT_USER_PATH, LOGIN_PATH, LOGOUT_PATH, REFRESH_PATH};
use tidylinker_infra::{ApiClient, ApiClientConfig, ApiError, AuthService, RequestSpec};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

struct Harness {
    server: MockServer,
    client: Arc<ApiClient>,
    auth: AuthService,
}

async fn harness(token: Option<&str>) -> Harness {
    let server = MockServer::start().await;
    let tokens = Arc::new(TokenStore::new(Arc::new(MemoryCredentialStore::new())));
    if let Some(token) = token {
        tokens.set_access_token(token).await.unwrap();
    }
    let config = ApiClientConfig { base_url: server.uri(), ..Default::default() };
    let client =
        Arc::new(ApiClient::new(config, tokens, Arc::new(SessionSignals::new())).unwrap());
    let auth = AuthService::new(client.clone());
    Harness { server, client, auth }
}

/// `GET /api/data` succeeds only with `Bearer <accepted>`; anything else is 401.
async fn mount_data_endpoint(server: &MockServer, accepted: &str) {
    Mock::given(method("GET"))
        .and(path("/api/data"))
        .and(header("authorization", format!("Bearer {accepted}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/data"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(json!({ "detail": "Given token not valid for any token type" })),
        )
        .mount(server)
        .await;
}

async fn requests_to(server: &MockServer, route: &str) -> Vec<Request> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|r| r.url.path() == route)
        .collect()
}

/// Validates single-flight refresh for concurrent callers.
///
/// Assertions:
/// - Confirms exactly one refresh call is made.
/// - Confirms every caller succeeds after replaying with the new token.
/// - Confirms the refresh is sent as `{}` without a bearer header.
#[tokio::test]
async fn concurrent_unauthorized_requests_share_one_refresh() {
    let h = harness(Some("old-token")).await;
    mount_data_endpoint(&h.server, "new-token").await;
    Mock::given(method("POST"))
        .and(path(REFRESH_PATH))
        .and(body_json(json!({})))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "access": "new-token" }))
                .set_delay(Duration::from_millis(200)),
        )
        .expect(1)
        .mount(&h.server)
        .await;

    let mut events = h.client.signals().subscribe();
    let (a, b, c) = tokio::join!(
        h.client.get::<Value>("/api/data"),
        h.client.get::<Value>("/api/data"),
        h.client.get::<Value>("/api/data"),
    );

    for result in [a, b, c] {
        assert_eq!(result.unwrap(), json!({ "ok": true }));
    }
    assert_eq!(h.client.tokens().access_token().as_deref(), Some("new-token"));

    let refreshes = requests_to(&h.server, REFRESH_PATH).await;
    assert_eq!(refreshes.len(), 1);
    assert!(!refreshes[0].headers.contains_key("authorization"));

    let refreshed = next_session_event(&mut events, Duration::from_secs(1), |e| {
        *e == SessionEvent::CredentialRefreshed
    })
    .await;
    assert!(refreshed.is_some());
}

/// Validates failure fan-out.
///
/// Assertions:
/// - Confirms every waiting caller receives `RefreshFailed`.
/// - Confirms the credential is cleared and the forced logout recorded.
#[tokio::test]
async fn refresh_failure_rejects_all_waiters_and_forces_logout() {
    let h = harness(Some("old-token")).await;
    mount_data_endpoint(&h.server, "never").await;
    Mock::given(method("POST"))
        .and(path(REFRESH_PATH))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(json!({ "detail": "Token is blacklisted" }))
                .set_delay(Duration::from_millis(150)),
        )
        .expect(1)
        .mount(&h.server)
        .await;

    let mut events = h.client.signals().subscribe();
    let (a, b, c) = tokio::join!(
        h.client.get::<Value>("/api/data"),
        h.client.get::<Value>("/api/data"),
        h.client.get::<Value>("/api/data"),
    );

    for result in [a, b, c] {
        match result {
            Err(ApiError::RefreshFailed(cause)) => assert_eq!(cause.status(), Some(401)),
            other => panic!("expected refresh failure, got {:?}", other),
        }
    }
    assert!(!h.client.tokens().is_authenticated());
    assert!(h.client.tokens().logged_out_at().is_some());
    assert_eq!(
        h.client.signals().last_forced_logout().map(|f| f.reason),
        Some(ForcedLogoutReason::RefreshFailed)
    );

    let forced = next_session_event(&mut events, Duration::from_secs(1), |e| {
        matches!(e, SessionEvent::ForcedLogout(_))
    })
    .await;
    assert_eq!(forced, Some(SessionEvent::ForcedLogout(ForcedLogoutReason::RefreshFailed)));
}

#[tokio::test]
async fn refresh_without_access_field_is_a_failure() {
    let h = harness(Some("old-token")).await;
    mount_data_endpoint(&h.server, "never").await;
    Mock::given(method("POST"))
        .and(path(REFRESH_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "detail": "ok" })))
        .expect(1)
        .mount(&h.server)
        .await;

    let err = h.client.get::<Value>("/api/data").await.unwrap_err();

    match err {
        ApiError::RefreshFailed(cause) => assert!(matches!(*cause, ApiError::Decode(_))),
        other => panic!("expected refresh failure, got {:?}", other),
    }
    assert!(!h.client.tokens().is_authenticated());
}

/// Validates anonymous requests.
///
/// Assertions:
/// - Confirms neither the bearer header nor stored cookies are sent.
/// - Confirms a 401 is returned without attempting a refresh.
#[tokio::test]
async fn skip_auth_requests_are_anonymous_and_never_refreshed() {
    let h = harness(None).await;
    Mock::given(method("POST"))
        .and(path(LOGIN_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("set-cookie", "refresh_token=r1; Path=/; HttpOnly")
                .set_body_json(json!({ "access": "tok" })),
        )
        .mount(&h.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/public"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&h.server)
        .await;
    Mock::given(method("POST"))
        .and(path(REFRESH_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "access": "x" })))
        .expect(0)
        .mount(&h.server)
        .await;

    h.auth.login("a@b.co", "pw").await.unwrap();
    let err = h
        .client
        .request::<Value>(RequestSpec::get("/api/public").skip_auth())
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(401));
    let public = requests_to(&h.server, "/api/public").await;
    assert_eq!(public.len(), 1);
    assert!(!public[0].headers.contains_key("authorization"));
    assert!(!public[0].headers.contains_key("cookie"));
}

#[tokio::test]
async fn login_unauthorized_is_returned_untouched() {
    let h = harness(Some("old-token")).await;
    Mock::given(method("POST"))
        .and(path(LOGIN_PATH))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(json!({ "detail": "No active account found" })),
        )
        .mount(&h.server)
        .await;
    Mock::given(method("POST"))
        .and(path(REFRESH_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "access": "x" })))
        .expect(0)
        .mount(&h.server)
        .await;

    let err = h.auth.login("a@b.co", "wrong").await.unwrap_err();

    match err {
        ApiError::Auth(response) => {
            assert_eq!(response.status, 401);
            assert_eq!(response.detail(), Some("No active account found"));
        }
        other => panic!("expected auth error, got {:?}", other),
    }
}

/// Validates that a replayed request is not refreshed a second time.
///
/// Assertions:
/// - Confirms one refresh call and two data calls.
/// - Confirms the second 401 is returned to the caller as `Auth`.
#[tokio::test]
async fn replay_rejected_again_is_not_retried() {
    let h = harness(Some("old-token")).await;
    Mock::given(method("GET"))
        .and(path("/api/data"))
        .respond_with(ResponseTemplate::new(401))
        .expect(2)
        .mount(&h.server)
        .await;
    Mock::given(method("POST"))
        .and(path(REFRESH_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "access": "new-token" })))
        .expect(1)
        .mount(&h.server)
        .await;

    let err = h.client.get::<Value>("/api/data").await.unwrap_err();

    match &err {
        ApiError::Auth(response) => assert_eq!(response.status, 401),
        other => panic!("expected Auth error, got {other:?}"),
    }
    assert!(err.is_unauthorized());
    assert_eq!(requests_to(&h.server, "/api/data").await.len(), 2);
    assert_eq!(requests_to(&h.server, REFRESH_PATH).await.len(), 1);
    assert_eq!(h.client.tokens().access_token().as_deref(), Some("new-token"));
}

#[tokio::test]
async fn unauthorized_within_logout_grace_is_not_refreshed() {
    let h = harness(Some("old-token")).await;
    mount_data_endpoint(&h.server, "never").await;
    Mock::given(method("POST"))
        .and(path(LOGOUT_PATH))
        .respond_with(ResponseTemplate::new(205))
        .mount(&h.server)
        .await;
    Mock::given(method("POST"))
        .and(path(REFRESH_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "access": "x" })))
        .expect(0)
        .mount(&h.server)
        .await;

    h.auth.logout().await.unwrap();
    let err = h.client.get::<Value>("/api/data").await.unwrap_err();

    assert!(err.is_unauthorized());
}

#[tokio::test]
async fn profile_missing_forces_logout() {
    let h = harness(Some("tok")).await;
    Mock::given(method("GET"))
        .and(path(CURRENT_USER_PATH))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "detail": "User not found" })))
        .expect(1)
        .mount(&h.server)
        .await;

    let mut events = h.client.signals().subscribe();
    let err = h.auth.current_user().await.unwrap_err();

    assert!(matches!(err, ApiError::ProfileMissing(_)));
    assert!(!h.client.tokens().is_authenticated());
    let forced = next_session_event(&mut events, Duration::from_secs(1), |e| {
        matches!(e, SessionEvent::ForcedLogout(_))
    })
    .await;
    assert_eq!(forced, Some(SessionEvent::ForcedLogout(ForcedLogoutReason::ProfileMissing)));
}

/// Validates that the refresh cookie set at login is what refresh relies on.
///
/// Assertions:
/// - Confirms the refresh request carries the cookie from the login response.
/// - Confirms the original request is replayed with the refreshed token.
#[tokio::test]
async fn refresh_sends_cookie_from_login() {
    let h = harness(None).await;
    Mock::given(method("POST"))
        .and(path(LOGIN_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("set-cookie", "refresh_token=r1; Path=/auth/jwt; HttpOnly")
                .set_body_json(json!({ "access": "a1" })),
        )
        .mount(&h.server)
        .await;
    mount_data_endpoint(&h.server, "a2").await;
    Mock::given(method("POST"))
        .and(path(REFRESH_PATH))
        .and(header("cookie", "refresh_token=r1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "access": "a2" })))
        .expect(1)
        .mount(&h.server)
        .await;
    Mock::given(method("POST"))
        .and(path(REFRESH_PATH))
        .respond_with(ResponseTemplate::new(401))
        .mount(&h.server)
        .await;

    h.auth.login("a@b.co", "pw").await.unwrap();
    let data: Value = h.client.get("/api/data").await.unwrap();

    assert_eq!(data, json!({ "ok": true }));
    assert_eq!(h.client.tokens().access_token().as_deref(), Some("a2"));
}

/// Validates replay with a credential that changed while the call was out.
///
/// Assertions:
/// - Confirms the call is retried with the newer token without a refresh.
#[tokio::test]
async fn stale_credential_is_replayed_without_refresh() {
    let h = harness(Some("old-token")).await;
    Mock::given(method("GET"))
        .and(path("/api/slow"))
        .and(header("authorization", "Bearer new-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
        .mount(&h.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/slow"))
        .respond_with(ResponseTemplate::new(401).set_delay(Duration::from_millis(200)))
        .mount(&h.server)
        .await;
    Mock::given(method("POST"))
        .and(path(REFRESH_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "access": "x" })))
        .expect(0)
        .mount(&h.server)
        .await;

    let client = h.client.clone();
    let call = tokio::spawn(async move { client.get::<Value>("/api/slow").await });
    tokio::time::sleep(Duration::from_millis(50)).await;
    h.client.tokens().set_access_token("new-token").await.unwrap();

    assert_eq!(call.await.unwrap().unwrap(), json!({ "ok": true }));
}

/// Validates that an abandoned refresh does not wedge later requests.
///
/// Assertions:
/// - Confirms a queued caller is released with `RefreshFailed`.
/// - Confirms the in-flight mark is cleared.
#[tokio::test]
async fn abandoned_refresh_releases_waiters() {
    let h = harness(Some("old-token")).await;
    mount_data_endpoint(&h.server, "never").await;
    Mock::given(method("POST"))
        .and(path(REFRESH_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "access": "late" }))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&h.server)
        .await;

    let leader_client = h.client.clone();
    let leader = tokio::spawn(async move { leader_client.get::<Value>("/api/data").await });
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(h.client.is_refreshing());

    let follower_client = h.client.clone();
    let follower = tokio::spawn(async move { follower_client.get::<Value>("/api/data").await });
    tokio::time::sleep(Duration::from_millis(100)).await;

    leader.abort();
    let result = tokio::time::timeout(Duration::from_secs(1), follower)
        .await
        .expect("follower released")
        .unwrap();

    assert!(matches!(result, Err(ApiError::RefreshFailed(_))));
    assert!(!h.client.is_refreshing());
}
