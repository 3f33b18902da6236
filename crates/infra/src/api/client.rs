//! Authenticated API client with silent credential refresh
//!
//! Every call carries the current access token. A 401 on an ordinary call
//! triggers one cookie-based refresh shared by all concurrent callers, after
//! which each affected call is replayed once with the new token.

use std::sync::Arc;
use std::time::Duration;

use reqwest::cookie::Jar;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use tidylinker_common::{ForcedLogoutReason, SessionEvent, SessionSignals, TokenStore};
use tidylinker_domain::constants::{
    DEFAULT_API_BASE_URL, DEFAULT_HTTP_TIMEOUT_MS, DEFAULT_USER_AGENT, LOGOUT_GRACE_MS,
    REFRESH_PATH,
};
use tidylinker_domain::{AccessTokenResponse, Config};
use tracing::{debug, info, instrument, warn};

use super::errors::{ApiError, ErrorResponse};
use super::refresh::{RefreshCoordinator, RefreshTicket};
use super::request::{AuthMode, RequestSpec};
use crate::http::HttpClient;

/// Configuration for API client
#[derive(Debug, Clone)]
pub struct ApiClientConfig {
    /// Backend origin without trailing slash
    pub base_url: String,
    /// Upper bound for one HTTP exchange (request and body)
    pub timeout: Duration,
    pub user_agent: String,
    /// Failures this soon after a logout are never turned into refreshes
    pub logout_grace: Duration,
}

impl Default for ApiClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_string(),
            timeout: Duration::from_millis(DEFAULT_HTTP_TIMEOUT_MS),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            logout_grace: Duration::from_millis(LOGOUT_GRACE_MS),
        }
    }
}

impl From<&Config> for ApiClientConfig {
    fn from(config: &Config) -> Self {
        Self {
            base_url: config.api.normalized_base_url(),
            timeout: config.api.timeout(),
            user_agent: config.api.user_agent.clone(),
            logout_grace: config.session.logout_grace(),
        }
    }
}

/// API client shared by every service of a session.
pub struct ApiClient {
    /// Sends cookies and stores `Set-Cookie` responses.
    credentialed: HttpClient,
    /// No cookie jar; used for `skip_auth` calls.
    anonymous: HttpClient,
    cookie_jar: Arc<Jar>,
    config: ApiClientConfig,
    tokens: Arc<TokenStore>,
    signals: Arc<SessionSignals>,
    refresh: RefreshCoordinator,
}

impl ApiClient {
    /// Create a new API client
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Config`] if the underlying HTTP clients cannot be
    /// built.
    pub fn new(
        mut config: ApiClientConfig,
        tokens: Arc<TokenStore>,
        signals: Arc<SessionSignals>,
    ) -> Result<Self, ApiError> {
        config.base_url = config.base_url.trim_end_matches('/').to_string();

        let cookie_jar = Arc::new(Jar::default());
        let credentialed = HttpClient::builder()
            .user_agent(config.user_agent.clone())
            .default_headers(json_headers())
            .cookie_jar(cookie_jar.clone())
            .build()
            .map_err(|e| ApiError::Config(format!("Failed to build HttpClient: {e}")))?;
        let anonymous = HttpClient::builder()
            .user_agent(config.user_agent.clone())
            .default_headers(json_headers())
            .build()
            .map_err(|e| ApiError::Config(format!("Failed to build HttpClient: {e}")))?;

        Ok(Self {
            credentialed,
            anonymous,
            cookie_jar,
            config,
            tokens,
            signals,
            refresh: RefreshCoordinator::new(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    pub fn tokens(&self) -> &Arc<TokenStore> {
        &self.tokens
    }

    pub fn signals(&self) -> &Arc<SessionSignals> {
        &self.signals
    }

    /// Cookie jar of the credentialed client (holds the refresh cookie).
    pub fn cookie_jar(&self) -> &Arc<Jar> {
        &self.cookie_jar
    }

    /// Whether a credential refresh is currently running.
    pub fn is_refreshing(&self) -> bool {
        self.refresh.is_refreshing()
    }

    /// Execute `spec` and decode the JSON response.
    ///
    /// # Errors
    ///
    /// Returns the first unrecoverable [`ApiError`]. A 401 is recovered from
    /// at most once per call.
    #[instrument(skip(self, spec), fields(method = %spec.method, path = %spec.path))]
    pub async fn request<T: DeserializeOwned>(&self, spec: RequestSpec) -> Result<T, ApiError> {
        let value = self.execute(&spec).await?;
        serde_json::from_value(value)
            .map_err(|e| ApiError::Decode(format!("Failed to parse response: {e}")))
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.request(RequestSpec::get(path)).await
    }

    pub async fn get_with_query<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, ApiError> {
        let spec = query.iter().fold(RequestSpec::get(path), |spec, (k, v)| spec.query(*k, *v));
        self.request(spec).await
    }

    pub async fn post<B: Serialize + ?Sized, R: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<R, ApiError> {
        self.request(RequestSpec::post(path).json(body)?).await
    }

    pub async fn put<B: Serialize + ?Sized, R: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<R, ApiError> {
        self.request(RequestSpec::put(path).json(body)?).await
    }

    pub async fn patch<B: Serialize + ?Sized, R: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<R, ApiError> {
        self.request(RequestSpec::patch(path).json(body)?).await
    }

    pub async fn delete<R: DeserializeOwned>(&self, path: &str) -> Result<R, ApiError> {
        self.request(RequestSpec::delete(path)).await
    }

    /// Obtain a new access token from the refresh cookie.
    ///
    /// Joins the running refresh if there is one. On failure the session is
    /// ended and [`SessionEvent::ForcedLogout`] is raised.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::RefreshFailed`] wrapping the cause.
    pub async fn refresh_access_token(&self) -> Result<String, ApiError> {
        let lease = match self.refresh.join() {
            RefreshTicket::Leader(lease) => lease,
            RefreshTicket::Follower(rx) => {
                return rx.await.unwrap_or_else(|_| {
                    Err(ApiError::RefreshFailed(Box::new(ApiError::Network(
                        "refresh abandoned".into(),
                    ))))
                });
            }
        };

        let outcome = self.perform_refresh().await;
        lease.settle(&outcome);
        outcome
    }

    async fn execute(&self, spec: &RequestSpec) -> Result<Value, ApiError> {
        let mut retried = false;

        loop {
            let sent_token = match spec.auth {
                AuthMode::Bearer => self.tokens.access_token(),
                AuthMode::CookieOnly | AuthMode::Anonymous => None,
            };

            let error = match self.dispatch(spec, sent_token.as_deref()).await {
                Ok(value) => return Ok(value),
                Err(error) => error,
            };

            if spec.is_login() {
                return Err(error);
            }

            if self.tokens.logged_out_within(self.config.logout_grace) {
                debug!(error = %error, "failure inside logout grace window, not refreshing");
                return Err(error);
            }

            if sent_token.is_some() {
                if let Some(response) = error.response().filter(|r| r.is_profile_missing()) {
                    let response = response.clone();
                    warn!(status = response.status, "profile no longer exists, ending session");
                    self.force_logout(ForcedLogoutReason::ProfileMissing).await;
                    return Err(ApiError::ProfileMissing(response));
                }
            }

            if error.is_unauthorized()
                && !retried
                && !spec.is_refresh()
                && spec.auth == AuthMode::Bearer
            {
                retried = true;

                // Another call already replaced the credential we sent.
                if let Some(current) = self.tokens.access_token() {
                    if sent_token.as_deref() != Some(current.as_str()) {
                        debug!("retrying with newer credential");
                        continue;
                    }
                }

                self.refresh_access_token().await?;
                continue;
            }

            return Err(error);
        }
    }

    async fn perform_refresh(&self) -> Result<String, ApiError> {
        info!("refreshing access credential");

        let spec = RequestSpec::post(REFRESH_PATH).cookie_only().json(&json!({}))?;
        let result = self.dispatch(&spec, None).await.and_then(|value| {
            let response: AccessTokenResponse = serde_json::from_value(value)
                .map_err(|e| ApiError::Decode(format!("Failed to parse refresh response: {e}")))?;
            response
                .access
                .filter(|token| !token.is_empty())
                .ok_or_else(|| ApiError::Decode("No access token returned by refresh".into()))
        });

        match result {
            Ok(token) => {
                if let Err(err) = self.tokens.set_access_token(token.clone()).await {
                    warn!(error = %err, "refreshed credential could not be persisted");
                }
                self.signals.emit(SessionEvent::CredentialRefreshed);
                info!("access credential refreshed");
                Ok(token)
            }
            Err(err) => {
                warn!(error = %err, category = ?err.category(), "credential refresh failed");
                self.force_logout(ForcedLogoutReason::RefreshFailed).await;
                Err(ApiError::RefreshFailed(Box::new(err)))
            }
        }
    }

    async fn force_logout(&self, reason: ForcedLogoutReason) {
        if let Err(err) = self.tokens.clear_access_token().await {
            warn!(error = %err, "failed to clear stored credential");
        }
        if let Err(err) = self.tokens.mark_logged_out().await {
            warn!(error = %err, "failed to record logout time");
        }
        self.signals.emit(SessionEvent::ForcedLogout(reason));
    }

    /// Send `spec` once and read the whole response within the timeout.
    async fn dispatch(&self, spec: &RequestSpec, token: Option<&str>) -> Result<Value, ApiError> {
        let url = spec.url(&self.config.base_url);
        let client = match spec.auth {
            AuthMode::Anonymous => &self.anonymous,
            AuthMode::Bearer | AuthMode::CookieOnly => &self.credentialed,
        };

        let mut builder = client.request(spec.method.clone(), &url);
        if !spec.query.is_empty() {
            builder = builder.query(&spec.query);
        }
        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &spec.body {
            builder = builder.json(body);
        }

        let exchange = async {
            let response = client.send(builder).await?;
            let status = response.status();
            let text = response
                .text()
                .await
                .map_err(|e| ApiError::Network(format!("Failed to read response body: {e}")))?;
            Ok::<_, ApiError>((status, text))
        };

        let timeout = self.config.timeout;
        let (status, text) = match tokio::time::timeout(timeout, exchange).await {
            Ok(result) => result?,
            Err(_) => return Err(ApiError::Timeout(timeout)),
        };

        if !status.is_success() {
            debug!(%status, "request failed");
            return Err(ApiError::from_response(ErrorResponse::new(status, url, text)));
        }

        // 204/205 carry no body by definition
        if status == StatusCode::NO_CONTENT
            || status == StatusCode::RESET_CONTENT
            || text.trim().is_empty()
        {
            return Ok(Value::Null);
        }

        serde_json::from_str(&text)
            .map_err(|e| ApiError::Decode(format!("Failed to parse response: {e}")))
    }
}

fn json_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers
}

#[cfg(test)]
mod tests {
    use tidylinker_common::MemoryCredentialStore;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    #[derive(Debug, serde::Serialize, serde::Deserialize, PartialEq)]
    struct TestResponse {
        message: String,
    }

    async fn client_for(server: &MockServer, token: Option<&str>) -> ApiClient {
        let tokens = Arc::new(TokenStore::new(Arc::new(MemoryCredentialStore::new())));
        if let Some(token) = token {
            tokens.set_access_token(token).await.unwrap();
        }
        let config = ApiClientConfig { base_url: format!("{}/", server.uri()), ..Default::default() };
        ApiClient::new(config, tokens, Arc::new(SessionSignals::new())).unwrap()
    }

    #[tokio::test]
    async fn test_get_with_json_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/test"))
            .and(header("authorization", "Bearer test-token"))
            .and(header("accept", "application/json"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "message": "success" })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, Some("test-token")).await;
        let result: TestResponse = client.get("/api/test").await.unwrap();

        assert_eq!(result, TestResponse { message: "success".to_string() });
    }

    #[tokio::test]
    async fn test_get_without_token_sends_no_authorization() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/public"))
            .respond_with(move |req: &wiremock::Request| {
                let status = if req.headers.contains_key("authorization") { 400 } else { 200 };
                ResponseTemplate::new(status).set_body_json(json!({ "message": "ok" }))
            })
            .mount(&server)
            .await;

        let client = client_for(&server, None).await;
        let result: TestResponse = client.get("/api/public").await.unwrap();
        assert_eq!(result.message, "ok");
    }

    #[tokio::test]
    async fn test_get_with_204_no_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/empty"))
            .and(body_json(json!({ "a": 1 })))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let client = client_for(&server, Some("t")).await;
        let result: Result<(), ApiError> = client.post("/api/empty", &json!({ "a": 1 })).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_get_with_query_params() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/list"))
            .and(query_param("page", "2"))
            .and(query_param("is_read", "false"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, Some("t")).await;
        let result: Vec<Value> = client
            .get_with_query("/api/list", &[("page", "2"), ("is_read", "false")])
            .await
            .unwrap();
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn test_get_with_404_client_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/missing"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "detail": "Not found." })))
            .mount(&server)
            .await;

        let client = client_for(&server, Some("t")).await;
        let err = client.get::<Value>("/api/missing").await.unwrap_err();

        match err {
            ApiError::Client(response) => {
                assert_eq!(response.status, 404);
                assert_eq!(response.detail(), Some("Not found."));
            }
            other => panic!("expected client error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_get_with_500_server_error_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, Some("t")).await;
        let err = client.get::<Value>("/api/boom").await.unwrap_err();
        assert!(matches!(err, ApiError::Server(_)));
    }

    #[tokio::test]
    async fn test_invalid_json_is_decode_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let client = client_for(&server, Some("t")).await;
        let err = client.get::<Value>("/api/html").await.unwrap_err();
        assert!(matches!(err, ApiError::Decode(_)));
    }

    #[tokio::test]
    async fn test_slow_response_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
            .mount(&server)
            .await;

        let tokens = Arc::new(TokenStore::new(Arc::new(MemoryCredentialStore::new())));
        let config = ApiClientConfig {
            base_url: server.uri(),
            timeout: Duration::from_millis(50),
            ..Default::default()
        };
        let client = ApiClient::new(config, tokens, Arc::new(SessionSignals::new())).unwrap();

        let err = client.get::<Value>("/api/slow").await.unwrap_err();
        assert_eq!(err, ApiError::Timeout(Duration::from_millis(50)));
    }

    #[test]
    fn config_from_app_config_strips_trailing_slash() {
        let mut config = Config::default();
        config.api.base_url = "https://api.test///".into();
        config.session.logout_grace_ms = 1_000;

        let api = ApiClientConfig::from(&config);
        assert_eq!(api.base_url, "https://api.test");
        assert_eq!(api.logout_grace, Duration::from_secs(1));
    }
}
