//! Account and session endpoints
//!
//! Login stores the returned access token and announces the new session;
//! logout ends the session locally before telling the server.

use std::sync::Arc;

use serde_json::{json, Value};
use tidylinker_common::SessionEvent;
use tidylinker_domain::constants::{
    ACTIVATE_PATH_PREFIX, ADMIN_LOGIN_PATH, CURRENT_USER_PATH, LOGIN_PATH, LOGOUT_PATH,
    REGISTER_CLEANER_PATH, REGISTER_EMPLOYER_PATH, RESET_PASSWORD_CONFIRM_PATH,
    RESET_PASSWORD_PATH, SET_PASSWORD_PATH,
};
use tidylinker_domain::{
    AccessTokenResponse, ActivationResponse, CurrentUser, LoginRequest, PasswordChangeRequest,
    PasswordResetConfirmRequest, PasswordResetRequest, RegistrationRequest, UserCredentials,
};
use tracing::{debug, info, instrument, warn};

use super::client::ApiClient;
use super::errors::ApiError;
use super::request::RequestSpec;

/// Authentication service over the shared [`ApiClient`]
#[derive(Clone)]
pub struct AuthService {
    client: Arc<ApiClient>,
}

impl AuthService {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }

    /// Sign in with email and password.
    ///
    /// # Errors
    ///
    /// Login failures are returned exactly as the backend reported them; a
    /// 401 here never triggers a refresh.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<String, ApiError> {
        self.sign_in(LOGIN_PATH, email, password).await
    }

    /// Sign in through the admin endpoint.
    #[instrument(skip(self, password))]
    pub async fn admin_login(&self, email: &str, password: &str) -> Result<String, ApiError> {
        self.sign_in(ADMIN_LOGIN_PATH, email, password).await
    }

    async fn sign_in(&self, path: &str, email: &str, password: &str) -> Result<String, ApiError> {
        let body = LoginRequest { email: email.to_string(), password: password.to_string() };
        let response: AccessTokenResponse =
            self.client.request(RequestSpec::post(path).json(&body)?).await?;

        let token = response
            .access
            .filter(|token| !token.is_empty())
            .ok_or_else(|| ApiError::Decode("No access token returned by login".into()))?;

        self.client.tokens().set_access_token(token.clone()).await?;
        self.client.signals().emit(SessionEvent::LoggedIn);
        info!("signed in");
        Ok(token)
    }

    /// End the session.
    ///
    /// The local credential is cleared and the logout recorded before the
    /// server is contacted, so nothing sent afterwards can revive the
    /// session. The server call is best effort.
    #[instrument(skip(self))]
    pub async fn logout(&self) -> Result<(), ApiError> {
        let tokens = self.client.tokens();
        tokens.clear_access_token().await?;
        tokens.mark_logged_out().await?;
        self.client.signals().emit(SessionEvent::LoggedOut);

        let spec = RequestSpec::post(LOGOUT_PATH).cookie_only().json(&json!({}))?;
        match self.client.request::<Value>(spec).await {
            Ok(_) => debug!("server session ended"),
            Err(err) => warn!(error = %err, "logout request failed; local session already ended"),
        }
        Ok(())
    }

    /// Refresh the access token from the refresh cookie.
    pub async fn refresh(&self) -> Result<String, ApiError> {
        self.client.refresh_access_token().await
    }

    pub async fn current_user(&self) -> Result<CurrentUser, ApiError> {
        self.client.get(CURRENT_USER_PATH).await
    }

    pub async fn register_cleaner(&self, email: &str, password: &str) -> Result<Value, ApiError> {
        self.register(REGISTER_CLEANER_PATH, email, password).await
    }

    pub async fn register_employer(&self, email: &str, password: &str) -> Result<Value, ApiError> {
        self.register(REGISTER_EMPLOYER_PATH, email, password).await
    }

    async fn register(&self, path: &str, email: &str, password: &str) -> Result<Value, ApiError> {
        let body = RegistrationRequest {
            user: UserCredentials { email: email.to_string(), password: password.to_string() },
        };
        self.client.request(RequestSpec::post(path).json(&body)?.skip_auth()).await
    }

    pub async fn change_password(
        &self,
        current_password: &str,
        new_password: &str,
        confirm_password: &str,
    ) -> Result<(), ApiError> {
        let body = PasswordChangeRequest {
            current_password: current_password.to_string(),
            new_password: new_password.to_string(),
            re_new_password: confirm_password.to_string(),
        };
        self.client.post::<_, Value>(SET_PASSWORD_PATH, &body).await.map(drop)
    }

    /// Activate an account from the emailed link.
    ///
    /// When the backend answers with an access token the user is signed in.
    pub async fn activate_account(
        &self,
        uid: &str,
        token: &str,
    ) -> Result<ActivationResponse, ApiError> {
        let path = format!(
            "{ACTIVATE_PATH_PREFIX}{}/{}/",
            urlencoding::encode(uid),
            urlencoding::encode(token)
        );
        let response: ActivationResponse =
            self.client.request(RequestSpec::get(path).skip_auth()).await?;

        if let Some(access) = response.access.as_deref().filter(|a| !a.is_empty()) {
            self.client.tokens().set_access_token(access).await?;
            self.client.signals().emit(SessionEvent::LoggedIn);
        }
        Ok(response)
    }

    pub async fn request_password_reset(&self, email: &str) -> Result<(), ApiError> {
        let body = PasswordResetRequest { email: email.to_string() };
        self.client
            .request::<Value>(RequestSpec::post(RESET_PASSWORD_PATH).json(&body)?.skip_auth())
            .await
            .map(drop)
    }

    pub async fn confirm_password_reset(
        &self,
        uid: &str,
        token: &str,
        new_password: &str,
        confirm_password: &str,
    ) -> Result<(), ApiError> {
        let body = PasswordResetConfirmRequest {
            uid: uid.to_string(),
            token: token.to_string(),
            new_password: new_password.to_string(),
            re_new_password: confirm_password.to_string(),
        };
        self.client
            .request::<Value>(
                RequestSpec::post(RESET_PASSWORD_CONFIRM_PATH).json(&body)?.skip_auth(),
            )
            .await
            .map(drop)
    }
}
