//! Authentication payloads

use serde::{Deserialize, Serialize};

use super::EntityId;

/// Body for the login and admin login endpoints
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Response carrying a freshly issued access credential.
///
/// `access` is optional because the refresh endpoint may answer 2xx without
/// one, which callers must treat as a failed refresh.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccessTokenResponse {
    #[serde(default)]
    pub access: Option<String>,
}

/// Response from the account activation link
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActivationResponse {
    #[serde(default)]
    pub access: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// The signed-in user as returned by `/auth/users/me/`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    #[serde(default)]
    pub id: Option<EntityId>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Minimal credentials for cleaner or employer registration
#[derive(Debug, Clone, Serialize)]
pub struct UserCredentials {
    pub email: String,
    pub password: String,
}

/// Registration body: `{ "user": { "email", "password" } }`
#[derive(Debug, Clone, Serialize)]
pub struct RegistrationRequest {
    pub user: UserCredentials,
}

#[derive(Debug, Clone, Serialize)]
pub struct PasswordChangeRequest {
    pub current_password: String,
    pub new_password: String,
    pub re_new_password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PasswordResetRequest {
    pub email: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PasswordResetConfirmRequest {
    pub uid: String,
    pub token: String,
    pub new_password: String,
    pub re_new_password: String,
}
