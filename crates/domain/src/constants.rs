//! Application constants
//!
//! Centralized location for endpoint paths, durable storage keys and timing
//! defaults used by the session client.

// Backend defaults
pub const DEFAULT_API_BASE_URL: &str = "https://cgsabiozard.co.uk";
pub const DEFAULT_HTTP_TIMEOUT_MS: u64 = 15_000;
pub const DEFAULT_USER_AGENT: &str = concat!("tidylinker/", env!("CARGO_PKG_VERSION"));

// Session timing
pub const LOGOUT_GRACE_MS: u64 = 5_000;
pub const RECONNECT_BASE_MS: u64 = 1_000;
pub const RECONNECT_MAX_MS: u64 = 30_000;

// Durable storage keys
pub const ACCESS_TOKEN_KEY: &str = "access_token";
pub const LOGGED_OUT_AT_KEY: &str = "auth_logged_out_at";
pub const DEFAULT_KEYCHAIN_SERVICE: &str = "TidyLinker";
pub const DEFAULT_CREDENTIAL_FILE: &str = "tidylinker-credentials.json";

// Auth endpoints
pub const LOGIN_PATH: &str = "/auth/jwt/create/";
pub const ADMIN_LOGIN_PATH: &str = "/auth/jwt/admin/create/";
pub const REFRESH_PATH: &str = "/auth/jwt/refresh/";
pub const LOGOUT_PATH: &str = "/auth/jwt/logout/";
pub const CURRENT_USER_PATH: &str = "/auth/users/me/";
pub const SET_PASSWORD_PATH: &str = "/auth/users/set_password/";
pub const RESET_PASSWORD_PATH: &str = "/auth/users/reset_password/";
pub const RESET_PASSWORD_CONFIRM_PATH: &str = "/auth/users/reset_password_confirm/";
pub const REGISTER_CLEANER_PATH: &str = "/api/users/register/cleaner/";
pub const REGISTER_EMPLOYER_PATH: &str = "/api/users/register/employer/";
pub const ACTIVATE_PATH_PREFIX: &str = "/api/users/activate/";

// Notification endpoints
pub const NOTIFICATIONS_PATH: &str = "/api/notifications/";
pub const NOTIFICATIONS_UNREAD_COUNT_PATH: &str = "/api/notifications/unread_count/";
pub const NOTIFICATIONS_MARK_ALL_READ_PATH: &str = "/api/notifications/mark_all_as_read/";

// Chat endpoints
pub const CHATS_PATH: &str = "/api/chats/";
pub const FLAGGED_CHATS_PATH: &str = "/api/flagged-chats/";

// Message endpoints
pub const MESSAGES_PATH: &str = "/api/messages/";
pub const MESSAGES_UNREAD_COUNT_PATH: &str = "/api/messages/unread-count";

// Preference endpoints
pub const PREFERENCES_PATH: &str = "/api/preferences/";
pub const PREFERENCES_RESET_PATH: &str = "/api/preferences/reset/";
pub const PREFERENCES_EVENTS_PATH: &str = "/api/preferences/available-events/";

// Realtime endpoints
pub const NOTIFICATIONS_WS_PATH: &str = "/ws/notifications/";
pub const CHAT_WS_PATH_PREFIX: &str = "/ws/chat/";
pub const WS_CLOSE_REASON: &str = "Client closing";

/// Backend error messages that mean the signed-in profile no longer exists.
pub const PROFILE_MISSING_MARKERS: [&str; 2] =
    ["No Employer matches the given query", "User not found"];
