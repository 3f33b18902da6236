//! # TidyLinker Infrastructure
//!
//! I/O side of the session client.
//!
//! This crate contains:
//! - HTTP client wrapper (credentialed and anonymous reqwest clients)
//! - Authenticated API client with silent credential refresh
//! - Typed endpoint services (auth, chats, notifications, messages, preferences)
//! - Realtime sockets (shared notification socket, per-chat socket)
//! - Configuration loading and infrastructure error conversions
//!
//! ## Architecture
//! - Depends on `tidylinker-domain` and `tidylinker-common`
//! - Contains all "impure" code (network, filesystem, keychain)

pub mod api;
pub mod config;
pub mod errors;
pub mod http;
pub mod realtime;
pub mod storage;

// Re-export commonly used items
pub use api::{
    ApiClient, ApiClientConfig, ApiError, ApiErrorCategory, AuthService, ChatsService,
    ErrorResponse, MessagesService, NotificationsService, PreferencesService, RequestSpec,
};
pub use errors::InfraError;
pub use http::{HttpClient, HttpClientBuilder};
pub use realtime::{
    ChatHandler, ChatSocket, ConnectionState, NotificationListener, NotificationSocketManager,
    Subscription,
};
pub use storage::credential_store_from_config;
