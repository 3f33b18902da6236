//! Backend API client for TidyLinker
//!
//! # Architecture
//!
//! - [`ApiClient`] owns two reqwest clients: a credentialed one with a cookie
//!   jar (bearer token + refresh cookie) and an anonymous one.
//! - A 401 on an ordinary call starts at most one refresh at a time; calls
//!   that fail while it runs wait for its outcome and are replayed once.
//! - Failed refresh or a vanished profile ends the session and is announced
//!   on [`tidylinker_common::SessionSignals`].
//! - Endpoint services are thin typed wrappers over the client.

pub mod auth;
pub mod chats;
pub mod client;
pub mod errors;
pub mod messages;
pub mod notifications;
pub mod preferences;
mod refresh;
pub mod request;

pub use auth::AuthService;
pub use chats::ChatsService;
pub use client::{ApiClient, ApiClientConfig};
pub use errors::{ApiError, ApiErrorCategory, ErrorResponse};
pub use messages::MessagesService;
pub use notifications::NotificationsService;
pub use preferences::PreferencesService;
pub use request::{AuthMode, RequestSpec};
