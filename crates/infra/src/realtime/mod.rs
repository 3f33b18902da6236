//! Realtime sockets
//!
//! - [`NotificationSocketManager`]: one shared, reconnecting notification
//!   connection per session, fanned out to any number of listeners.
//! - [`ChatSocket`]: one reconnecting connection per open chat.
//!
//! Both authenticate with the current access token as a `token` query
//! parameter, so they must be reopened after the token changes.

pub mod chat;
mod connection;
pub mod notifications;
mod socket;
pub mod url;

pub use chat::{ChatHandler, ChatSocket};
pub use notifications::{NotificationListener, NotificationSocketManager, Subscription};
pub use socket::ConnectionState;
pub use url::{build_ws_url, to_ws_origin, ws_base};
