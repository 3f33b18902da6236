//! Session state shared by the HTTP client and the realtime sockets
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐      ┌──────────────────┐
//! │    TokenStore    │      │  SessionSignals  │  broadcast of SessionEvent
//! └────────┬─────────┘      └──────────────────┘
//!          │
//!          └──► CredentialStore   (file | keychain | memory)
//! ```
//!
//! # Module Organization
//!
//! - **[`store`]**: `CredentialStore` trait with file and memory backends
//! - **`keychain`**: OS keychain backend (`platform` feature)
//! - **[`token_store`]**: cached access token and logout marker
//! - **[`signals`]**: login / refresh / logout / forced-logout events

#[cfg(feature = "platform")]
mod keychain;
pub mod signals;
pub mod store;
pub mod token_store;

#[cfg(feature = "platform")]
pub use keychain::KeychainCredentialStore;
pub use signals::{ForcedLogout, ForcedLogoutReason, SessionEvent, SessionSignals};
pub use store::{CredentialStore, FileCredentialStore, MemoryCredentialStore, StoreError};
pub use token_store::TokenStore;
