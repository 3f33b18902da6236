//! Modular common utilities shared across TidyLinker crates.
//!
//! # Feature Tiers
//!
//! Enable cargo features to opt into the tiers you need:
//! - `foundation`: pure helpers (reconnect backoff)
//! - `runtime`: session state (credential stores, token store, session
//!   signals)
//! - `platform`: OS keychain credential store
//! - `observability`: tracing (pulled in by `runtime`)
//! - `test-utils`: mocks and async test helpers for downstream crates

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

// Foundation tier
// -----------------------------------------------------------------
#[cfg(feature = "foundation")]
pub mod resilience;

// Runtime tier
// --------------------------------------------------------------------
#[cfg(feature = "runtime")]
pub mod auth;

// Testing utilities
// ---------------------------------------------------------------
#[cfg(any(feature = "test-utils", all(test, feature = "runtime")))]
pub mod testing;

// Re-export commonly used types and traits for convenience
// ------------------------
#[cfg(feature = "platform")]
pub use auth::KeychainCredentialStore;
#[cfg(feature = "runtime")]
pub use auth::{
    CredentialStore, FileCredentialStore, ForcedLogout, ForcedLogoutReason,
    MemoryCredentialStore, SessionEvent, SessionSignals, StoreError, TokenStore,
};
#[cfg(feature = "foundation")]
pub use resilience::ExponentialBackoff;
