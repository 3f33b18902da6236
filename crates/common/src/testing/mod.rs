//! Testing utilities and helpers
//!
//! - **[`async_utils`]**: polling, timeout and session-event helpers
//! - **[`mocks`]**: credential store double with failure injection and
//!   call counters
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use tidylinker_common::testing::MockCredentialStore;
//! use tidylinker_common::TokenStore;
//!
//! let store = Arc::new(MockCredentialStore::new());
//! let tokens = TokenStore::new(store.clone());
//! assert!(!tokens.is_authenticated());
//! assert_eq!(store.write_count(), 0);
//! ```

pub mod async_utils;
pub mod mocks;

pub use async_utils::{next_session_event, poll_until, timeout_ok};
pub use mocks::MockCredentialStore;
