//! # TidyLinker Domain
//!
//! Shared types and models for the TidyLinker session client.
//!
//! This crate contains:
//! - Wire types for the auth, notification, chat and preference endpoints
//! - Domain error types and Result definitions
//! - Configuration structures
//! - Endpoint paths, storage keys and timing constants
//!
//! ## Architecture
//! - No dependencies on other TidyLinker crates
//! - Only external dependencies allowed
//! - Pure data structures, no I/O

pub mod config;
pub mod constants;
pub mod errors;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
