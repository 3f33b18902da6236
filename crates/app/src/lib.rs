//! # TidyLinker App
//!
//! Application layer: session wiring and the command-line host.
//!
//! This crate contains:
//! - Session context (dependency injection for one signed-in session)
//! - Logging setup
//! - Main entry point
//!
//! ## Architecture
//! - Depends on `common`, `domain` and `infra`
//! - Owns the only background task that reacts to session events

pub mod context;
pub mod utils;

// Re-export for convenience
pub use context::*;
