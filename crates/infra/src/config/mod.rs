//! Configuration loading
//!
//! Reads the application configuration from a file and the environment.

pub mod loader;

// Re-export commonly used items
pub use loader::{apply_env_overrides, load, load_from_file, probe_config_paths};
