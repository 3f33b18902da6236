//! Configuration loader
//!
//! Builds the application [`Config`] from an optional file plus environment
//! overrides.
//!
//! ## Loading Strategy
//! 1. `TIDYLINKER_CONFIG` names a file explicitly; otherwise standard paths
//!    are probed. No file at all means defaults.
//! 2. Environment variables override individual values.
//! 3. JSON and TOML files are supported (detected by extension).
//!
//! ## Environment Variables
//! - `TIDYLINKER_API_BASE_URL`: backend origin
//! - `TIDYLINKER_WS_BASE_URL`: dedicated WebSocket origin
//! - `TIDYLINKER_HTTP_TIMEOUT_MS`: per-request timeout
//! - `TIDYLINKER_LOGOUT_GRACE_MS`: no-refresh window after logout
//! - `TIDYLINKER_RECONNECT_BASE_MS` / `TIDYLINKER_RECONNECT_MAX_MS`: socket
//!   backoff bounds
//! - `TIDYLINKER_CREDENTIAL_STORE`: `file`, `keychain` or `memory`
//! - `TIDYLINKER_CREDENTIAL_PATH`: file used by the `file` store
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./tidylinker.{toml,json}` and `./config.{toml,json}`
//! 2. The same names in the parent and grandparent directories
//! 3. The same names next to the executable

use std::path::{Path, PathBuf};
use std::str::FromStr;

use tidylinker_domain::{Config, Result, StorageBackend, TidyLinkerError};

const CONFIG_FILE_NAMES: [&str; 4] =
    ["tidylinker.toml", "tidylinker.json", "config.toml", "config.json"];

/// Load configuration: file (if any) then environment overrides.
///
/// # Errors
/// Returns `TidyLinkerError::Config` if the named file is missing, a file
/// cannot be parsed, or an override has an invalid value.
pub fn load() -> Result<Config> {
    let explicit = std::env::var("TIDYLINKER_CONFIG").ok().filter(|p| !p.trim().is_empty());

    let mut config = match explicit {
        Some(path) => load_from_file(Some(PathBuf::from(path)))?,
        None => match probe_config_paths() {
            Some(path) => load_from_file(Some(path))?,
            None => {
                tracing::debug!("No config file found, using defaults");
                Config::default()
            }
        },
    };

    apply_env_overrides(&mut config)?;
    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, probes the standard locations.
///
/// # Errors
/// Returns `TidyLinkerError::Config` if no file is found, it cannot be
/// read, or its format is invalid.
pub fn load_from_file(path: Option<PathBuf>) -> Result<Config> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(TidyLinkerError::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            TidyLinkerError::Config(
                "No config file found in any of the standard locations".to_string(),
            )
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| TidyLinkerError::Config(format!("Failed to read config file: {}", e)))?;

    parse_config(&contents, &config_path)
}

/// Parse configuration from string content, choosing the format by the
/// extension of `path`.
fn parse_config(contents: &str, path: &Path) -> Result<Config> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| TidyLinkerError::Config(format!("Invalid TOML format: {}", e))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| TidyLinkerError::Config(format!("Invalid JSON format: {}", e))),
        _ => Err(TidyLinkerError::Config(format!("Unsupported config format: {}", extension))),
    }
}

/// First existing config file among the standard locations.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut dirs = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        dirs.extend(cwd.ancestors().take(3).map(Path::to_path_buf));
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            dirs.push(exe_dir.to_path_buf());
        }
    }

    dirs.iter()
        .flat_map(|dir| CONFIG_FILE_NAMES.iter().map(move |name| dir.join(name)))
        .find(|path| path.exists())
}

/// Apply `TIDYLINKER_*` overrides to `config`.
///
/// # Errors
/// Returns `TidyLinkerError::Config` for unparseable numbers or an unknown
/// credential store backend.
pub fn apply_env_overrides(config: &mut Config) -> Result<()> {
    if let Some(url) = env_string("TIDYLINKER_API_BASE_URL") {
        config.api.base_url = url;
    }
    if let Some(url) = env_string("TIDYLINKER_WS_BASE_URL") {
        config.realtime.ws_base_url = Some(url);
    }
    if let Some(ms) = env_parse::<u64>("TIDYLINKER_HTTP_TIMEOUT_MS")? {
        config.api.timeout_ms = ms;
    }
    if let Some(ms) = env_parse::<u64>("TIDYLINKER_LOGOUT_GRACE_MS")? {
        config.session.logout_grace_ms = ms;
    }
    if let Some(ms) = env_parse::<u64>("TIDYLINKER_RECONNECT_BASE_MS")? {
        config.realtime.reconnect_base_ms = ms;
    }
    if let Some(ms) = env_parse::<u64>("TIDYLINKER_RECONNECT_MAX_MS")? {
        config.realtime.reconnect_max_ms = ms;
    }
    if let Some(backend) = env_string("TIDYLINKER_CREDENTIAL_STORE") {
        config.storage.backend =
            StorageBackend::from_str(&backend).map_err(TidyLinkerError::Config)?;
    }
    if let Some(path) = env_string("TIDYLINKER_CREDENTIAL_PATH") {
        config.storage.path = PathBuf::from(path);
    }
    Ok(())
}

/// Non-empty environment variable
fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn env_parse<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    env_string(key)
        .map(|raw| {
            raw.parse::<T>()
                .map_err(|e| TidyLinkerError::Config(format!("Invalid value for {}: {}", key, e)))
        })
        .transpose()
}
