use tidylinker_domain::TidyLinkerError;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Environment variable selecting the log output format.
pub const LOG_FORMAT_ENV: &str = "TIDYLINKER_LOG_FORMAT";

/// Filter used when `RUST_LOG` is unset or invalid.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Output format of the fmt layer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Plain,
    Json,
}

impl LogFormat {
    /// `json` (any case) selects JSON; anything else is plain text.
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some(v) if v.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Plain,
        }
    }

    pub fn from_env() -> Self {
        Self::parse(std::env::var(LOG_FORMAT_ENV).ok().as_deref())
    }
}

/// Install the global tracing subscriber.
///
/// Honors `RUST_LOG`, falling back to [`DEFAULT_LOG_FILTER`].
///
/// # Errors
/// Returns [`TidyLinkerError::Internal`] if a global subscriber is already
/// installed.
pub fn init_tracing(format: LogFormat) -> Result<(), TidyLinkerError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);

    let installed = match format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Plain => builder.try_init(),
    };

    installed.map_err(|e| {
        TidyLinkerError::Internal(format!("failed to install tracing subscriber: {e}"))
    })
}

/// Log the outcome of a session operation with structured fields.
///
/// `operation` must be a stable identifier without credentials in it.
#[inline]
pub fn log_session_outcome(operation: &str, result: Result<(), &TidyLinkerError>) {
    match result {
        Ok(()) => info!(operation, "session_operation_success"),
        Err(err) => warn!(
            operation,
            error_kind = error_label(err),
            error = %err,
            "session_operation_failure"
        ),
    }
}

/// Convert a `TidyLinkerError` into a stable label suitable for logging.
#[inline]
pub fn error_label(error: &TidyLinkerError) -> &'static str {
    match error {
        TidyLinkerError::Config(_) => "config",
        TidyLinkerError::Network(_) => "network",
        TidyLinkerError::Auth(_) => "auth",
        TidyLinkerError::Storage(_) => "storage",
        TidyLinkerError::NotFound(_) => "not_found",
        TidyLinkerError::InvalidInput(_) => "invalid_input",
        TidyLinkerError::Internal(_) => "internal",
    }
}
