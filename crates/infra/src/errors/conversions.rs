//! Conversions from external infrastructure errors into domain errors.

use reqwest::Error as HttpError;
use tidylinker_common::StoreError;
use tidylinker_domain::TidyLinkerError;
use tokio_tungstenite::tungstenite::Error as WsError;

use crate::api::ApiError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub TidyLinkerError);

impl From<InfraError> for TidyLinkerError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<TidyLinkerError> for InfraError {
    fn from(value: TidyLinkerError) -> Self {
        InfraError(value)
    }
}

/// Extension trait to make the conversion logic explicit in tests and within
/// this module.
trait IntoTidyLinkerError {
    fn into_tidylinker(self) -> TidyLinkerError;
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → TidyLinkerError */
/* -------------------------------------------------------------------------- */

impl IntoTidyLinkerError for HttpError {
    fn into_tidylinker(self) -> TidyLinkerError {
        if self.is_timeout() {
            return TidyLinkerError::Network("HTTP request timed out".into());
        }

        if self.is_connect() {
            return TidyLinkerError::Network(format!("HTTP connection failure: {self}"));
        }

        if self.is_builder() {
            return TidyLinkerError::Config(format!("invalid HTTP request: {self}"));
        }

        if let Some(status) = self.status() {
            let code = status.as_u16();
            let message =
                format!("HTTP {} {}", code, status.canonical_reason().unwrap_or("unknown status"));

            return match code {
                401 | 403 => TidyLinkerError::Auth(message),
                404 => TidyLinkerError::NotFound(message),
                400..=499 => TidyLinkerError::InvalidInput(message),
                _ => TidyLinkerError::Network(message),
            };
        }

        TidyLinkerError::Network(self.to_string())
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        InfraError(value.into_tidylinker())
    }
}

/* -------------------------------------------------------------------------- */
/* tungstenite::Error → TidyLinkerError */
/* -------------------------------------------------------------------------- */

impl IntoTidyLinkerError for WsError {
    fn into_tidylinker(self) -> TidyLinkerError {
        match self {
            WsError::ConnectionClosed | WsError::AlreadyClosed => {
                TidyLinkerError::Network("websocket connection closed".into())
            }
            WsError::Url(err) => TidyLinkerError::Config(format!("invalid websocket URL: {err}")),
            WsError::Http(response) => {
                let code = response.status().as_u16();
                let message = format!("websocket handshake rejected with HTTP {code}");
                match code {
                    401 | 403 => TidyLinkerError::Auth(message),
                    _ => TidyLinkerError::Network(message),
                }
            }
            other => TidyLinkerError::Network(format!("websocket error: {other}")),
        }
    }
}

impl From<WsError> for InfraError {
    fn from(value: WsError) -> Self {
        InfraError(value.into_tidylinker())
    }
}

/* -------------------------------------------------------------------------- */
/* StoreError → TidyLinkerError */
/* -------------------------------------------------------------------------- */

impl IntoTidyLinkerError for StoreError {
    fn into_tidylinker(self) -> TidyLinkerError {
        TidyLinkerError::Storage(self.to_string())
    }
}

impl From<StoreError> for InfraError {
    fn from(value: StoreError) -> Self {
        InfraError(value.into_tidylinker())
    }
}

/* -------------------------------------------------------------------------- */
/* ApiError → TidyLinkerError */
/* -------------------------------------------------------------------------- */

impl IntoTidyLinkerError for ApiError {
    fn into_tidylinker(self) -> TidyLinkerError {
        let message = self.to_string();
        match self {
            ApiError::Auth(_) | ApiError::RefreshFailed(_) | ApiError::ProfileMissing(_) => {
                TidyLinkerError::Auth(message)
            }
            ApiError::Client(response) if response.status == 404 => {
                TidyLinkerError::NotFound(message)
            }
            ApiError::Client(_) => TidyLinkerError::InvalidInput(message),
            ApiError::RateLimit(_)
            | ApiError::Server(_)
            | ApiError::Network(_)
            | ApiError::Timeout(_) => TidyLinkerError::Network(message),
            ApiError::Config(_) => TidyLinkerError::Config(message),
            ApiError::Storage(_) => TidyLinkerError::Storage(message),
            ApiError::Decode(_) => TidyLinkerError::Internal(message),
        }
    }
}

impl From<ApiError> for InfraError {
    fn from(value: ApiError) -> Self {
        InfraError(value.into_tidylinker())
    }
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */
