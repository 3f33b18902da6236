//! Resilience helpers
//!
//! Only the reconnect backoff policy lives here today; HTTP calls are never
//! retried beyond the single post-refresh retry owned by the API client.

pub mod backoff;

pub use backoff::ExponentialBackoff;
