//! Async testing utilities
//!
//! Helpers for tests that wait on background tasks: socket drivers,
//! reconnect timers and session event broadcasts.

// Test helpers; error and panic docs would only restate the signatures.
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

use std::future::Future;
use std::time::Duration;

use tokio::sync::broadcast;

use crate::auth::SessionEvent;

/// Wait for a future to complete with a timeout, returning a Result
pub async fn timeout_ok<F, T>(duration: Duration, fut: F) -> Result<T, tokio::time::error::Elapsed>
where
    F: Future<Output = T>,
{
    tokio::time::timeout(duration, fut).await
}

/// Poll an async condition until it returns true or times out
///
/// # Examples
///
/// ```no_run
/// use std::sync::atomic::{AtomicBool, Ordering};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// use tidylinker_common::testing::poll_until;
///
/// #[tokio::test]
/// async fn waits_for_socket_flag() {
///     let connected = Arc::new(AtomicBool::new(false));
///     let flag = connected.clone();
///
///     tokio::spawn(async move {
///         tokio::time::sleep(Duration::from_millis(50)).await;
///         flag.store(true, Ordering::SeqCst);
///     });
///
///     let result = poll_until(Duration::from_secs(1), Duration::from_millis(10), || async {
///         connected.load(Ordering::SeqCst)
///     })
///     .await;
///
///     assert!(result);
/// }
/// ```
pub async fn poll_until<F, Fut>(timeout: Duration, interval: Duration, mut condition: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let start = std::time::Instant::now();

    while start.elapsed() < timeout {
        if condition().await {
            return true;
        }
        tokio::time::sleep(interval).await;
    }

    condition().await
}

/// Receive session events until one matches `wanted`, or `timeout` elapses.
///
/// Lagged receivers skip ahead instead of failing.
pub async fn next_session_event<F>(
    rx: &mut broadcast::Receiver<SessionEvent>,
    timeout: Duration,
    mut wanted: F,
) -> Option<SessionEvent>
where
    F: FnMut(&SessionEvent) -> bool,
{
    let search = async {
        loop {
            match rx.recv().await {
                Ok(event) if wanted(&event) => return Some(event),
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    };

    tokio::time::timeout(timeout, search).await.ok().flatten()
}
