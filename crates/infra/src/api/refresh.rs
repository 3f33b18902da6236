//! Single-flight coordination for credential refresh
//!
//! The first caller to [`RefreshCoordinator::join`] while no refresh is
//! running becomes the leader and performs the refresh. Everyone else gets a
//! receiver that resolves with the leader's outcome. Waiters are released in
//! the order they joined, each exactly once.

use std::mem;

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::debug;

use super::errors::ApiError;

pub(crate) type RefreshOutcome = Result<String, ApiError>;

#[derive(Default)]
struct RefreshState {
    in_flight: bool,
    waiters: Vec<oneshot::Sender<RefreshOutcome>>,
}

#[derive(Default)]
pub(crate) struct RefreshCoordinator {
    state: Mutex<RefreshState>,
}

pub(crate) enum RefreshTicket<'a> {
    Leader(RefreshLease<'a>),
    Follower(oneshot::Receiver<RefreshOutcome>),
}

impl RefreshCoordinator {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn join(&self) -> RefreshTicket<'_> {
        let mut state = self.state.lock();
        if state.in_flight {
            let (tx, rx) = oneshot::channel();
            state.waiters.push(tx);
            debug!(queued = state.waiters.len(), "request queued behind running refresh");
            RefreshTicket::Follower(rx)
        } else {
            state.in_flight = true;
            RefreshTicket::Leader(RefreshLease { coordinator: self, settled: false })
        }
    }

    pub(crate) fn is_refreshing(&self) -> bool {
        self.state.lock().in_flight
    }

    fn settle(&self, outcome: &RefreshOutcome) {
        let waiters = {
            let mut state = self.state.lock();
            state.in_flight = false;
            mem::take(&mut state.waiters)
        };

        debug!(released = waiters.len(), ok = outcome.is_ok(), "refresh settled");
        for waiter in waiters {
            // A waiter whose caller went away is simply skipped.
            let _ = waiter.send(outcome.clone());
        }
    }
}

/// Held by the caller performing the refresh.
///
/// Dropping it without [`RefreshLease::settle`] rejects every waiter, so an
/// abandoned refresh never blocks later requests.
pub(crate) struct RefreshLease<'a> {
    coordinator: &'a RefreshCoordinator,
    settled: bool,
}

impl RefreshLease<'_> {
    pub(crate) fn settle(mut self, outcome: &RefreshOutcome) {
        self.settled = true;
        self.coordinator.settle(outcome);
    }
}

impl Drop for RefreshLease<'_> {
    fn drop(&mut self) {
        if !self.settled {
            let cancelled =
                Err(ApiError::RefreshFailed(Box::new(ApiError::Network("refresh cancelled".into()))));
            self.coordinator.settle(&cancelled);
        }
    }
}
