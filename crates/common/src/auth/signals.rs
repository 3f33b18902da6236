//! Session event bus
//!
//! Login, refresh and logout transitions are announced here so that other
//! components (the notification socket, the navigation layer of a UI host)
//! can react without sharing storage side channels.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::{info, warn};

const DEFAULT_CAPACITY: usize = 64;

/// Why the session was ended without the user asking
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForcedLogoutReason {
    /// The refresh credential was rejected or the refresh call failed
    RefreshFailed,
    /// The backend no longer knows the signed-in profile
    ProfileMissing,
}

impl ForcedLogoutReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RefreshFailed => "refresh_failed",
            Self::ProfileMissing => "profile_missing",
        }
    }
}

/// Session lifecycle transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    LoggedIn,
    CredentialRefreshed,
    LoggedOut,
    ForcedLogout(ForcedLogoutReason),
}

/// Record of the most recent forced logout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForcedLogout {
    pub reason: ForcedLogoutReason,
    pub at: DateTime<Utc>,
}

/// Broadcast bus for [`SessionEvent`]s.
///
/// Events sent with no subscriber are not an error. The last forced logout
/// is also kept so observers that subscribe late can still find out.
pub struct SessionSignals {
    tx: broadcast::Sender<SessionEvent>,
    last_forced_logout: Mutex<Option<ForcedLogout>>,
}

impl SessionSignals {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx, last_forced_logout: Mutex::new(None) }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.tx.subscribe()
    }

    /// Publish `event` to every subscriber.
    pub fn emit(&self, event: SessionEvent) {
        match event {
            SessionEvent::ForcedLogout(reason) => {
                warn!(reason = reason.as_str(), "session forcibly logged out");
                *self.last_forced_logout.lock() = Some(ForcedLogout { reason, at: Utc::now() });
            }
            SessionEvent::LoggedIn => {
                info!("session started");
                self.last_forced_logout.lock().take();
            }
            SessionEvent::CredentialRefreshed => info!("session credential refreshed"),
            SessionEvent::LoggedOut => info!("session ended"),
        }

        let _ = self.tx.send(event);
    }

    pub fn last_forced_logout(&self) -> Option<ForcedLogout> {
        *self.last_forced_logout.lock()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for SessionSignals {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SessionSignals {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionSignals")
            .field("subscribers", &self.tx.receiver_count())
            .field("last_forced_logout", &self.last_forced_logout())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_receive_events_in_order() {
        let signals = SessionSignals::new();
        let mut rx = signals.subscribe();

        signals.emit(SessionEvent::LoggedIn);
        signals.emit(SessionEvent::CredentialRefreshed);
        signals.emit(SessionEvent::LoggedOut);

        assert_eq!(rx.recv().await.unwrap(), SessionEvent::LoggedIn);
        assert_eq!(rx.recv().await.unwrap(), SessionEvent::CredentialRefreshed);
        assert_eq!(rx.recv().await.unwrap(), SessionEvent::LoggedOut);
    }

    #[test]
    fn forced_logout_is_recorded_until_next_login() {
        let signals = SessionSignals::new();
        assert!(signals.last_forced_logout().is_none());

        signals.emit(SessionEvent::ForcedLogout(ForcedLogoutReason::ProfileMissing));
        assert_eq!(
            signals.last_forced_logout().map(|f| f.reason),
            Some(ForcedLogoutReason::ProfileMissing)
        );

        signals.emit(SessionEvent::LoggedIn);
        assert!(signals.last_forced_logout().is_none());
    }

    #[test]
    fn emit_without_subscribers_is_silent() {
        let signals = SessionSignals::new();
        assert_eq!(signals.subscriber_count(), 0);
        signals.emit(SessionEvent::LoggedOut);
    }
}
