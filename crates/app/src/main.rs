//! TidyLinker - command-line session host
//!
//! Signs in (or resumes a stored session), logs incoming notifications and
//! exits on Ctrl-C or when the server ends the session.

use std::sync::Arc;

use anyhow::Context;
use tidylinker_common::{ForcedLogoutReason, SessionEvent};
use tidylinker_domain::{NotificationEvent, TidyLinkerError};
use tidylinker_infra::{InfraError, NotificationListener};
use tidylinker_lib::utils::logging::{init_tracing, log_session_outcome, LogFormat};
use tidylinker_lib::SessionContext;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

const EMAIL_ENV: &str = "TIDYLINKER_EMAIL";
const PASSWORD_ENV: &str = "TIDYLINKER_PASSWORD";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env before logging so RUST_LOG from it applies.
    let dotenv = dotenvy::dotenv();
    init_tracing(LogFormat::from_env())?;
    match dotenv {
        Ok(path) => info!(path = %path.display(), "loaded .env"),
        Err(err) => debug!(error = %err, "no .env file loaded"),
    }

    let config = tidylinker_infra::config::load().context("failed to load configuration")?;
    let context = SessionContext::new(config).await.context("failed to build session context")?;
    info!(session_id = %context.session_id, "TidyLinker starting...");

    if let (Ok(email), Ok(password)) = (std::env::var(EMAIL_ENV), std::env::var(PASSWORD_ENV)) {
        let login = context.auth.login(&email, &password).await.map(|_| ());
        let outcome = login.map_err(|e| TidyLinkerError::from(InfraError::from(e)));
        log_session_outcome("auth::login", outcome.as_ref().copied());
        outcome.context("login failed")?;
    }

    if context.tokens.is_authenticated() {
        match context.auth.current_user().await {
            Ok(user) => info!(
                id = ?user.id,
                email = user.email.as_deref().unwrap_or("-"),
                role = user.role.as_deref().unwrap_or("-"),
                "signed in"
            ),
            Err(err) => warn!(error = %err, "could not fetch current user"),
        }
        match context.notifications.unread_count().await {
            Ok(unread) => info!(unread, "unread notifications"),
            Err(err) => warn!(error = %err, "could not fetch unread notifications"),
        }
    } else {
        warn!("no stored session; set {EMAIL_ENV} and {PASSWORD_ENV} to sign in");
    }

    let listener: Arc<dyn NotificationListener> = Arc::new(|event: &NotificationEvent| {
        info!(kind = event.kind.as_deref().unwrap_or("-"), payload = ?event.payload, "notification");
    });
    let subscription = context.notification_socket.add_listener(listener);

    let mut events = context.signals.subscribe();
    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(err) = result {
                error!(error = %err, "failed to listen for Ctrl-C");
            }
            info!("shutting down gracefully...");
        }
        reason = wait_for_forced_logout(&mut events) => {
            warn!(reason = reason.as_str(), "session ended by the server; shutting down");
        }
    }

    subscription.unsubscribe();
    context.shutdown().await?;
    Ok(())
}

async fn wait_for_forced_logout(
    events: &mut broadcast::Receiver<SessionEvent>,
) -> ForcedLogoutReason {
    loop {
        match events.recv().await {
            Ok(SessionEvent::ForcedLogout(reason)) => return reason,
            Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => continue,
            // The bus lives as long as the context; never resolve otherwise.
            Err(broadcast::error::RecvError::Closed) => return std::future::pending().await,
        }
    }
}
