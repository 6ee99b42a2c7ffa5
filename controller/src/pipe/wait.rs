//! Single-future waits over transport events
//!
//! A wait owns its own broadcast receiver, so there is nothing to unregister
//! when it resolves, times out or is dropped.

use std::time::Duration;
use tokio::sync::broadcast::{self, error::RecvError};

use super::transport::TransportEvent;

/// Resolve with the first value `select` produces, or `None` at the deadline
///
/// `select` sees every event in arrival order. Returning `Some` ends the wait,
/// so a caller can race a success signal against a failure signal by mapping
/// both to a value.
pub async fn first_event<T, F>(
    mut events: broadcast::Receiver<TransportEvent>,
    timeout: Duration,
    mut select: F,
) -> Option<T>
where
    F: FnMut(&TransportEvent) -> Option<T>,
{
    let wait = async {
        loop {
            match events.recv().await {
                Ok(event) => {
                    if let Some(value) = select(&event) {
                        return Some(value);
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "event wait lagged behind");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    };

    tokio::time::timeout(timeout, wait).await.ok().flatten()
}

/// Race a success command against a connection error
///
/// Resolves `true` on the success command, `false` on a connection error, on
/// `failure_command` (when given) or at the deadline.
pub async fn race_commands(
    events: broadcast::Receiver<TransportEvent>,
    timeout: Duration,
    success_command: &str,
    failure_command: Option<&str>,
) -> bool {
    first_event(events, timeout, |event| match event {
        TransportEvent::Message(message) if message.is(success_command) => Some(true),
        TransportEvent::Message(message) if failure_command.is_some_and(|c| message.is(c)) => {
            Some(false)
        }
        TransportEvent::ConnectionError(_) => Some(false),
        TransportEvent::Message(_) => None,
    })
    .await
    .unwrap_or(false)
}
