use tokio::sync::broadcast::{self, Receiver, Sender};
use tracing::debug;

use crate::observability::metrics::get_metrics;

const BUFFER_SIZE: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// The stored session was cleared; local user state must be reset.
    SessionInvalidated,
}

/// Broadcast channel the refresh coordinator publishes on and the
/// identity layer subscribes to.
#[derive(Debug, Clone)]
pub struct SessionEvents {
    sender: Sender<SessionEvent>,
}

impl Default for SessionEvents {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionEvents {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(BUFFER_SIZE);
        Self { sender }
    }

    pub fn subscribe(&self) -> Receiver<SessionEvent> {
        self.sender.subscribe()
    }

    /// Publish `SessionInvalidated`; returns the number of subscribers reached.
    pub async fn publish_invalidated(&self) -> usize {
        get_metrics().await.session_invalidations.inc();
        let reached = self
            .sender
            .send(SessionEvent::SessionInvalidated)
            .unwrap_or_default();
        debug!("session-invalidated delivered to {} subscriber(s)", reached);
        reached
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn publish_without_subscribers_is_not_an_error() {
        let events = SessionEvents::new();
        assert_eq!(events.publish_invalidated().await, 0);
    }

    #[tokio::test]
    async fn every_subscriber_receives_the_event() {
        let events = SessionEvents::new();
        let mut a = events.subscribe();
        let mut b = events.subscribe();
        assert_eq!(events.publish_invalidated().await, 2);
        assert_eq!(a.recv().await.unwrap(), SessionEvent::SessionInvalidated);
        assert_eq!(b.recv().await.unwrap(), SessionEvent::SessionInvalidated);
    }
}
