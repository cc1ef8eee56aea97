//! Thin typed wrapper over an in-process broadcast topic, per spec.md §6's
//! event bus collaborator. Deliberately NOT Kafka-backed — see `DESIGN.md`
//! for the deviation rationale.

use legator_core::BusEvent;
use thiserror::Error;
use tokio::sync::broadcast;

const DEFAULT_CAPACITY: usize = 256;

#[derive(Debug, Error)]
pub enum BusError {
    #[error("no active receiver for bus event")]
    NoReceivers,
}

/// A broadcast topic for `BusEvent`s. Clone freely; every clone shares the
/// same underlying channel, mirroring `broadcast::Sender`'s own semantics.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<BusEvent>,
}

impl EventBus {
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to every current subscriber. Returns `Ok` with the
    /// subscriber count even if zero — publishing with nobody listening is
    /// not an error, only `subscribe()` needing a receiver matters.
    pub fn publish(&self, event: BusEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }

    #[must_use]
    pub fn subscribe(&self) -> BusSubscription {
        BusSubscription {
            receiver: self.sender.subscribe(),
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// A live subscription. Lagging behind the publish rate surfaces as
/// `RecvError::Lagged`; callers should log and keep reading rather than
/// treat it as fatal, per spec.md §6.
pub struct BusSubscription {
    receiver: broadcast::Receiver<BusEvent>,
}

impl BusSubscription {
    /// Await the next event, resynchronizing past any lag transparently.
    pub async fn recv(&mut self) -> Option<BusEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "bus subscriber lagged, resynchronizing");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use legator_core::ProbeId;

    #[tokio::test]
    async fn subscriber_receives_published_event() {
        let bus = EventBus::new();
        let mut sub = bus.subscribe();
        bus.publish(BusEvent::probe_disconnected(ProbeId::from("p1")));
        let event = sub.recv().await.unwrap();
        assert_eq!(event.event_type, "probe.disconnected");
        assert_eq!(event.probe_id, Some(ProbeId::from("p1")));
    }

    #[tokio::test]
    async fn publish_without_subscribers_does_not_error() {
        let bus = EventBus::new();
        let delivered = bus.publish(BusEvent::probe_disconnected(ProbeId::from("p1")));
        assert_eq!(delivered, 0);
    }

    #[tokio::test]
    async fn lagged_subscriber_resynchronizes_instead_of_ending() {
        let bus = EventBus::with_capacity(2);
        let mut sub = bus.subscribe();
        for i in 0..5 {
            bus.publish(BusEvent::probe_disconnected(ProbeId::from(format!("p{i}").as_str())));
        }
        // Despite lagging past the capacity-2 buffer, recv keeps working.
        let event = sub.recv().await.unwrap();
        assert_eq!(event.event_type, "probe.disconnected");
    }
}
