//! Event bus for broadcasting storage notifications to subscribers.

use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, trace, warn};

use crate::event::StashEvent;

/// Default channel capacity for the event bus.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Event bus for broadcasting events to all subscribers.
///
/// Clones share the same underlying channel, so an adapter and the code that
/// constructed it can hold separate handles to one bus.
#[derive(Debug)]
pub struct EventBus {
    /// Sender for broadcasting events.
    sender: broadcast::Sender<Arc<StashEvent>>,
    /// Channel capacity.
    capacity: usize,
}

impl EventBus {
    /// Create a new event bus with default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a new event bus with specified capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender, capacity }
    }

    /// Publish an event to all subscribers.
    ///
    /// Returns the number of receivers that received the event. Publishing
    /// with no receivers is not an error.
    pub fn publish(&self, event: StashEvent) -> usize {
        let event = Arc::new(event);

        trace!(event_type = %event.event_type(), "Publishing event");

        if let Ok(count) = self.sender.send(Arc::clone(&event)) {
            debug!(
                event_type = %event.event_type(),
                receiver_count = count,
                "Event published"
            );
            count
        } else {
            trace!(event_type = %event.event_type(), "No receivers for event");
            0
        }
    }

    /// Subscribe to all events.
    #[must_use]
    pub fn subscribe(&self) -> EventReceiver {
        EventReceiver::new(self.sender.subscribe(), None)
    }

    /// Subscribe to events whose [`event_type`](StashEvent::event_type)
    /// matches `pattern`.
    ///
    /// The pattern is either an exact event type (`persistence_unavailable`)
    /// or a prefix ending in `*` (`namespace_*`).
    #[must_use]
    pub fn subscribe_type(&self, pattern: impl Into<String>) -> EventReceiver {
        EventReceiver::new(self.sender.subscribe(), Some(pattern.into()))
    }

    /// Get the current number of active receivers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Get the channel capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for EventBus {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
            capacity: self.capacity,
        }
    }
}

/// Receiver for events from the event bus.
pub struct EventReceiver {
    receiver: broadcast::Receiver<Arc<StashEvent>>,
    /// Optional event type pattern; non-matching events are skipped.
    pattern: Option<String>,
}

impl EventReceiver {
    pub(crate) fn new(
        receiver: broadcast::Receiver<Arc<StashEvent>>,
        pattern: Option<String>,
    ) -> Self {
        Self { receiver, pattern }
    }

    fn matches(&self, event: &StashEvent) -> bool {
        let Some(pattern) = &self.pattern else {
            return true;
        };

        if let Some(prefix) = pattern.strip_suffix('*') {
            event.event_type().starts_with(prefix)
        } else {
            event.event_type() == pattern
        }
    }

    /// Receive the next matching event.
    ///
    /// Returns `None` once the channel is closed.
    pub async fn recv(&mut self) -> Option<Arc<StashEvent>> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => {
                    if self.matches(&event) {
                        return Some(event);
                    }
                },
                Err(broadcast::error::RecvError::Lagged(count)) => {
                    warn!(skipped = count, "Event receiver lagged, events dropped");
                },
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Try to receive the next matching event without blocking.
    pub fn try_recv(&mut self) -> Option<Arc<StashEvent>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.matches(&event) {
                        return Some(event);
                    }
                },
                Err(broadcast::error::TryRecvError::Lagged(count)) => {
                    warn!(skipped = count, "Event receiver lagged, events dropped");
                },
                Err(
                    broadcast::error::TryRecvError::Empty | broadcast::error::TryRecvError::Closed,
                ) => return None,
            }
        }
    }
}

impl std::fmt::Debug for EventReceiver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventReceiver")
            .field("pattern", &self.pattern)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventMetadata;

    fn unavailable() -> StashEvent {
        StashEvent::PersistenceUnavailable {
            metadata: EventMetadata::new("test"),
            reason: Some("no disk".into()),
        }
    }

    fn persisted() -> StashEvent {
        StashEvent::NamespacePersisted {
            metadata: EventMetadata::new("test"),
            namespace: "post".into(),
            records: 1,
        }
    }

    #[tokio::test]
    async fn test_event_bus_creation() {
        let bus = EventBus::new();
        assert_eq!(bus.capacity(), DEFAULT_CHANNEL_CAPACITY);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_publish_and_receive() {
        let bus = EventBus::new();
        let mut receiver = bus.subscribe();

        assert_eq!(bus.publish(unavailable()), 1);

        let event = receiver.recv().await.unwrap();
        assert_eq!(event.event_type(), "persistence_unavailable");
    }

    #[tokio::test]
    async fn test_no_subscribers() {
        let bus = EventBus::new();
        assert_eq!(bus.publish(unavailable()), 0);
    }

    #[tokio::test]
    async fn test_cloned_bus_shares_channel() {
        let bus = EventBus::new();
        let mut receiver = bus.subscribe();
        let cloned = bus.clone();

        cloned.publish(persisted());
        assert!(receiver.try_recv().is_some());
    }

    #[tokio::test]
    async fn test_try_recv_empty() {
        let bus = EventBus::new();
        let mut receiver = bus.subscribe();
        assert!(receiver.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_type_subscription_exact() {
        let bus = EventBus::new();
        let mut receiver = bus.subscribe_type("persistence_unavailable");

        bus.publish(persisted());
        bus.publish(unavailable());

        let event = receiver.try_recv().unwrap();
        assert_eq!(event.event_type(), "persistence_unavailable");
        assert!(receiver.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_type_subscription_wildcard() {
        let bus = EventBus::new();
        let mut receiver = bus.subscribe_type("namespace_*");

        bus.publish(unavailable());
        bus.publish(persisted());

        let event = receiver.try_recv().unwrap();
        assert_eq!(event.event_type(), "namespace_persisted");
        assert!(receiver.try_recv().is_none());
    }
}
