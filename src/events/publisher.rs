use serde_json::Value;
use tokio::sync::broadcast;

/// Broadcast publisher for lifecycle events
#[derive(Debug, Clone)]
pub struct EventPublisher {
    sender: broadcast::Sender<PublishedEvent>,
}

/// Event that has been published
#[derive(Debug, Clone, PartialEq)]
pub struct PublishedEvent {
    pub name: String,
    pub context: Value,
    pub published_at: chrono::DateTime<chrono::Utc>,
}

impl EventPublisher {
    /// Create a new event publisher with the specified channel capacity
    ///
    /// A capacity of zero is raised to one; the broadcast channel cannot be empty.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publish an event with the given name and context
    ///
    /// Publishing never fails: lifecycle events are informational and a missing
    /// subscriber is not an error.
    pub fn publish(&self, event_name: impl Into<String>, context: Value) {
        let event = PublishedEvent {
            name: event_name.into(),
            context,
            published_at: chrono::Utc::now(),
        };

        if self.sender.send(event).is_err() {
            tracing::trace!("No subscribers for lifecycle event");
        }
    }

    /// Publish a batch of events collected during a committed transition
    pub fn publish_all(&self, events: impl IntoIterator<Item = (String, Value)>) {
        for (name, context) in events {
            self.publish(name, context);
        }
    }

    /// Subscribe to events
    pub fn subscribe(&self) -> broadcast::Receiver<PublishedEvent> {
        self.sender.subscribe()
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventPublisher {
    fn default() -> Self {
        Self::new(1000) // Default capacity of 1000 events
    }
}
