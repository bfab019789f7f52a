//! Application event system for real-time UI sync.
//!
//! [`EventBus`] wraps a `tokio::sync::broadcast` channel with a bounded
//! ring-buffer of recent events so that late-joining clients can catch up.
//! Producers only see the [`EventPublisher`] trait.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::error::Result;

/// Maximum number of events retained in the ring buffer.
const MAX_RECENT_EVENTS: usize = 100;

/// Topic published after a conversion job commits its result.
pub const TOPIC_CONVERTED: &str = "converted";

/// Sink for fire-and-forget notifications.
///
/// Callers treat an `Err` as non-fatal: it is logged and never escalated.
pub trait EventPublisher: Send + Sync {
    /// Publish `payload` under `topic`.
    fn publish(&self, topic: &str, payload: serde_json::Value) -> Result<()>;
}

// ---------------------------------------------------------------------------
// Event
// ---------------------------------------------------------------------------

/// A timestamped event ready for broadcast.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Unique event identifier.
    pub id: Uuid,
    /// When the event occurred.
    pub timestamp: DateTime<Utc>,
    /// Topic subscribers filter on (e.g. [`TOPIC_CONVERTED`]).
    pub topic: String,
    /// What happened.
    pub payload: serde_json::Value,
}

impl Event {
    /// Create a new event with a fresh UUID and the current timestamp.
    pub fn new(topic: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            topic: topic.into(),
            payload,
        }
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Broadcast channel with a bounded ring buffer of recent events.
pub struct EventBus {
    tx: broadcast::Sender<Event>,
    recent: RwLock<VecDeque<Event>>,
}

impl EventBus {
    /// Create a new event bus.
    ///
    /// `capacity` controls the broadcast channel buffer size (not the ring
    /// buffer, which is always [`MAX_RECENT_EVENTS`]).
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self {
            tx,
            recent: RwLock::new(VecDeque::with_capacity(MAX_RECENT_EVENTS)),
        }
    }

    /// Subscribe to the broadcast channel.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }

    /// Broadcast an event to all current subscribers and store it in the
    /// ring buffer.
    pub fn broadcast(&self, topic: &str, payload: serde_json::Value) {
        let event = Event::new(topic, payload);

        {
            let mut recent = self.recent.write();
            if recent.len() >= MAX_RECENT_EVENTS {
                recent.pop_back();
            }
            recent.push_front(event.clone());
        }

        // Ignore send errors (no subscribers).
        let _ = self.tx.send(event);
    }

    /// Return the `n` most recent events (newest first).
    pub fn recent_events(&self, n: usize) -> Vec<Event> {
        let recent = self.recent.read();
        recent.iter().take(n).cloned().collect()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

impl EventPublisher for EventBus {
    fn publish(&self, topic: &str, payload: serde_json::Value) -> Result<()> {
        self.broadcast(topic, payload);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn broadcast_and_receive() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        bus.broadcast(TOPIC_CONVERTED, json!({"id": "abc"}));

        let event = rx.try_recv().unwrap();
        assert_eq!(event.topic, "converted");
        assert_eq!(event.payload["id"], "abc");
    }

    #[test]
    fn publish_goes_through_bus() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();
        let publisher: &dyn EventPublisher = &bus;

        publisher
            .publish(TOPIC_CONVERTED, json!({"duration_seconds": 12}))
            .unwrap();

        let event = rx.try_recv().unwrap();
        assert_eq!(event.payload["duration_seconds"], 12);
    }

    #[test]
    fn recent_events_capped() {
        let bus = EventBus::new(256);
        for i in 0..150 {
            bus.broadcast(TOPIC_CONVERTED, json!({"n": i}));
        }

        let recent = bus.recent_events(200);
        assert_eq!(recent.len(), MAX_RECENT_EVENTS);
        // Newest first
        assert_eq!(recent[0].payload["n"], 149);
    }

    #[test]
    fn no_subscribers_does_not_fail() {
        let bus = EventBus::new(4);
        assert!(bus.publish(TOPIC_CONVERTED, json!({})).is_ok());
        assert_eq!(bus.recent_events(10).len(), 1);
    }

    #[test]
    fn event_serde_roundtrip() {
        let event = Event::new(TOPIC_CONVERTED, json!({"size_mb": 1.5}));
        let json = serde_json::to_string(&event).unwrap();
        let back: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, event.id);
        assert_eq!(back.topic, event.topic);
    }

    #[test]
    fn default_event_bus() {
        let bus = EventBus::default();
        assert!(bus.recent_events(10).is_empty());
    }
}
