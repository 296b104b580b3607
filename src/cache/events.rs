//! Cache Events Module
//!
//! Fire-and-forget event feed built on a tokio broadcast channel.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use tokio::sync::broadcast;

/// Buffered events per subscriber before it starts lagging.
pub const EVENT_FEED_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheEventType {
    Hit,
    Miss,
    Put,
    Eviction,
    Expiration,
    Invalidation,
    Cleanup,
    Warming,
}

// == Cache Event ==
/// A single notification published by the engine.
#[derive(Debug, Clone, Serialize)]
pub struct CacheEvent {
    #[serde(rename = "type")]
    pub event_type: CacheEventType,
    pub key: String,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
}

impl CacheEvent {
    pub fn new(event_type: CacheEventType, key: impl Into<String>) -> Self {
        Self {
            event_type,
            key: key.into(),
            timestamp: Utc::now(),
            metadata: None,
        }
    }

    /// Attaches one metadata field.
    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.metadata
            .get_or_insert_with(Map::new)
            .insert(name.to_string(), value.into());
        self
    }
}

// == Event Feed ==
/// Multi-subscriber publisher.
///
/// Publishing never waits on subscribers; with no subscriber attached the
/// event is dropped. Closing drops the sender so receivers observe
/// `RecvError::Closed`.
#[derive(Debug)]
pub struct EventFeed {
    sender: Option<broadcast::Sender<CacheEvent>>,
}

impl Default for EventFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl EventFeed {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_FEED_CAPACITY);
        Self {
            sender: Some(sender),
        }
    }

    pub fn publish(&self, event: CacheEvent) {
        if let Some(sender) = &self.sender {
            // Err only means nobody is listening
            let _ = sender.send(event);
        }
    }

    /// Returns a new receiver. On a closed feed the receiver is already closed.
    pub fn subscribe(&self) -> broadcast::Receiver<CacheEvent> {
        match &self.sender {
            Some(sender) => sender.subscribe(),
            None => broadcast::channel(1).1,
        }
    }

    pub fn close(&mut self) {
        self.sender = None;
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::broadcast::error::{RecvError, TryRecvError};

    #[test]
    fn test_event_metadata() {
        let event = CacheEvent::new(CacheEventType::Put, "k")
            .with("size", 120)
            .with("ttl", 300);

        let metadata = event.metadata.unwrap();
        assert_eq!(metadata["size"], 120);
        assert_eq!(metadata["ttl"], 300);
    }

    #[test]
    fn test_event_serializes_type_field() {
        let event = CacheEvent::new(CacheEventType::Eviction, "k");
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "eviction");
        assert_eq!(json["key"], "k");
        assert!(json.get("metadata").is_none());
    }

    #[test]
    fn test_publish_without_subscribers_is_dropped() {
        let feed = EventFeed::new();
        feed.publish(CacheEvent::new(CacheEventType::Hit, "early"));

        let mut rx = feed.subscribe();
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));

        feed.publish(CacheEvent::new(CacheEventType::Hit, "late"));
        assert_eq!(rx.try_recv().unwrap().key, "late");
    }

    #[test]
    fn test_multiple_subscribers() {
        let feed = EventFeed::new();
        let mut a = feed.subscribe();
        let mut b = feed.subscribe();

        feed.publish(CacheEvent::new(CacheEventType::Miss, "k"));

        assert_eq!(a.try_recv().unwrap().event_type, CacheEventType::Miss);
        assert_eq!(b.try_recv().unwrap().event_type, CacheEventType::Miss);
    }

    #[tokio::test]
    async fn test_close_ends_subscriptions() {
        let mut feed = EventFeed::new();
        let mut rx = feed.subscribe();

        feed.close();

        assert!(feed.is_closed());
        assert!(matches!(rx.recv().await, Err(RecvError::Closed)));
        assert!(matches!(feed.subscribe().recv().await, Err(RecvError::Closed)));
    }
}
