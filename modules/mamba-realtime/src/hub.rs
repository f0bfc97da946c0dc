use dashmap::DashMap;
use tokio::sync::broadcast;
use tracing::debug;
use uuid::Uuid;

use crate::events::RealtimeEvent;

/// A named broadcast channel that zero or more subscribers may join.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Topic {
    IncidentGlobal,
    Hospital(Uuid),
    Responder(String),
    Stock(Uuid),
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Topic::IncidentGlobal => write!(f, "incident-global"),
            Topic::Hospital(id) => write!(f, "hospital:{id}"),
            Topic::Responder(id) => write!(f, "responder:{id}"),
            Topic::Stock(id) => write!(f, "stock:{id}"),
        }
    }
}

impl Topic {
    /// Parse a topic name as sent by WebSocket clients in join/leave
    /// messages. Unknown shapes are rejected rather than silently joined.
    pub fn parse(name: &str) -> Option<Topic> {
        if name == "incident-global" {
            return Some(Topic::IncidentGlobal);
        }
        if let Some(id) = name.strip_prefix("hospital:") {
            return id.parse().ok().map(Topic::Hospital);
        }
        if let Some(id) = name.strip_prefix("responder:") {
            if id.is_empty() {
                return None;
            }
            return Some(Topic::Responder(id.to_string()));
        }
        if let Some(id) = name.strip_prefix("stock:") {
            return id.parse().ok().map(Topic::Stock);
        }
        None
    }
}

const DEFAULT_CAPACITY: usize = 256;

/// Topic-scoped fan-out over tokio broadcast channels. Publishing never
/// waits on subscriber processing; a lagging subscriber drops the oldest
/// frames, and a subscriber joining after an event simply misses it.
pub struct BroadcastHub {
    topics: DashMap<Topic, broadcast::Sender<RealtimeEvent>>,
    capacity: usize,
}

impl Default for BroadcastHub {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl BroadcastHub {
    pub fn new(capacity: usize) -> Self {
        Self {
            topics: DashMap::new(),
            capacity,
        }
    }

    /// Join a topic. The channel is created on first join.
    pub fn subscribe(&self, topic: &Topic) -> broadcast::Receiver<RealtimeEvent> {
        self.topics
            .entry(topic.clone())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    /// Publish to a topic's current subscribers. Returns how many were
    /// connected; zero is a normal outcome, not an error.
    pub fn publish(&self, topic: &Topic, event: RealtimeEvent) -> usize {
        let Some(sender) = self.topics.get(topic) else {
            debug!(topic = %topic, event = event.event_type(), "No subscribers on topic");
            return 0;
        };
        match sender.send(event) {
            Ok(n) => n,
            Err(_) => 0,
        }
    }

    pub fn subscriber_count(&self, topic: &Topic) -> usize {
        self.topics
            .get(topic)
            .map(|s| s.receiver_count())
            .unwrap_or(0)
    }
}
