//! Topic-based event bus implementation.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use strum::{EnumCount, IntoEnumIterator};
use tokio::sync::broadcast;

use super::types::IntentEvent;

/// Topics for event routing
#[derive(
    Debug,
    Clone,
    Copy,
    Hash,
    Eq,
    PartialEq,
    Serialize,
    Deserialize,
    strum::EnumCount,
    strum::EnumIter,
)]
pub enum Topic {
    /// Some player's commitment changed
    PlayerUpdated,
    /// Mining revealed new tiles
    MinedTilesUpdated,
    /// A battle resolved; win counts may have changed
    BattleUpdated,
    /// Intent lifecycle transitions
    Intent,
}

/// Event wrapper that carries the topic and typed event.
///
/// The first three carry no payload: subscribers re-read state through the
/// handle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    PlayerUpdated,
    MinedTilesUpdated,
    BattleUpdated,
    Intent(IntentEvent),
}

impl Event {
    pub fn topic(&self) -> Topic {
        match self {
            Event::PlayerUpdated => Topic::PlayerUpdated,
            Event::MinedTilesUpdated => Topic::MinedTilesUpdated,
            Event::BattleUpdated => Topic::BattleUpdated,
            Event::Intent(_) => Topic::Intent,
        }
    }
}

/// Topic-based event bus
///
/// One broadcast channel per topic. Subscribers only receive events for the
/// topic they asked for and unsubscribe by dropping the receiver.
#[derive(Clone)]
pub struct EventBus {
    channels: Arc<[broadcast::Sender<Event>; Topic::COUNT]>,
}

impl EventBus {
    /// Creates a new event bus with default capacity for each topic
    pub fn new() -> Self {
        Self::with_capacity(100)
    }

    /// Creates a new event bus with specified capacity per topic
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            channels: Arc::new(std::array::from_fn(|_| broadcast::channel(capacity).0)),
        }
    }

    fn channel(&self, topic: Topic) -> &broadcast::Sender<Event> {
        &self.channels[topic as usize]
    }

    /// Publish an event to its corresponding topic
    pub fn publish(&self, event: Event) {
        let topic = event.topic();
        if self.channel(topic).send(event).is_err() {
            // No subscribers for this topic - this is normal, not an error
            tracing::trace!("No subscribers for topic {:?}", topic);
        }
    }

    /// Subscribe to a specific topic
    pub fn subscribe(&self, topic: Topic) -> broadcast::Receiver<Event> {
        self.channel(topic).subscribe()
    }

    /// Subscribe to every topic at once.
    pub fn subscribe_all(&self) -> Vec<(Topic, broadcast::Receiver<Event>)> {
        Topic::iter()
            .map(|topic| (topic, self.subscribe(topic)))
            .collect()
    }

    pub fn subscriber_count(&self, topic: Topic) -> usize {
        self.channel(topic).receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
