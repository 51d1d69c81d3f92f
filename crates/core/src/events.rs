//! Per-room event bus
//!
//! Each room gets its own broadcast topic. Publishing is synchronous;
//! subscribers hold a [`broadcast::Receiver`] and drain it from
//! whatever loop drives their surface. Events carry ids, not whole
//! records, so stale subscribers re-read state instead of acting on
//! old snapshots.

use std::collections::HashMap;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

use crate::models::{Phase, RoomStatus};

/// Capacity of each room's broadcast channel. Slow subscribers that
/// lag past this many events see a `Lagged` error and must re-sync.
const CHANNEL_CAPACITY: usize = 256;

/// Something that happened inside a room
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RoomEvent {
    ParticipantJoined { user_id: String },
    ParticipantLeft { user_id: String },
    ParticipantKicked { user_id: String },
    HostChanged { new_host_id: String },
    StatusChanged { status: RoomStatus },
    PhaseChanged { phase: Phase },
    SpeakerChanged { user_id: Option<String>, round_number: u32 },
    QuestionAdvanced { question_idx: usize },
    AnswerSubmitted { user_id: String, question_idx: usize },
    MessagePosted { message_id: String },
    RoomClosed,
}

/// Fan-out hub holding one broadcast sender per live room
pub struct EventBus {
    topics: Mutex<HashMap<String, broadcast::Sender<RoomEvent>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            topics: Mutex::new(HashMap::new()),
        }
    }

    /// Subscribe to one room's events
    pub fn subscribe(&self, room_id: &str) -> broadcast::Receiver<RoomEvent> {
        let mut topics = self.topics.lock().expect("event bus lock poisoned");
        topics
            .entry(room_id.to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe()
    }

    /// Publish an event to a room's subscribers. A room nobody watches
    /// drops the event on the floor.
    pub fn publish(&self, room_id: &str, event: RoomEvent) {
        let topics = self.topics.lock().expect("event bus lock poisoned");
        if let Some(sender) = topics.get(room_id) {
            // send only fails when every receiver is gone
            if sender.send(event).is_err() {
                debug!(room_id, "published to room with no live subscribers");
            }
        }
    }

    /// Drop a room's topic once the room is gone
    pub fn remove(&self, room_id: &str) {
        let mut topics = self.topics.lock().expect("event bus lock poisoned");
        topics.remove(room_id);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscribers_receive_published_events() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe("ROOM01");

        bus.publish(
            "ROOM01",
            RoomEvent::ParticipantJoined {
                user_id: "u1".into(),
            },
        );

        match rx.try_recv().unwrap() {
            RoomEvent::ParticipantJoined { user_id } => assert_eq!(user_id, "u1"),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn topics_are_isolated_per_room() {
        let bus = EventBus::new();
        let mut rx_a = bus.subscribe("ROOMAA");
        let mut rx_b = bus.subscribe("ROOMBB");

        bus.publish("ROOMAA", RoomEvent::RoomClosed);

        assert!(rx_a.try_recv().is_ok());
        assert!(rx_b.try_recv().is_err());
    }

    #[test]
    fn publish_without_subscribers_is_silent() {
        let bus = EventBus::new();
        bus.publish("NOBODY", RoomEvent::RoomClosed);

        bus.subscribe("GONE01");
        bus.remove("GONE01");
        bus.publish("GONE01", RoomEvent::RoomClosed);
    }
}
