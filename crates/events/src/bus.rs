//! The event bus.
//!
//! One `tokio::sync::broadcast` channel carries every event; each
//! [`Subscription`] filters it down to the rooms it has joined. Room
//! membership is counted on the bus so `publish` can report how many
//! sessions an event reached.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, trace, warn};
use uuid::Uuid;

use crate::room::Room;

/// Events buffered per subscription before a slow one starts lagging.
pub const DEFAULT_CAPACITY: usize = 256;

/// A published event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    /// Unique event id.
    pub id: Uuid,
    /// Key of the room the event was published to.
    pub room: String,
    /// Event name, e.g. `notification` or `appointment:created`.
    pub name: String,
    /// Event body.
    pub payload: Value,
    /// When the event was published.
    pub emitted_at: DateTime<Utc>,
}

#[derive(Debug)]
struct Shared {
    sender: broadcast::Sender<Arc<Event>>,
    members: Mutex<HashMap<String, usize>>,
}

/// Room-based broadcast. Cheap to clone; clones share the channel.
#[derive(Debug, Clone)]
pub struct EventBus {
    shared: Arc<Shared>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    /// A bus with [`DEFAULT_CAPACITY`].
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// A bus buffering up to `capacity` events per subscription.
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            shared: Arc::new(Shared {
                sender,
                members: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Opens a subscription that has joined no room yet.
    pub fn subscribe(&self) -> Subscription {
        Subscription {
            receiver: self.shared.sender.subscribe(),
            rooms: HashSet::new(),
            shared: Arc::clone(&self.shared),
        }
    }

    /// Number of subscriptions currently in `room`.
    pub fn members(&self, room: &Room) -> usize {
        self.shared
            .members
            .lock()
            .get(&room.key())
            .copied()
            .unwrap_or(0)
    }

    /// Publishes an event to a room and returns how many subscriptions were
    /// in it. An empty room is not an error; the event is simply dropped.
    pub fn publish(&self, room: &Room, name: impl Into<String>, payload: Value) -> usize {
        let key = room.key();
        let name = name.into();
        let audience = self.shared.members.lock().get(&key).copied().unwrap_or(0);
        if audience == 0 {
            trace!(room = %key, event = %name, "No subscribers; event dropped");
            return 0;
        }

        let event = Event {
            id: Uuid::new_v4(),
            room: key,
            name,
            payload,
            emitted_at: Utc::now(),
        };
        debug!(room = %event.room, event = %event.name, id = %event.id, audience, "Publishing event");
        match self.shared.sender.send(Arc::new(event)) {
            Ok(_) => audience,
            Err(_) => 0,
        }
    }
}

/// One session's view of the bus.
///
/// Only events for joined rooms are yielded. Dropping the subscription
/// leaves every room.
#[derive(Debug)]
pub struct Subscription {
    receiver: broadcast::Receiver<Arc<Event>>,
    rooms: HashSet<String>,
    shared: Arc<Shared>,
}

impl Subscription {
    /// Joins a room. Joining twice is a no-op.
    pub fn join(&mut self, room: &Room) {
        let key = room.key();
        if self.rooms.insert(key.clone()) {
            *self.shared.members.lock().entry(key).or_insert(0) += 1;
        }
    }

    /// Joins every room in `rooms`.
    pub fn join_all<'r>(&mut self, rooms: impl IntoIterator<Item = &'r Room>) {
        for room in rooms {
            self.join(room);
        }
    }

    /// Leaves a room. Leaving a room never joined is a no-op.
    pub fn leave(&mut self, room: &Room) {
        let key = room.key();
        if self.rooms.remove(&key) {
            release(&self.shared, &key);
        }
    }

    /// Returns `true` if the subscription has joined `room`.
    pub fn is_member(&self, room: &Room) -> bool {
        self.rooms.contains(&room.key())
    }

    /// Waits for the next event in a joined room.
    ///
    /// Returns `None` once the bus is gone. A subscription that fell behind
    /// skips the events it missed.
    pub async fn recv(&mut self) -> Option<Arc<Event>> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if self.rooms.contains(&event.room) => return Some(event),
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Subscription lagged; events skipped");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// The next already-published event in a joined room, without waiting.
    pub fn try_recv(&mut self) -> Option<Arc<Event>> {
        use tokio::sync::broadcast::error::TryRecvError;
        loop {
            match self.receiver.try_recv() {
                Ok(event) if self.rooms.contains(&event.room) => return Some(event),
                Ok(_) => continue,
                Err(TryRecvError::Lagged(skipped)) => {
                    warn!(skipped, "Subscription lagged; events skipped");
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => return None,
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        for key in self.rooms.drain() {
            release(&self.shared, &key);
        }
    }
}

fn release(shared: &Shared, key: &str) {
    let mut members = shared.members.lock();
    if let Some(count) = members.get_mut(key) {
        *count -= 1;
        if *count == 0 {
            members.remove(key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hms_persistence::schema::Role;
    use serde_json::json;

    #[test]
    fn test_publish_to_empty_room_reaches_nobody() {
        let bus = EventBus::new();
        let _idle = bus.subscribe();
        assert_eq!(bus.publish(&Room::Admin, "bill:overdue", json!({})), 0);
    }

    #[test]
    fn test_only_joined_rooms_are_delivered() {
        let bus = EventBus::new();
        let mut doctor = bus.subscribe();
        doctor.join(&Room::Role(Role::Doctor));
        let mut admin = bus.subscribe();
        admin.join(&Room::Admin);

        assert_eq!(bus.publish(&Room::Admin, "inventory:low", json!({"item": "Gauze"})), 1);
        assert_eq!(bus.publish(&Room::Role(Role::Doctor), "availability:changed", json!({})), 1);

        assert_eq!(admin.try_recv().unwrap().name, "inventory:low");
        assert!(admin.try_recv().is_none());
        assert_eq!(doctor.try_recv().unwrap().name, "availability:changed");
    }

    #[test]
    fn test_membership_counts_follow_join_leave_and_drop() {
        let bus = EventBus::new();
        let room = Room::User("u1".to_string());
        let mut first = bus.subscribe();
        let mut second = bus.subscribe();
        first.join(&room);
        first.join(&room);
        second.join(&room);
        assert_eq!(bus.members(&room), 2);

        first.leave(&room);
        assert_eq!(bus.members(&room), 1);
        assert!(!first.is_member(&room));

        drop(second);
        assert_eq!(bus.members(&room), 0);
        assert_eq!(bus.publish(&room, "ping", json!(null)), 0);
    }

    #[test]
    fn test_lagging_subscription_skips_missed_events() {
        let bus = EventBus::with_capacity(2);
        let mut session = bus.subscribe();
        session.join(&Room::Admin);
        for i in 0..5 {
            bus.publish(&Room::Admin, format!("tick:{}", i), json!(i));
        }
        assert_eq!(session.try_recv().unwrap().name, "tick:3");
        assert_eq!(session.try_recv().unwrap().name, "tick:4");
        assert!(session.try_recv().is_none());
    }

    #[test]
    fn test_event_serializes_camel_case() {
        let event = Event {
            id: Uuid::nil(),
            room: "admin".to_string(),
            name: "ping".to_string(),
            payload: json!({}),
            emitted_at: Utc::now(),
        };
        let value = serde_json::to_value(&event).unwrap();
        assert!(value.get("emittedAt").is_some());
    }
}
