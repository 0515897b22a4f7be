//! Per-room fan-out of chat events to SSE subscribers.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use medley_common::sync::lock;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::events::ChatEvent;

/// Serialized event frame shared by every subscriber of a broadcast.
pub type Frame = Arc<str>;

struct Subscriber {
    id: u64,
    username: String,
    tx: mpsc::Sender<Frame>,
}

/// Handle returned by [`SseHub::subscribe`].
pub struct Subscription {
    pub id: u64,
    pub room_id: String,
    pub username: String,
    pub rx: mpsc::Receiver<Frame>,
}

pub struct SseHub {
    rooms: Mutex<HashMap<String, Vec<Subscriber>>>,
    next_id: AtomicU64,
    capacity: usize,
}

impl SseHub {
    pub fn new(capacity: usize) -> Self {
        Self {
            rooms: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            capacity: capacity.max(1),
        }
    }

    pub fn subscribe(&self, room_id: &str, username: &str) -> Subscription {
        let (tx, rx) = mpsc::channel(self.capacity);
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        lock(&self.rooms)
            .entry(room_id.to_string())
            .or_default()
            .push(Subscriber { id, username: username.to_string(), tx });
        debug!(room_id, username, id, "sse subscriber added");
        Subscription { id, room_id: room_id.to_string(), username: username.to_string(), rx }
    }

    pub fn unsubscribe(&self, room_id: &str, id: u64) {
        let mut rooms = lock(&self.rooms);
        if let Some(subs) = rooms.get_mut(room_id) {
            subs.retain(|s| s.id != id);
            if subs.is_empty() {
                rooms.remove(room_id);
            }
        }
    }

    /// Deliver `event` to everyone in the room except `exclude`.
    /// Subscribers whose queue is full or closed are dropped.
    /// Returns the number of subscribers the frame was queued for.
    pub fn broadcast(&self, room_id: &str, event: &ChatEvent, exclude: Option<&str>) -> usize {
        let frame: Frame = match serde_json::to_string(event) {
            Ok(json) => json.into(),
            Err(e) => {
                warn!("failed to serialize chat event: {e}");
                return 0;
            }
        };

        let mut rooms = lock(&self.rooms);
        let Some(subs) = rooms.get_mut(room_id) else {
            return 0;
        };

        let mut delivered = 0;
        subs.retain(|sub| {
            if exclude == Some(sub.username.as_str()) {
                return true;
            }
            match sub.tx.try_send(frame.clone()) {
                Ok(()) => {
                    delivered += 1;
                    true
                }
                Err(mpsc::error::TrySendError::Full(_)) => {
                    warn!(room_id, username = %sub.username, "sse queue full, dropping subscriber");
                    false
                }
                Err(mpsc::error::TrySendError::Closed(_)) => false,
            }
        });
        if subs.is_empty() {
            rooms.remove(room_id);
        }
        delivered
    }

    pub fn subscriber_count(&self, room_id: &str) -> usize {
        lock(&self.rooms).get(room_id).map_or(0, Vec::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ping() -> ChatEvent {
        ChatEvent::Ping
    }

    #[tokio::test]
    async fn test_broadcast_reaches_room_members_only() {
        let hub = SseHub::new(8);
        let mut a = hub.subscribe("general", "alice");
        let mut b = hub.subscribe("general", "bobby");
        let mut c = hub.subscribe("other", "carol");

        assert_eq!(hub.broadcast("general", &ping(), None), 2);
        assert_eq!(&*a.rx.recv().await.unwrap(), r#"{"type":"ping"}"#);
        assert!(b.rx.recv().await.is_some());
        assert!(c.rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_broadcast_skips_excluded_user() {
        let hub = SseHub::new(8);
        let mut a = hub.subscribe("general", "alice");
        let mut b = hub.subscribe("general", "bobby");

        let event = ChatEvent::UserLeft { username: "alice".into() };
        assert_eq!(hub.broadcast("general", &event, Some("alice")), 1);
        assert!(a.rx.try_recv().is_err());
        assert!(b.rx.recv().await.unwrap().contains("user_left"));
    }

    #[test]
    fn test_full_queue_drops_subscriber() {
        let hub = SseHub::new(1);
        let _slow = hub.subscribe("general", "slow");
        assert_eq!(hub.broadcast("general", &ping(), None), 1);
        assert_eq!(hub.broadcast("general", &ping(), None), 0);
        assert_eq!(hub.subscriber_count("general"), 0);
    }

    #[test]
    fn test_closed_receiver_is_pruned() {
        let hub = SseHub::new(4);
        let sub = hub.subscribe("general", "alice");
        drop(sub);
        assert_eq!(hub.broadcast("general", &ping(), None), 0);
        assert_eq!(hub.subscriber_count("general"), 0);
    }

    #[test]
    fn test_unsubscribe_removes_only_that_handle() {
        let hub = SseHub::new(4);
        let first = hub.subscribe("general", "alice");
        let _second = hub.subscribe("general", "alice");
        hub.unsubscribe("general", first.id);
        assert_eq!(hub.subscriber_count("general"), 1);
    }
}
