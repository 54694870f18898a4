//! Cross-process broadcast.
//!
//! Room state is authoritative only inside the process that holds it.
//! When two players of one room are connected to different processes,
//! frames broadcast by one process reach the other through a [`PubSub`]
//! channel named after the room. Delivery is best-effort: at most once,
//! no ordering across subscribers.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use seabattle_protocol::RoomId;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::PubSubError;

/// Buffered frames per channel before slow subscribers start lagging.
const CHANNEL_CAPACITY: usize = 64;

/// A publish/subscribe broker.
///
/// Methods are synchronous so the broker can be shared as
/// `Arc<dyn PubSub>`.
pub trait PubSub: Send + Sync + 'static {
    /// Publishes `payload` on `channel`, returning how many subscribers
    /// received it.
    fn publish(&self, channel: &str, payload: Vec<u8>) -> Result<usize, PubSubError>;

    /// Subscribes to `channel`, creating it if needed.
    fn subscribe(&self, channel: &str) -> broadcast::Receiver<Vec<u8>>;

    /// Drops `channel` once it has no subscribers left.
    fn unsubscribe(&self, channel: &str);
}

/// Channel name for a room.
pub fn room_channel(room: &RoomId) -> String {
    format!("seabattle:room:{room}")
}

/// One text frame broadcast to a room, tagged with the process that sent it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayFrame {
    pub origin: String,
    pub text: String,
}

/// An in-process [`PubSub`] over tokio broadcast channels.
#[derive(Debug, Default)]
pub struct LocalPubSub {
    channels: Mutex<HashMap<String, broadcast::Sender<Vec<u8>>>>,
}

impl LocalPubSub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live channels.
    pub fn channel_count(&self) -> usize {
        self.channels
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl PubSub for LocalPubSub {
    fn publish(&self, channel: &str, payload: Vec<u8>) -> Result<usize, PubSubError> {
        let channels = self.channels.lock().unwrap_or_else(PoisonError::into_inner);
        match channels.get(channel) {
            // A send error only means nobody is listening right now.
            Some(sender) => Ok(sender.send(payload).unwrap_or(0)),
            None => Ok(0),
        }
    }

    fn subscribe(&self, channel: &str) -> broadcast::Receiver<Vec<u8>> {
        let mut channels = self.channels.lock().unwrap_or_else(PoisonError::into_inner);
        channels
            .entry(channel.to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe()
    }

    fn unsubscribe(&self, channel: &str) {
        let mut channels = self.channels.lock().unwrap_or_else(PoisonError::into_inner);
        if channels
            .get(channel)
            .is_some_and(|sender| sender.receiver_count() == 0)
        {
            channels.remove(channel);
        }
    }
}
