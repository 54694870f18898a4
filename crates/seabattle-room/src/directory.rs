//! The room directory: persisted game records.
//!
//! Rooms in the registry are transient. The directory is the durable side:
//! which games exist, which are still open, who played, who won. The
//! server only reaches it through [`RoomDirectory`].

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use seabattle_protocol::{PlayerId, RoomId};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::DirectoryError;

/// Status of a game record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoomStatus {
    /// Open for players to join.
    Free,
    /// Both seats taken.
    InGame,
    /// Finished with a winner.
    Ended,
}

/// A game record as stored in the directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomRecord {
    pub id: RoomId,
    pub status: RoomStatus,
    pub players: Vec<PlayerId>,
    pub winner: Option<PlayerId>,
}

impl RoomRecord {
    pub fn new(id: RoomId) -> Self {
        Self {
            id,
            status: RoomStatus::Free,
            players: Vec::new(),
            winner: None,
        }
    }
}

/// Access to persisted game records.
pub trait RoomDirectory: Send + Sync + 'static {
    /// Ids of all rooms with status [`RoomStatus::Free`].
    fn list_open_rooms(&self)
    -> impl Future<Output = Result<Vec<RoomId>, DirectoryError>> + Send;

    /// Fetches one record.
    ///
    /// # Errors
    /// [`DirectoryError::NotFound`] if no record has this id.
    fn get_room(
        &self,
        room: &RoomId,
    ) -> impl Future<Output = Result<RoomRecord, DirectoryError>> + Send;

    /// Records that `player` takes a seat in `room`. Idempotent.
    fn add_player(
        &self,
        room: &RoomId,
        player: &PlayerId,
    ) -> impl Future<Output = Result<(), DirectoryError>> + Send;

    fn mark_room_status(
        &self,
        room: &RoomId,
        status: RoomStatus,
    ) -> impl Future<Output = Result<(), DirectoryError>> + Send;

    /// Removes the record of an abandoned game.
    fn delete_room(&self, room: &RoomId)
    -> impl Future<Output = Result<(), DirectoryError>> + Send;

    fn record_winner(
        &self,
        room: &RoomId,
        winner: &PlayerId,
    ) -> impl Future<Output = Result<(), DirectoryError>> + Send;
}

impl<T: RoomDirectory> RoomDirectory for Arc<T> {
    fn list_open_rooms(&self) -> impl Future<Output = Result<Vec<RoomId>, DirectoryError>> + Send {
        (**self).list_open_rooms()
    }

    fn get_room(
        &self,
        room: &RoomId,
    ) -> impl Future<Output = Result<RoomRecord, DirectoryError>> + Send {
        (**self).get_room(room)
    }

    fn add_player(
        &self,
        room: &RoomId,
        player: &PlayerId,
    ) -> impl Future<Output = Result<(), DirectoryError>> + Send {
        (**self).add_player(room, player)
    }

    fn mark_room_status(
        &self,
        room: &RoomId,
        status: RoomStatus,
    ) -> impl Future<Output = Result<(), DirectoryError>> + Send {
        (**self).mark_room_status(room, status)
    }

    fn delete_room(&self, room: &RoomId) -> impl Future<Output = Result<(), DirectoryError>> + Send {
        (**self).delete_room(room)
    }

    fn record_winner(
        &self,
        room: &RoomId,
        winner: &PlayerId,
    ) -> impl Future<Output = Result<(), DirectoryError>> + Send {
        (**self).record_winner(room, winner)
    }
}

/// A process-local [`RoomDirectory`], used by the demo server and tests.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    records: Mutex<BTreeMap<RoomId, RoomRecord>>,
    offline: AtomicBool,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a free room. Replaces any record with the same id.
    pub async fn create_room(&self, id: RoomId) {
        tracing::debug!(room_id = %id, "room record created");
        self.records.lock().await.insert(id.clone(), RoomRecord::new(id));
    }

    /// Returns the unfinished game `player` holds a seat in, if any.
    pub async fn active_room_for(
        &self,
        player: &PlayerId,
    ) -> Result<Option<RoomId>, DirectoryError> {
        self.check_online()?;
        let records = self.records.lock().await;
        Ok(records
            .values()
            .find(|r| r.status != RoomStatus::Ended && r.players.contains(player))
            .map(|r| r.id.clone()))
    }

    /// Makes every subsequent call fail with [`DirectoryError::Unavailable`]
    /// (`false`) or succeed again (`true`).
    pub fn set_available(&self, available: bool) {
        self.offline.store(!available, Ordering::Relaxed);
    }

    fn check_online(&self) -> Result<(), DirectoryError> {
        if self.offline.load(Ordering::Relaxed) {
            return Err(DirectoryError::Unavailable("in-memory directory is offline".into()));
        }
        Ok(())
    }

    async fn update(
        &self,
        room: &RoomId,
        apply: impl FnOnce(&mut RoomRecord),
    ) -> Result<(), DirectoryError> {
        self.check_online()?;
        let mut records = self.records.lock().await;
        let record = records
            .get_mut(room)
            .ok_or_else(|| DirectoryError::NotFound(room.clone()))?;
        apply(record);
        Ok(())
    }
}

impl RoomDirectory for InMemoryDirectory {
    async fn list_open_rooms(&self) -> Result<Vec<RoomId>, DirectoryError> {
        self.check_online()?;
        let records = self.records.lock().await;
        Ok(records
            .values()
            .filter(|r| r.status == RoomStatus::Free)
            .map(|r| r.id.clone())
            .collect())
    }

    async fn get_room(&self, room: &RoomId) -> Result<RoomRecord, DirectoryError> {
        self.check_online()?;
        self.records
            .lock()
            .await
            .get(room)
            .cloned()
            .ok_or_else(|| DirectoryError::NotFound(room.clone()))
    }

    async fn add_player(&self, room: &RoomId, player: &PlayerId) -> Result<(), DirectoryError> {
        self.update(room, |record| {
            if !record.players.contains(player) {
                record.players.push(player.clone());
            }
        })
        .await
    }

    async fn mark_room_status(
        &self,
        room: &RoomId,
        status: RoomStatus,
    ) -> Result<(), DirectoryError> {
        self.update(room, |record| record.status = status).await
    }

    async fn delete_room(&self, room: &RoomId) -> Result<(), DirectoryError> {
        self.check_online()?;
        self.records
            .lock()
            .await
            .remove(room)
            .map(|_| ())
            .ok_or_else(|| DirectoryError::NotFound(room.clone()))
    }

    async fn record_winner(&self, room: &RoomId, winner: &PlayerId) -> Result<(), DirectoryError> {
        self.update(room, |record| record.winner = Some(winner.clone()))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rid(s: &str) -> RoomId {
        RoomId::new(s)
    }

    #[tokio::test]
    async fn test_list_open_rooms_only_free() {
        let dir = InMemoryDirectory::new();
        dir.create_room(rid("a")).await;
        dir.create_room(rid("b")).await;
        dir.create_room(rid("c")).await;
        dir.mark_room_status(&rid("b"), RoomStatus::InGame).await.unwrap();

        assert_eq!(dir.list_open_rooms().await.unwrap(), vec![rid("a"), rid("c")]);
    }

    #[tokio::test]
    async fn test_get_missing_room_is_not_found() {
        let dir = InMemoryDirectory::new();
        assert!(matches!(
            dir.get_room(&rid("nope")).await,
            Err(DirectoryError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_add_player_is_idempotent() {
        let dir = InMemoryDirectory::new();
        dir.create_room(rid("a")).await;
        let alice = PlayerId::new("alice");
        dir.add_player(&rid("a"), &alice).await.unwrap();
        dir.add_player(&rid("a"), &alice).await.unwrap();

        assert_eq!(dir.get_room(&rid("a")).await.unwrap().players, vec![alice]);
    }

    #[tokio::test]
    async fn test_active_room_ignores_ended_games() {
        let dir = InMemoryDirectory::new();
        let alice = PlayerId::new("alice");
        dir.create_room(rid("a")).await;
        dir.add_player(&rid("a"), &alice).await.unwrap();
        assert_eq!(dir.active_room_for(&alice).await.unwrap(), Some(rid("a")));

        dir.mark_room_status(&rid("a"), RoomStatus::Ended).await.unwrap();
        dir.record_winner(&rid("a"), &alice).await.unwrap();
        assert_eq!(dir.active_room_for(&alice).await.unwrap(), None);
        assert_eq!(dir.get_room(&rid("a")).await.unwrap().winner, Some(alice));
    }

    #[tokio::test]
    async fn test_delete_room() {
        let dir = InMemoryDirectory::new();
        dir.create_room(rid("a")).await;
        dir.delete_room(&rid("a")).await.unwrap();

        assert!(dir.list_open_rooms().await.unwrap().is_empty());
        assert!(matches!(
            dir.delete_room(&rid("a")).await,
            Err(DirectoryError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_offline_directory_is_unavailable() {
        let dir = InMemoryDirectory::new();
        dir.set_available(false);
        assert!(matches!(
            dir.list_open_rooms().await,
            Err(DirectoryError::Unavailable(_))
        ));
    }
}
