//! Board persistence across disconnects.
//!
//! When a player drops mid-game their board lives on in an external
//! key-value cache, keyed by identity. On reconnect the board is decoded
//! back and handed to the new session. Only [`ResumeCache`] knows the
//! encoding; everybody else deals in [`Board`] values.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use seabattle_board::{Board, BoardSnapshot};
use seabattle_protocol::{Codec, JsonCodec, PlayerId};
use tokio::sync::Mutex;

use crate::CacheError;

const KEY_PREFIX: &str = "seabattle:board:";

/// A minimal key-value store contract.
pub trait CacheStore: Send + Sync + 'static {
    /// Returns the stored value, if any.
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<Vec<u8>>, CacheError>> + Send;

    /// Stores `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: Vec<u8>)
    -> impl Future<Output = Result<(), CacheError>> + Send;

    /// Deletes every key in `keys`, returning how many existed.
    fn delete_many(&self, keys: &[String])
    -> impl Future<Output = Result<usize, CacheError>> + Send;
}

impl<T: CacheStore> CacheStore for Arc<T> {
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<Vec<u8>>, CacheError>> + Send {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: Vec<u8>) -> impl Future<Output = Result<(), CacheError>> + Send {
        (**self).set(key, value)
    }

    fn delete_many(&self, keys: &[String]) -> impl Future<Output = Result<usize, CacheError>> + Send {
        (**self).delete_many(keys)
    }
}

/// A process-local [`CacheStore`].
///
/// Can be switched offline to exercise the unavailable-backend path.
#[derive(Debug, Default)]
pub struct InMemoryCache {
    entries: Mutex<HashMap<String, Vec<u8>>>,
    offline: AtomicBool,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent call fail with [`CacheError::Unavailable`]
    /// (`false`) or succeed again (`true`).
    pub fn set_available(&self, available: bool) {
        self.offline.store(!available, Ordering::Relaxed);
    }

    /// Number of stored entries.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }

    /// Returns `true` if `key` is present.
    pub async fn contains(&self, key: &str) -> bool {
        self.entries.lock().await.contains_key(key)
    }

    fn check_online(&self) -> Result<(), CacheError> {
        if self.offline.load(Ordering::Relaxed) {
            return Err(CacheError::Unavailable("in-memory cache is offline".into()));
        }
        Ok(())
    }
}

impl CacheStore for InMemoryCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        self.check_online()?;
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> Result<(), CacheError> {
        self.check_online()?;
        self.entries.lock().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete_many(&self, keys: &[String]) -> Result<usize, CacheError> {
        self.check_online()?;
        let mut entries = self.entries.lock().await;
        Ok(keys.iter().filter(|key| entries.remove(*key).is_some()).count())
    }
}

/// Saves, loads, and discards players' boards.
///
/// Boards are stored as a versioned [`BoardSnapshot`] encoded with `C`.
pub struct ResumeCache<S, C = JsonCodec> {
    store: S,
    codec: C,
}

impl<S: CacheStore> ResumeCache<S> {
    /// Creates a resume cache using the JSON codec.
    pub fn new(store: S) -> Self {
        Self::with_codec(store, JsonCodec)
    }
}

impl<S: CacheStore, C: Codec> ResumeCache<S, C> {
    pub fn with_codec(store: S, codec: C) -> Self {
        Self { store, codec }
    }

    /// Cache key for a player's board.
    pub fn key(player: &PlayerId) -> String {
        format!("{KEY_PREFIX}{player}")
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Stores `board` for `player`, overwriting any previous value.
    pub async fn save(&self, player: &PlayerId, board: &Board) -> Result<(), CacheError> {
        let bytes = self.codec.encode(&BoardSnapshot::from(board))?;
        self.store.set(&Self::key(player), bytes).await?;
        tracing::debug!(%player, "board cached");
        Ok(())
    }

    /// Loads the cached board for `player`.
    ///
    /// An entry that no longer decodes into a valid board is treated as
    /// absent: the player starts over with a fresh board.
    pub async fn load(&self, player: &PlayerId) -> Result<Option<Board>, CacheError> {
        let Some(bytes) = self.store.get(&Self::key(player)).await? else {
            tracing::debug!(%player, "no cached board");
            return Ok(None);
        };

        let board = self
            .codec
            .decode::<BoardSnapshot>(&bytes)
            .map_err(|e| e.to_string())
            .and_then(|snapshot| Board::try_from(snapshot).map_err(|e| e.to_string()));

        match board {
            Ok(board) => {
                tracing::debug!(%player, "cached board restored");
                Ok(Some(board))
            }
            Err(error) => {
                tracing::warn!(%player, %error, "discarding unreadable cached board");
                Ok(None)
            }
        }
    }

    /// Deletes the cached boards of all `players`.
    pub async fn discard(&self, players: &[PlayerId]) -> Result<(), CacheError> {
        if players.is_empty() {
            return Ok(());
        }
        let keys: Vec<String> = players.iter().map(Self::key).collect();
        let removed = self.store.delete_many(&keys).await?;
        tracing::debug!(players = players.len(), removed, "cached boards discarded");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use seabattle_board::{Coordinate, Orientation};

    fn at(s: &str) -> Coordinate {
        Coordinate::parse(s).unwrap()
    }

    fn alice() -> PlayerId {
        PlayerId::new("alice")
    }

    fn sample_board() -> Board {
        let mut board = Board::default();
        board.place_ship(2, at("B1"), Orientation::Vertical).unwrap();
        board.place_ship(1, at("E5"), Orientation::Horizontal).unwrap();
        board.attack(at("B1")).unwrap();
        board.attack(at("H8")).unwrap();
        board
    }

    #[tokio::test]
    async fn test_save_then_load_restores_board() {
        let cache = ResumeCache::new(InMemoryCache::new());
        let board = sample_board();

        cache.save(&alice(), &board).await.unwrap();
        let loaded = cache.load(&alice()).await.unwrap().expect("board cached");

        assert_eq!(loaded, board);
        assert_eq!(loaded.ships().len(), 2);
        assert_eq!(loaded.remaining(1), Some(3));
    }

    #[tokio::test]
    async fn test_save_overwrites() {
        let cache = ResumeCache::new(InMemoryCache::new());
        cache.save(&alice(), &Board::default()).await.unwrap();
        let board = sample_board();
        cache.save(&alice(), &board).await.unwrap();

        assert_eq!(cache.load(&alice()).await.unwrap(), Some(board));
        assert_eq!(cache.store().len().await, 1);
    }

    #[tokio::test]
    async fn test_load_missing_is_none() {
        let cache = ResumeCache::new(InMemoryCache::new());
        assert_eq!(cache.load(&alice()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_keys_are_namespaced() {
        let cache = ResumeCache::new(InMemoryCache::new());
        cache.save(&alice(), &Board::default()).await.unwrap();
        assert!(cache.store().contains("seabattle:board:alice").await);
    }

    #[tokio::test]
    async fn test_unreadable_entry_is_treated_as_absent() {
        let store = InMemoryCache::new();
        store
            .set("seabattle:board:alice", b"{\"version\":1}".to_vec())
            .await
            .unwrap();
        let cache = ResumeCache::new(store);

        assert_eq!(cache.load(&alice()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_discard_removes_all_given_players() {
        let cache = ResumeCache::new(InMemoryCache::new());
        let bob = PlayerId::new("bob");
        let carol = PlayerId::new("carol");
        for player in [&alice(), &bob, &carol] {
            cache.save(player, &Board::default()).await.unwrap();
        }

        cache.discard(&[alice(), bob.clone()]).await.unwrap();

        assert_eq!(cache.load(&alice()).await.unwrap(), None);
        assert_eq!(cache.load(&bob).await.unwrap(), None);
        assert!(cache.load(&carol).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_offline_store_reports_unavailable() {
        let cache = ResumeCache::new(InMemoryCache::new());
        cache.store().set_available(false);

        let result = cache.save(&alice(), &Board::default()).await;
        assert!(matches!(result, Err(CacheError::Unavailable(_))));

        cache.store().set_available(true);
        assert!(cache.save(&alice(), &Board::default()).await.is_ok());
    }
}
