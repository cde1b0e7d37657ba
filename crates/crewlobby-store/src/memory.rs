//! In-process [`Store`] adapter.
//!
//! Transactions are serialized: [`MemoryStore::begin`] takes an owned lock on
//! the tables and hands the transaction a private working copy. Commit
//! writes the copy back; rollback (or drop) throws it away. That gives the
//! lifecycle layer the same all-or-nothing behaviour it gets from a
//! relational database, at the cost of one writer at a time.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use crewlobby_protocol::{Lobby, LobbyId, Player, PlayerId};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::{Entity, Store, StoreError, Transaction};

#[derive(Debug, Clone, Default)]
struct Tables {
    lobbies: BTreeMap<LobbyId, Lobby>,
    players: BTreeMap<PlayerId, Player>,
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

/// A [`Store`] that keeps both tables in memory.
///
/// Cloning is cheap and every clone sees the same data, so one instance
/// can be handed to the lobby service and kept by a test for inspection.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
    fail_commits: Arc<AtomicBool>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every following commit fail (or succeed again).
    ///
    /// A failed commit behaves like a database rejecting the transaction:
    /// nothing is applied.
    pub fn fail_commits(&self, fail: bool) {
        self.fail_commits.store(fail, Ordering::SeqCst);
    }

    /// Number of committed lobbies. Waits for any open transaction.
    pub async fn lobby_count(&self) -> usize {
        self.tables.lock().await.lobbies.len()
    }

    /// Number of committed players. Waits for any open transaction.
    pub async fn player_count(&self) -> usize {
        self.tables.lock().await.players.len()
    }
}

impl Store for MemoryStore {
    type Tx = MemoryTransaction;

    async fn begin(&self) -> Result<MemoryTransaction, StoreError> {
        let guard = Arc::clone(&self.tables).lock_owned().await;
        let working = Tables::clone(&guard);
        tracing::trace!("memory transaction started");
        Ok(MemoryTransaction {
            guard,
            working,
            fail_commits: Arc::clone(&self.fail_commits),
        })
    }
}

// ---------------------------------------------------------------------------
// MemoryTransaction
// ---------------------------------------------------------------------------

/// An open transaction on a [`MemoryStore`].
///
/// Holds the store lock until it is committed, rolled back, or dropped.
pub struct MemoryTransaction {
    guard: OwnedMutexGuard<Tables>,
    working: Tables,
    fail_commits: Arc<AtomicBool>,
}

impl Transaction for MemoryTransaction {
    async fn create_lobby(&mut self, lobby: &Lobby) -> Result<(), StoreError> {
        if self.working.lobbies.contains_key(&lobby.id) {
            return Err(StoreError::AlreadyExists {
                entity: Entity::Lobby,
                id: lobby.id.to_string(),
            });
        }
        self.working.lobbies.insert(lobby.id, lobby.clone());
        Ok(())
    }

    async fn update_lobby(&mut self, lobby: &Lobby) -> Result<(), StoreError> {
        let row = self
            .working
            .lobbies
            .get_mut(&lobby.id)
            .ok_or_else(|| StoreError::Missing {
                entity: Entity::Lobby,
                id: lobby.id.to_string(),
            })?;
        *row = lobby.clone();
        Ok(())
    }

    async fn delete_lobby(&mut self, id: LobbyId) -> Result<(), StoreError> {
        if self.working.players.values().any(|p| p.lobby_id == id) {
            return Err(StoreError::ForeignKey(format!(
                "lobby {id} still has players"
            )));
        }
        self.working.lobbies.remove(&id);
        Ok(())
    }

    async fn get_lobby_by_id(&mut self, id: LobbyId) -> Result<Option<Lobby>, StoreError> {
        Ok(self.working.lobbies.get(&id).cloned())
    }

    async fn get_all_lobbies(&mut self) -> Result<Vec<Lobby>, StoreError> {
        Ok(self.working.lobbies.values().cloned().collect())
    }

    async fn create_player(&mut self, player: &Player) -> Result<(), StoreError> {
        if self.working.players.contains_key(&player.id) {
            return Err(StoreError::AlreadyExists {
                entity: Entity::Player,
                id: player.id.to_string(),
            });
        }
        if !self.working.lobbies.contains_key(&player.lobby_id) {
            return Err(StoreError::ForeignKey(format!(
                "player {} references missing lobby {}",
                player.id, player.lobby_id
            )));
        }
        self.working.players.insert(player.id, player.clone());
        Ok(())
    }

    async fn update_player(&mut self, player: &Player) -> Result<(), StoreError> {
        let row = self
            .working
            .players
            .get_mut(&player.id)
            .ok_or_else(|| StoreError::Missing {
                entity: Entity::Player,
                id: player.id.to_string(),
            })?;
        // Lobby membership and join time are fixed at insert.
        row.name.clone_from(&player.name);
        row.spectator = player.spectator;
        row.payload.clone_from(&player.payload);
        row.last_refresh = player.last_refresh;
        Ok(())
    }

    async fn update_player_last_refresh(
        &mut self,
        id: PlayerId,
        at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        match self.working.players.get_mut(&id) {
            Some(row) => {
                row.last_refresh = at;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_player(&mut self, id: PlayerId) -> Result<(), StoreError> {
        self.working.players.remove(&id);
        Ok(())
    }

    async fn delete_all_players_in_lobby(&mut self, lobby_id: LobbyId) -> Result<usize, StoreError> {
        let before = self.working.players.len();
        self.working.players.retain(|_, p| p.lobby_id != lobby_id);
        Ok(before - self.working.players.len())
    }

    async fn get_player_by_id(&mut self, id: PlayerId) -> Result<Option<Player>, StoreError> {
        Ok(self.working.players.get(&id).cloned())
    }

    async fn get_all_players_in_lobby(&mut self, lobby_id: LobbyId) -> Result<Vec<Player>, StoreError> {
        let mut players: Vec<Player> = self
            .working
            .players
            .values()
            .filter(|p| p.lobby_id == lobby_id)
            .cloned()
            .collect();
        players.sort_by_key(|p| (p.joined_at, p.id));
        Ok(players)
    }

    async fn get_players_by_last_refresh_before(
        &mut self,
        before: DateTime<Utc>,
    ) -> Result<Vec<Player>, StoreError> {
        let mut players: Vec<Player> = self
            .working
            .players
            .values()
            .filter(|p| p.last_refresh < before)
            .cloned()
            .collect();
        players.sort_by_key(|p| (p.last_refresh, p.id));
        Ok(players)
    }

    async fn get_non_spectator_count(&mut self, lobby_id: LobbyId) -> Result<u32, StoreError> {
        let count = self
            .working
            .players
            .values()
            .filter(|p| p.lobby_id == lobby_id && !p.spectator)
            .count();
        u32::try_from(count).map_err(|_| StoreError::Backend("player count overflow".into()))
    }

    async fn commit(self) -> Result<(), StoreError> {
        if self.fail_commits.load(Ordering::SeqCst) {
            tracing::trace!("memory transaction commit rejected");
            return Err(StoreError::CommitFailed("commit failure injected".into()));
        }
        let Self {
            mut guard, working, ..
        } = self;
        *guard = working;
        tracing::trace!("memory transaction committed");
        Ok(())
    }

    async fn rollback(self) -> Result<(), StoreError> {
        tracing::trace!("memory transaction rolled back");
        Ok(())
    }
}
