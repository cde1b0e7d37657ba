//! Persistence port for crewlobby.
//!
//! Provides the [`Store`] and [`Transaction`] traits that the lobby
//! lifecycle runs against, plus [`MemoryStore`], an in-process adapter with
//! the same transactional guarantees a relational backend gives.
//!
//! # Contract
//!
//! - Every lifecycle operation opens exactly one [`Transaction`] and either
//!   commits or rolls it back. Dropping a transaction without committing is
//!   a rollback.
//! - Inserting a row whose id already exists fails with
//!   [`StoreError::AlreadyExists`].
//! - A player must reference an existing lobby, and a lobby cannot be
//!   deleted while players still reference it
//!   ([`StoreError::ForeignKey`]).
//! - Reads inside a transaction see that transaction's own writes.

mod error;
mod memory;

pub use error::{Entity, StoreError};
pub use memory::{MemoryStore, MemoryTransaction};

use std::future::Future;

use chrono::{DateTime, Utc};
use crewlobby_protocol::{Lobby, LobbyId, Player, PlayerId};

/// Opens transactions against a backing database.
///
/// `Send + Sync + 'static` because one store is shared by every request
/// handler and by the background scavenger.
pub trait Store: Send + Sync + 'static {
    /// The transaction type produced by this store.
    type Tx: Transaction;

    /// Begins a new transaction.
    fn begin(&self) -> impl Future<Output = Result<Self::Tx, StoreError>> + Send;
}

/// One open unit of work against the store.
///
/// Reads take `&mut self` like writes do: a transaction is used by a single
/// task at a time and relational drivers need exclusive access to their
/// connection anyway.
pub trait Transaction: Send + 'static {
    // -- Lobbies --

    /// Inserts a new lobby.
    fn create_lobby(
        &mut self,
        lobby: &Lobby,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Overwrites every mutable column of an existing lobby.
    fn update_lobby(
        &mut self,
        lobby: &Lobby,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Deletes a lobby. Deleting a missing lobby is not an error.
    fn delete_lobby(
        &mut self,
        id: LobbyId,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Fetches one lobby, `None` if it does not exist.
    fn get_lobby_by_id(
        &mut self,
        id: LobbyId,
    ) -> impl Future<Output = Result<Option<Lobby>, StoreError>> + Send;

    /// Fetches every lobby, ordered by id.
    fn get_all_lobbies(
        &mut self,
    ) -> impl Future<Output = Result<Vec<Lobby>, StoreError>> + Send;

    // -- Players --

    /// Inserts a new player.
    fn create_player(
        &mut self,
        player: &Player,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Overwrites name, spectator flag, payload, and last refresh time.
    fn update_player(
        &mut self,
        player: &Player,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Sets only the last refresh time. Returns `false` if no such player.
    fn update_player_last_refresh(
        &mut self,
        id: PlayerId,
        at: DateTime<Utc>,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Deletes one player. Deleting a missing player is not an error.
    fn delete_player(
        &mut self,
        id: PlayerId,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Deletes every player in a lobby and returns how many were removed.
    fn delete_all_players_in_lobby(
        &mut self,
        lobby_id: LobbyId,
    ) -> impl Future<Output = Result<usize, StoreError>> + Send;

    /// Fetches one player, `None` if it does not exist.
    fn get_player_by_id(
        &mut self,
        id: PlayerId,
    ) -> impl Future<Output = Result<Option<Player>, StoreError>> + Send;

    /// Fetches every member of a lobby, ordered by join time then id.
    fn get_all_players_in_lobby(
        &mut self,
        lobby_id: LobbyId,
    ) -> impl Future<Output = Result<Vec<Player>, StoreError>> + Send;

    /// Fetches every player whose last refresh is strictly before `before`,
    /// oldest first.
    fn get_players_by_last_refresh_before(
        &mut self,
        before: DateTime<Utc>,
    ) -> impl Future<Output = Result<Vec<Player>, StoreError>> + Send;

    /// Counts the members of a lobby that are not spectators.
    fn get_non_spectator_count(
        &mut self,
        lobby_id: LobbyId,
    ) -> impl Future<Output = Result<u32, StoreError>> + Send;

    // -- Completion --

    /// Makes every write of this transaction durable.
    fn commit(self) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Discards every write of this transaction.
    fn rollback(self) -> impl Future<Output = Result<(), StoreError>> + Send;
}
