//! Player lifecycle: join, update, heartbeat, leave, and read.
//!
//! Leaving is the subtle one. When the owner leaves, ownership moves to
//! another member in the same transaction; when the last member leaves,
//! the lobby goes with them.

use crewlobby_messaging::Messenger;
use crewlobby_protocol::{Lobby, Player, PlayerId, PlayerJoin, PlayerUpdate};
use crewlobby_store::{Store, Transaction};
use tracing::Instrument;

use crate::error::store_err;
use crate::lobby::{load_lobby, remove_lobby_in};
use crate::{LobbyError, LobbyService, RequestContext, UnitOfWork, events};

/// What a leave did to the player's lobby.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaveOutcome {
    /// The player did not exist. Nothing changed.
    NotFound,
    /// A non-owner left. The lobby is otherwise unchanged.
    Left,
    /// The owner left and `new_owner` took over.
    OwnerTransferred { new_owner: PlayerId },
    /// The last member left and the lobby was deleted.
    LobbyDeleted,
}

/// Picks the member that inherits a lobby from `leaving`.
///
/// Non-spectators are preferred, then whoever joined first; equal join
/// times fall back to the lowest id. Returns `None` if nobody else is
/// left.
pub fn pick_successor(members: &[Player], leaving: PlayerId) -> Option<&Player> {
    members
        .iter()
        .filter(|p| p.id != leaving)
        .min_by_key(|p| (p.spectator, p.joined_at, p.id))
}

// A stored player always points at a stored lobby.
async fn lobby_of<T: Transaction>(
    uow: &mut UnitOfWork<T>,
    player: &Player,
) -> Result<Lobby, LobbyError> {
    uow.tx()
        .get_lobby_by_id(player.lobby_id)
        .await
        .map_err(store_err("loading lobby"))?
        .ok_or_else(|| {
            LobbyError::Inconsistent(format!(
                "player {} references missing lobby {}",
                player.id, player.lobby_id
            ))
        })
}

impl<S: Store, M: Messenger> LobbyService<S, M> {
    /// Adds a player to a lobby.
    ///
    /// Joining again with the same id, lobby, name, and spectator flag
    /// succeeds without changing anything. Spectators ignore the capacity
    /// limit.
    ///
    /// # Errors
    /// - [`LobbyError::Conflict`] if the id is taken with other attributes
    /// - [`LobbyError::LobbyNotFound`] if the lobby does not exist
    /// - [`LobbyError::WrongPassword`] if `password` does not match
    /// - [`LobbyError::LobbyFull`] if a non-spectator finds no free slot
    pub async fn create_player(
        &self,
        ctx: &RequestContext,
        join: PlayerJoin,
        password: &str,
    ) -> Result<(), LobbyError> {
        async {
            let mut uow = self.begin(ctx).await?;
            let result = self.join_in(&mut uow, join, password).await.map(|_| ());
            self.finish(uow, result).await
        }
        .instrument(ctx.span("create_player"))
        .await
    }

    pub(crate) async fn join_in(
        &self,
        uow: &mut UnitOfWork<S::Tx>,
        join: PlayerJoin,
        password: &str,
    ) -> Result<Player, LobbyError> {
        if let Some(existing) = uow
            .tx()
            .get_player_by_id(join.id)
            .await
            .map_err(store_err("loading player"))?
        {
            if join.matches(&existing) {
                tracing::debug!(player_id = %join.id, lobby_id = %join.lobby_id, "player already joined");
                return Ok(existing);
            }
            return Err(LobbyError::Conflict(format!(
                "player {} already exists with different attributes",
                join.id
            )));
        }

        let lobby = load_lobby(uow, join.lobby_id).await?;
        if lobby.password != password {
            return Err(LobbyError::WrongPassword(lobby.id));
        }
        if !join.spectator {
            let taken = uow
                .tx()
                .get_non_spectator_count(lobby.id)
                .await
                .map_err(store_err("counting players"))?;
            if taken >= lobby.max_players {
                return Err(LobbyError::LobbyFull(lobby.id));
            }
        }

        let now = self.now();
        let player = Player {
            id: join.id,
            lobby_id: lobby.id,
            name: join.name,
            spectator: join.spectator,
            payload: join.payload,
            last_refresh: now,
            joined_at: now,
        };
        uow.tx().create_player(&player).await.map_err(|err| {
            if err.is_already_exists() {
                LobbyError::Conflict(format!("player {} already exists", player.id))
            } else {
                store_err("creating player")(err)
            }
        })?;
        uow.stage(events::player_joined(&player));
        tracing::info!(
            player_id = %player.id,
            lobby_id = %player.lobby_id,
            spectator = player.spectator,
            "player joined"
        );
        Ok(player)
    }

    /// Changes a player's name, spectator flag, and payload, and counts as
    /// a heartbeat.
    ///
    /// # Errors
    /// - [`LobbyError::PlayerNotFound`] if the player does not exist
    /// - [`LobbyError::LobbyFull`] if a spectator wants to play and the
    ///   lobby has no free slot
    /// - [`LobbyError::Inconsistent`] if the player's lobby is missing
    pub async fn update_player(
        &self,
        ctx: &RequestContext,
        update: PlayerUpdate,
    ) -> Result<(), LobbyError> {
        async {
            let mut uow = self.begin(ctx).await?;
            let result = self.update_player_in(&mut uow, update).await;
            self.finish(uow, result).await
        }
        .instrument(ctx.span("update_player"))
        .await
    }

    async fn update_player_in(
        &self,
        uow: &mut UnitOfWork<S::Tx>,
        update: PlayerUpdate,
    ) -> Result<(), LobbyError> {
        let mut player = uow
            .tx()
            .get_player_by_id(update.id)
            .await
            .map_err(store_err("loading player"))?
            .ok_or(LobbyError::PlayerNotFound(update.id))?;

        if player.spectator && !update.spectator {
            let lobby = lobby_of(uow, &player).await?;
            let taken = uow
                .tx()
                .get_non_spectator_count(lobby.id)
                .await
                .map_err(store_err("counting players"))?;
            if taken >= lobby.max_players {
                return Err(LobbyError::LobbyFull(lobby.id));
            }
        }

        player.name = update.name;
        player.spectator = update.spectator;
        player.payload = update.payload;
        player.last_refresh = self.now();
        uow.tx()
            .update_player(&player)
            .await
            .map_err(store_err("updating player"))?;
        uow.stage(events::player_updated(&player));
        tracing::debug!(player_id = %player.id, "player updated");
        Ok(())
    }

    /// Records a heartbeat. Publishes nothing.
    ///
    /// A heartbeat for a player that no longer exists (for example one
    /// the scavenger already evicted) changes nothing and is not an error.
    pub async fn refresh_player(
        &self,
        ctx: &RequestContext,
        player_id: PlayerId,
    ) -> Result<(), LobbyError> {
        async {
            let mut uow = self.begin(ctx).await?;
            let now = self.now();
            let result = match uow.tx().update_player_last_refresh(player_id, now).await {
                Ok(true) => Ok(()),
                Ok(false) => {
                    tracing::debug!(%player_id, "heartbeat for unknown player ignored");
                    Ok(())
                }
                Err(err) => Err(store_err("refreshing player")(err)),
            };
            self.finish(uow, result).await
        }
        .instrument(ctx.span("refresh_player"))
        .await
    }

    /// Removes a player from its lobby at the player's own request.
    ///
    /// Leaving twice is harmless. See [`remove_player`](Self::remove_player)
    /// for what happens to the lobby.
    pub async fn delete_player(
        &self,
        ctx: &RequestContext,
        player_id: PlayerId,
    ) -> Result<LeaveOutcome, LobbyError> {
        async {
            let mut uow = self.begin(ctx).await?;
            let result = self.remove_player(&mut uow, player_id, Some(player_id)).await;
            self.finish(uow, result).await
        }
        .instrument(ctx.span("delete_player"))
        .await
    }

    /// Removes a player inside an open unit of work.
    ///
    /// `actor` is the sender of the staged events; `None` for system
    /// removals. Steps:
    ///
    /// 1. A missing player is a no-op.
    /// 2. The player's lobby must exist.
    /// 3. A non-owner is deleted and a leave event staged.
    /// 4. For the owner, a successor is chosen among the other members
    ///    (see [`pick_successor`]) before the owner is deleted. With a
    ///    successor the lobby is re-owned and a lobby update staged;
    ///    without one the lobby is deleted.
    ///
    /// # Errors
    /// - [`LobbyError::Inconsistent`] if the player's lobby is missing
    pub async fn remove_player(
        &self,
        uow: &mut UnitOfWork<S::Tx>,
        player_id: PlayerId,
        actor: Option<PlayerId>,
    ) -> Result<LeaveOutcome, LobbyError> {
        let Some(player) = uow
            .tx()
            .get_player_by_id(player_id)
            .await
            .map_err(store_err("loading player"))?
        else {
            tracing::debug!(%player_id, "player already gone");
            return Ok(LeaveOutcome::NotFound);
        };
        let mut lobby = lobby_of(uow, &player).await?;

        if lobby.owner != player_id {
            uow.tx()
                .delete_player(player_id)
                .await
                .map_err(store_err("deleting player"))?;
            uow.stage(events::player_left(&player, actor));
            tracing::info!(%player_id, lobby_id = %lobby.id, "player left");
            return Ok(LeaveOutcome::Left);
        }

        let members = uow
            .tx()
            .get_all_players_in_lobby(lobby.id)
            .await
            .map_err(store_err("loading lobby members"))?;
        let successor = pick_successor(&members, player_id).map(|p| p.id);

        uow.tx()
            .delete_player(player_id)
            .await
            .map_err(store_err("deleting player"))?;
        uow.stage(events::player_left(&player, actor));
        tracing::debug!(%player_id, lobby_id = %lobby.id, "owner left");

        match successor {
            Some(new_owner) => {
                lobby.owner = new_owner;
                uow.tx()
                    .update_lobby(&lobby)
                    .await
                    .map_err(store_err("reassigning lobby owner"))?;
                uow.stage(events::lobby_updated(&lobby, actor));
                tracing::info!(lobby_id = %lobby.id, %new_owner, "lobby owner reassigned");
                Ok(LeaveOutcome::OwnerTransferred { new_owner })
            }
            None => {
                remove_lobby_in(uow, lobby.id, actor).await?;
                Ok(LeaveOutcome::LobbyDeleted)
            }
        }
    }

    /// Reads one player. `None` if it does not exist.
    pub async fn get_player(
        &self,
        ctx: &RequestContext,
        player_id: PlayerId,
    ) -> Result<Option<Player>, LobbyError> {
        async {
            let mut uow = self.begin(ctx).await?;
            let result = uow
                .tx()
                .get_player_by_id(player_id)
                .await
                .map_err(store_err("loading player"));
            self.finish(uow, result).await
        }
        .instrument(ctx.span("get_player"))
        .await
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, TimeDelta, Utc};
    use crewlobby_protocol::LobbyId;

    use super::*;

    fn pid(raw: &str) -> PlayerId {
        raw.parse().unwrap()
    }

    fn member(id: PlayerId, base: DateTime<Utc>, joined_offset_secs: i64, spectator: bool) -> Player {
        let joined_at = base + TimeDelta::seconds(joined_offset_secs);
        Player {
            id,
            lobby_id: LobbyId::random(),
            name: "crew".into(),
            spectator,
            payload: serde_json::Value::Null,
            last_refresh: joined_at,
            joined_at,
        }
    }

    #[test]
    fn test_pick_successor_prefers_earliest_join() {
        let base = Utc::now();
        let owner = PlayerId::random();
        let early = PlayerId::random();
        let late = PlayerId::random();
        let members = vec![
            member(owner, base, 0, false),
            member(late, base, 20, false),
            member(early, base, 10, false),
        ];

        assert_eq!(pick_successor(&members, owner).map(|p| p.id), Some(early));
    }

    #[test]
    fn test_pick_successor_breaks_ties_by_lowest_id() {
        let base = Utc::now();
        let owner = PlayerId::random();
        let low = pid("00000000-0000-0000-0000-000000000001");
        let high = pid("00000000-0000-0000-0000-000000000002");
        let members = vec![
            member(owner, base, 0, false),
            member(high, base, 5, false),
            member(low, base, 5, false),
        ];

        assert_eq!(pick_successor(&members, owner).map(|p| p.id), Some(low));
    }

    #[test]
    fn test_pick_successor_prefers_players_over_spectators() {
        let base = Utc::now();
        let owner = PlayerId::random();
        let watcher = PlayerId::random();
        let player = PlayerId::random();
        let members = vec![
            member(owner, base, 0, false),
            member(watcher, base, 1, true),
            member(player, base, 30, false),
        ];

        assert_eq!(pick_successor(&members, owner).map(|p| p.id), Some(player));
    }

    #[test]
    fn test_pick_successor_alone_returns_none() {
        let owner = PlayerId::random();
        let members = vec![member(owner, Utc::now(), 0, false)];

        assert!(pick_successor(&members, owner).is_none());
    }
}
