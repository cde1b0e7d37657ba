//! Lobby lifecycle: create, update, change status, delete, and read.

use crewlobby_messaging::Messenger;
use crewlobby_protocol::{Lobby, LobbyId, LobbyInfo, LobbyStatus, PlayerId, PlayerJoin};
use crewlobby_store::{Store, Transaction};
use tracing::Instrument;

use crate::error::store_err;
use crate::{LobbyError, LobbyService, RequestContext, UnitOfWork, events};

impl<S: Store, M: Messenger> LobbyService<S, M> {
    /// Hands out a fresh lobby id for a client about to create a lobby.
    pub fn new_lobby_id(&self) -> LobbyId {
        let id = LobbyId::random();
        tracing::debug!(lobby_id = %id, "lobby id issued");
        id
    }

    /// Creates a lobby owned by `owner` and joins the owner as first member.
    ///
    /// The lobby starts `OPEN`. Its `owner` field and the owner's
    /// `lobby_id` are taken from the arguments, whatever the caller put
    /// there.
    ///
    /// Retrying with the same id, name, and password is harmless: the
    /// existing lobby is kept and the owner join is idempotent too.
    ///
    /// # Errors
    /// - [`LobbyError::Conflict`] if the id is taken by a lobby with a
    ///   different name or password
    /// - [`LobbyError::LobbyFull`] if the owner is not a spectator and
    ///   `max_players` is zero
    pub async fn create_lobby(
        &self,
        ctx: &RequestContext,
        lobby: Lobby,
        owner: PlayerJoin,
    ) -> Result<(), LobbyError> {
        async {
            let mut uow = self.begin(ctx).await?;
            let result = self.create_lobby_in(&mut uow, lobby, owner).await;
            self.finish(uow, result).await
        }
        .instrument(ctx.span("create_lobby"))
        .await
    }

    async fn create_lobby_in(
        &self,
        uow: &mut UnitOfWork<S::Tx>,
        mut lobby: Lobby,
        mut owner: PlayerJoin,
    ) -> Result<(), LobbyError> {
        lobby.status = LobbyStatus::Open;
        lobby.owner = owner.id;
        owner.lobby_id = lobby.id;

        match uow.tx().create_lobby(&lobby).await {
            Ok(()) => {
                tracing::info!(lobby_id = %lobby.id, owner = %owner.id, "lobby created");
            }
            Err(err) if err.is_already_exists() => {
                let existing = uow
                    .tx()
                    .get_lobby_by_id(lobby.id)
                    .await
                    .map_err(store_err("loading existing lobby"))?
                    .ok_or_else(|| {
                        LobbyError::Inconsistent(format!(
                            "lobby {} reported as existing but cannot be read",
                            lobby.id
                        ))
                    })?;
                if existing.name != lobby.name || existing.password != lobby.password {
                    return Err(LobbyError::Conflict(format!(
                        "lobby {} already exists with different settings",
                        lobby.id
                    )));
                }
                tracing::debug!(lobby_id = %lobby.id, "lobby already exists, retrying owner join");
            }
            Err(err) => return Err(store_err("creating lobby")(err)),
        }

        self.join_in(uow, owner, &lobby.password).await?;
        Ok(())
    }

    /// Replaces a lobby's settings. Only the current owner may do this.
    ///
    /// Every field of `lobby` is written, including status and owner. A
    /// new owner must already be a member of the lobby.
    ///
    /// # Errors
    /// - [`LobbyError::LobbyNotFound`] if the lobby does not exist
    /// - [`LobbyError::NotOwner`] if `requester` is not the current owner
    /// - [`LobbyError::NotMember`] if the new owner is not a member
    pub async fn update_lobby(
        &self,
        ctx: &RequestContext,
        lobby: Lobby,
        requester: PlayerId,
    ) -> Result<(), LobbyError> {
        async {
            let mut uow = self.begin(ctx).await?;
            let result = self.update_lobby_in(&mut uow, lobby, requester).await;
            self.finish(uow, result).await
        }
        .instrument(ctx.span("update_lobby"))
        .await
    }

    async fn update_lobby_in(
        &self,
        uow: &mut UnitOfWork<S::Tx>,
        lobby: Lobby,
        requester: PlayerId,
    ) -> Result<(), LobbyError> {
        let current = load_lobby(uow, lobby.id).await?;
        ensure_owner(&current, requester)?;

        if lobby.owner != current.owner {
            let is_member = uow
                .tx()
                .get_player_by_id(lobby.owner)
                .await
                .map_err(store_err("loading new owner"))?
                .is_some_and(|p| p.lobby_id == lobby.id);
            if !is_member {
                return Err(LobbyError::NotMember {
                    player: lobby.owner,
                    lobby: lobby.id,
                });
            }
        }

        uow.tx()
            .update_lobby(&lobby)
            .await
            .map_err(store_err("updating lobby"))?;
        uow.stage(events::lobby_updated(&lobby, Some(requester)));
        tracing::info!(lobby_id = %lobby.id, status = %lobby.status, owner = %lobby.owner, "lobby updated");
        Ok(())
    }

    /// Changes only a lobby's status. Only the current owner may do this.
    ///
    /// # Errors
    /// Same as [`update_lobby`](Self::update_lobby), minus `NotMember`.
    pub async fn update_lobby_status(
        &self,
        ctx: &RequestContext,
        lobby_id: LobbyId,
        status: LobbyStatus,
        requester: PlayerId,
    ) -> Result<(), LobbyError> {
        async {
            let mut uow = self.begin(ctx).await?;
            let result = self
                .update_lobby_status_in(&mut uow, lobby_id, status, requester)
                .await;
            self.finish(uow, result).await
        }
        .instrument(ctx.span("update_lobby_status"))
        .await
    }

    async fn update_lobby_status_in(
        &self,
        uow: &mut UnitOfWork<S::Tx>,
        lobby_id: LobbyId,
        status: LobbyStatus,
        requester: PlayerId,
    ) -> Result<(), LobbyError> {
        let mut lobby = load_lobby(uow, lobby_id).await?;
        ensure_owner(&lobby, requester)?;

        lobby.status = status;
        uow.tx()
            .update_lobby(&lobby)
            .await
            .map_err(store_err("updating lobby status"))?;
        uow.stage(events::lobby_updated(&lobby, Some(requester)));
        tracing::info!(%lobby_id, %status, "lobby status changed");
        Ok(())
    }

    /// Deletes a lobby and all of its members. Only the owner may do this.
    ///
    /// Deleting a lobby that does not exist succeeds without doing
    /// anything. One `PLAYER_LEAVES_LOBBY` event is published per removed
    /// member.
    ///
    /// # Errors
    /// - [`LobbyError::NotOwner`] if `requester` is not the owner
    pub async fn delete_lobby(
        &self,
        ctx: &RequestContext,
        lobby_id: LobbyId,
        requester: PlayerId,
    ) -> Result<(), LobbyError> {
        async {
            let mut uow = self.begin(ctx).await?;
            let result = self.delete_lobby_in(&mut uow, lobby_id, requester).await;
            self.finish(uow, result).await
        }
        .instrument(ctx.span("delete_lobby"))
        .await
    }

    async fn delete_lobby_in(
        &self,
        uow: &mut UnitOfWork<S::Tx>,
        lobby_id: LobbyId,
        requester: PlayerId,
    ) -> Result<(), LobbyError> {
        let Some(lobby) = uow
            .tx()
            .get_lobby_by_id(lobby_id)
            .await
            .map_err(store_err("loading lobby"))?
        else {
            tracing::debug!(%lobby_id, "lobby already gone");
            return Ok(());
        };
        ensure_owner(&lobby, requester)?;
        remove_lobby_in(uow, lobby_id, Some(requester)).await
    }

    /// Reads one lobby with its owner and members.
    ///
    /// # Errors
    /// - [`LobbyError::LobbyNotFound`] if the lobby does not exist
    pub async fn get_lobby(
        &self,
        ctx: &RequestContext,
        lobby_id: LobbyId,
    ) -> Result<LobbyInfo, LobbyError> {
        async {
            let mut uow = self.begin(ctx).await?;
            let result = match load_lobby(&mut uow, lobby_id).await {
                Ok(lobby) => assemble(&mut uow, lobby).await,
                Err(err) => Err(err),
            };
            self.finish(uow, result).await
        }
        .instrument(ctx.span("get_lobby"))
        .await
    }

    /// Reads every lobby with its owner and members.
    pub async fn get_lobbies(&self, ctx: &RequestContext) -> Result<Vec<LobbyInfo>, LobbyError> {
        async {
            let mut uow = self.begin(ctx).await?;
            let result = assemble_all(&mut uow).await;
            self.finish(uow, result).await
        }
        .instrument(ctx.span("get_lobbies"))
        .await
    }
}

// ---------------------------------------------------------------------------
// Transaction-scoped helpers
// ---------------------------------------------------------------------------

pub(crate) async fn load_lobby<T: Transaction>(
    uow: &mut UnitOfWork<T>,
    lobby_id: LobbyId,
) -> Result<Lobby, LobbyError> {
    uow.tx()
        .get_lobby_by_id(lobby_id)
        .await
        .map_err(store_err("loading lobby"))?
        .ok_or(LobbyError::LobbyNotFound(lobby_id))
}

fn ensure_owner(lobby: &Lobby, requester: PlayerId) -> Result<(), LobbyError> {
    if lobby.owner == requester {
        Ok(())
    } else {
        Err(LobbyError::NotOwner {
            player: requester,
            lobby: lobby.id,
        })
    }
}

/// Deletes every member (staging a leave event for each) and then the
/// lobby row.
pub(crate) async fn remove_lobby_in<T: Transaction>(
    uow: &mut UnitOfWork<T>,
    lobby_id: LobbyId,
    actor: Option<PlayerId>,
) -> Result<(), LobbyError> {
    let members = uow
        .tx()
        .get_all_players_in_lobby(lobby_id)
        .await
        .map_err(store_err("loading lobby members"))?;
    uow.tx()
        .delete_all_players_in_lobby(lobby_id)
        .await
        .map_err(store_err("deleting lobby members"))?;
    for member in &members {
        uow.stage(events::player_left(member, actor));
    }
    uow.tx()
        .delete_lobby(lobby_id)
        .await
        .map_err(store_err("deleting lobby"))?;
    tracing::info!(%lobby_id, removed = members.len(), "lobby deleted");
    Ok(())
}

async fn assemble<T: Transaction>(
    uow: &mut UnitOfWork<T>,
    lobby: Lobby,
) -> Result<LobbyInfo, LobbyError> {
    let players = uow
        .tx()
        .get_all_players_in_lobby(lobby.id)
        .await
        .map_err(store_err("loading lobby members"))?;
    let owner = players
        .iter()
        .find(|p| p.id == lobby.owner)
        .cloned()
        .ok_or_else(|| {
            LobbyError::Inconsistent(format!(
                "owner {} of lobby {} is not a member",
                lobby.owner, lobby.id
            ))
        })?;
    Ok(LobbyInfo {
        lobby,
        owner,
        players,
    })
}

async fn assemble_all<T: Transaction>(uow: &mut UnitOfWork<T>) -> Result<Vec<LobbyInfo>, LobbyError> {
    let lobbies = uow
        .tx()
        .get_all_lobbies()
        .await
        .map_err(store_err("loading lobbies"))?;
    let mut infos = Vec::with_capacity(lobbies.len());
    for lobby in lobbies {
        infos.push(assemble(uow, lobby).await?);
    }
    Ok(infos)
}
