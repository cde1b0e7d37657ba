//! Builders for the events the lifecycle publishes.
//!
//! Payloads are small JSON objects. Lobby passwords never appear in them.

use crewlobby_protocol::{Event, Lobby, Player, PlayerId, Topic};
use serde_json::json;

/// `PLAYER_JOINS_LOBBY`, sent by the joining player.
pub fn player_joined(player: &Player) -> Event {
    Event::new(
        Some(player.id),
        player.lobby_id,
        Topic::PlayerJoinsLobby,
        json!({
            "player_id": player.id,
            "name": player.name,
            "spectator": player.spectator,
        }),
    )
}

/// `PLAYER_LEAVES_LOBBY`. `actor` is `None` when the system removed the
/// player.
pub fn player_left(player: &Player, actor: Option<PlayerId>) -> Event {
    Event::new(
        actor,
        player.lobby_id,
        Topic::PlayerLeavesLobby,
        json!({ "player_id": player.id }),
    )
}

/// `PLAYER_UPDATES_LOBBY` with the lobby's new settings.
pub fn lobby_updated(lobby: &Lobby, actor: Option<PlayerId>) -> Event {
    Event::new(
        actor,
        lobby.id,
        Topic::PlayerUpdatesLobby,
        json!({
            "lobby_id": lobby.id,
            "status": lobby.status,
            "name": lobby.name,
            "owner": lobby.owner,
            "difficulty": lobby.difficulty,
            "mission_length": lobby.mission_length,
            "crew_size": lobby.crew_size,
            "max_players": lobby.max_players,
            "expansion_packs": lobby.expansion_packs,
            "payload": lobby.payload,
        }),
    )
}

/// `PLAYER_UPDATED`, sent by the updated player.
pub fn player_updated(player: &Player) -> Event {
    Event::new(
        Some(player.id),
        player.lobby_id,
        Topic::PlayerUpdated,
        json!({
            "player_id": player.id,
            "name": player.name,
            "spectator": player.spectator,
            "payload": player.payload,
        }),
    )
}

/// `PLAYER_LAGGING`, always a system event.
pub fn player_lagging(player: &Player) -> Event {
    Event::new(
        None,
        player.lobby_id,
        Topic::PlayerLagging,
        json!({
            "player_id": player.id,
            "last_refresh": player.last_refresh,
        }),
    )
}
