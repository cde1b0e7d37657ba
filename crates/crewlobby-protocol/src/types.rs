//! Core domain types shared by every crewlobby layer.
//!
//! A [`Lobby`] is a named, optionally password-protected waiting room with
//! one owning [`Player`]. Players heartbeat to stay present; changes to
//! lobbies and players are announced as [`Event`]s on a fixed set of
//! [`Topic`]s.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ProtocolError;

/// Opaque, structured data attached to lobbies, players, and events.
///
/// The core never looks inside a payload. It is stored and forwarded as-is.
pub type Payload = serde_json::Value;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A unique identifier for a player.
///
/// Players pick their own id (clients generate a UUID once and reuse it for
/// every call), so a `PlayerId` is usually parsed rather than generated.
///
/// `#[serde(transparent)]` keeps the JSON form a bare UUID string.
/// `Ord` is derived because the owner hand-over uses the id as its final
/// tie-break.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PlayerId(pub Uuid);

impl PlayerId {
    /// Generates a fresh random id.
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    /// The all-zero id. Used as the default system sender.
    pub const fn nil() -> Self {
        Self(Uuid::nil())
    }
}

impl From<Uuid> for PlayerId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl FromStr for PlayerId {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|_| ProtocolError::InvalidValue(format!("player id {s:?} is not a uuid")))
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A unique identifier for a lobby.
///
/// Same newtype pattern as [`PlayerId`]. Fresh ids are handed out by the
/// lobby service before a client creates the lobby.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct LobbyId(pub Uuid);

impl LobbyId {
    /// Generates a fresh random id.
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl From<Uuid> for LobbyId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl FromStr for LobbyId {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|_| ProtocolError::InvalidValue(format!("lobby id {s:?} is not a uuid")))
    }
}

impl fmt::Display for LobbyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a message allocated by the messaging service.
///
/// The service decides the format; we only carry it from the allocation
/// call to the submission call.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(pub String);

impl From<String> for EventId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Request-scoped id that ties log lines and messaging calls together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(pub Uuid);

impl CorrelationId {
    /// Generates a fresh random correlation id.
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parses a client-supplied id.
    ///
    /// # Errors
    /// Returns [`ProtocolError::InvalidValue`] when `raw` is not a UUID.
    pub fn parse(raw: &str) -> Result<Self, ProtocolError> {
        Uuid::parse_str(raw.trim())
            .map(Self)
            .map_err(|_| ProtocolError::InvalidValue(format!("correlation id {raw:?} is not a uuid")))
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::random()
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// LobbyStatus
// ---------------------------------------------------------------------------

/// Where a lobby is in its life.
///
/// The set is closed: deserializing anything other than `"OPEN"` or
/// `"PLAYING"` fails, so an invalid status never reaches the core.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LobbyStatus {
    /// Waiting for players. Every lobby starts here.
    #[default]
    Open,
    /// A game is running.
    Playing,
}

impl LobbyStatus {
    /// The wire name of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "OPEN",
            Self::Playing => "PLAYING",
        }
    }
}

impl fmt::Display for LobbyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LobbyStatus {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "OPEN" => Ok(Self::Open),
            "PLAYING" => Ok(Self::Playing),
            other => Err(ProtocolError::InvalidValue(format!(
                "unknown lobby status {other:?}"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Topic
// ---------------------------------------------------------------------------

/// The fixed set of event topics published to the messaging service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Topic {
    /// A player was added to a lobby.
    PlayerJoinsLobby,
    /// A player was removed from a lobby (explicit leave or eviction).
    PlayerLeavesLobby,
    /// Lobby settings or ownership changed.
    PlayerUpdatesLobby,
    /// A player's name, spectator flag, or payload changed.
    PlayerUpdated,
    /// A player missed its heartbeat window but has not been evicted yet.
    PlayerLagging,
}

impl Topic {
    /// Every topic, in declaration order.
    pub const ALL: [Topic; 5] = [
        Topic::PlayerJoinsLobby,
        Topic::PlayerLeavesLobby,
        Topic::PlayerUpdatesLobby,
        Topic::PlayerUpdated,
        Topic::PlayerLagging,
    ];

    /// The wire name of the topic.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PlayerJoinsLobby => "PLAYER_JOINS_LOBBY",
            Self::PlayerLeavesLobby => "PLAYER_LEAVES_LOBBY",
            Self::PlayerUpdatesLobby => "PLAYER_UPDATES_LOBBY",
            Self::PlayerUpdated => "PLAYER_UPDATED",
            Self::PlayerLagging => "PLAYER_LAGGING",
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Lobby and Player records
// ---------------------------------------------------------------------------

/// A lobby as it is persisted.
///
/// The owner is stored by id. [`LobbyInfo`] is the assembled view with the
/// owner and members resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lobby {
    pub id: LobbyId,
    #[serde(default)]
    pub status: LobbyStatus,
    pub name: String,
    /// Join password. Empty means no password. Never serialized outward.
    #[serde(default, skip_serializing)]
    pub password: String,
    pub owner: PlayerId,
    pub difficulty: String,
    pub mission_length: u32,
    pub crew_size: u32,
    /// Upper bound on non-spectator members.
    pub max_players: u32,
    #[serde(default)]
    pub expansion_packs: BTreeSet<String>,
    #[serde(default)]
    pub payload: Payload,
}

/// A player as it is persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub lobby_id: LobbyId,
    pub name: String,
    /// Spectators do not count toward `max_players`.
    pub spectator: bool,
    #[serde(default)]
    pub payload: Payload,
    /// Time of the last heartbeat (or of the last update / join).
    pub last_refresh: DateTime<Utc>,
    /// Time the player joined its lobby. Never changes afterwards.
    pub joined_at: DateTime<Utc>,
}

/// A request to add a player to a lobby.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerJoin {
    pub id: PlayerId,
    pub lobby_id: LobbyId,
    pub name: String,
    #[serde(default)]
    pub spectator: bool,
    #[serde(default)]
    pub payload: Payload,
}

impl PlayerJoin {
    /// Whether an existing record carries the same identifying attributes.
    ///
    /// Used to make repeated joins idempotent: payload differences do not
    /// count, name, lobby, and spectator flag do.
    pub fn matches(&self, player: &Player) -> bool {
        self.id == player.id
            && self.lobby_id == player.lobby_id
            && self.name == player.name
            && self.spectator == player.spectator
    }
}

/// A request to change a player's mutable fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerUpdate {
    pub id: PlayerId,
    pub name: String,
    #[serde(default)]
    pub spectator: bool,
    #[serde(default)]
    pub payload: Payload,
}

/// A lobby with its owner and members resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LobbyInfo {
    pub lobby: Lobby,
    pub owner: Player,
    pub players: Vec<Player>,
}

impl LobbyInfo {
    /// Number of members that count toward `max_players`.
    pub fn non_spectator_count(&self) -> usize {
        self.players.iter().filter(|p| !p.spectator).count()
    }
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// A domain event waiting to be published.
///
/// `sender` is `None` for events the system itself originates (such as
/// scavenger evictions); the messaging layer substitutes the configured
/// system player id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub sender: Option<PlayerId>,
    pub lobby_id: LobbyId,
    pub topic: Topic,
    pub payload: Payload,
}

impl Event {
    /// Creates an event addressed to `lobby_id`.
    pub fn new(
        sender: Option<PlayerId>,
        lobby_id: LobbyId,
        topic: Topic,
        payload: Payload,
    ) -> Self {
        Self {
            sender,
            lobby_id,
            topic,
            payload,
        }
    }
}

/// The body submitted to the messaging service for one event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub topic: Topic,
    pub message: Payload,
}
