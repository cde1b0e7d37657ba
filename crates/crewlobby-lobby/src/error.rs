//! Error types for the lobby layer.

use crewlobby_protocol::{LobbyId, PlayerId};
use crewlobby_store::StoreError;

/// Coarse failure categories callers branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    WrongPassword,
    LobbyFull,
    NotOwner,
    Conflict,
    StoreFailure,
}

/// Errors that can occur during lobby and player operations.
///
/// Any of these aborts the operation: its transaction is rolled back and
/// none of its staged events are published.
#[derive(Debug, thiserror::Error)]
pub enum LobbyError {
    /// The lobby does not exist.
    #[error("lobby {0} not found")]
    LobbyNotFound(LobbyId),

    /// The player does not exist.
    #[error("player {0} not found")]
    PlayerNotFound(PlayerId),

    /// The supplied password does not match the lobby's.
    #[error("wrong password for lobby {0}")]
    WrongPassword(LobbyId),

    /// The lobby has no free non-spectator slot.
    #[error("lobby {0} is full")]
    LobbyFull(LobbyId),

    /// The requester is not the lobby's owner.
    #[error("player {player} does not own lobby {lobby}")]
    NotOwner { player: PlayerId, lobby: LobbyId },

    /// A requested new owner is not a member of the lobby.
    #[error("player {player} is not a member of lobby {lobby}")]
    NotMember { player: PlayerId, lobby: LobbyId },

    /// The id is taken by a record with different attributes.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Stored data breaks a lobby invariant (e.g. a member whose lobby is
    /// gone).
    #[error("inconsistent state: {0}")]
    Inconsistent(String),

    /// The persistence port failed.
    #[error("{context}: {source}")]
    Store {
        context: &'static str,
        #[source]
        source: StoreError,
    },
}

impl LobbyError {
    /// The category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::LobbyNotFound(_) | Self::PlayerNotFound(_) | Self::NotMember { .. } => {
                ErrorKind::NotFound
            }
            Self::WrongPassword(_) => ErrorKind::WrongPassword,
            Self::LobbyFull(_) => ErrorKind::LobbyFull,
            Self::NotOwner { .. } => ErrorKind::NotOwner,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::Inconsistent(_) | Self::Store { .. } => ErrorKind::StoreFailure,
        }
    }

    /// HTTP status a transport should answer with.
    ///
    /// Only a wrong password is surfaced to clients as such; everything
    /// else is an internal error.
    pub fn http_status(&self) -> u16 {
        match self.kind() {
            ErrorKind::WrongPassword => 401,
            _ => 500,
        }
    }
}

/// Wraps a [`StoreError`] with what the operation was doing.
pub(crate) fn store_err(context: &'static str) -> impl FnOnce(StoreError) -> LobbyError {
    move |source| LobbyError::Store { context, source }
}
