//! Shared vocabulary for crewlobby.
//!
//! This crate defines the types every other layer speaks:
//!
//! - **Identity** ([`LobbyId`], [`PlayerId`], [`EventId`], [`CorrelationId`]).
//! - **Domain records** ([`Lobby`], [`Player`], [`LobbyInfo`]) and the
//!   request shapes that create or change them ([`PlayerJoin`],
//!   [`PlayerUpdate`]).
//! - **Events** ([`Topic`], [`Event`], [`Message`]) that the lifecycle
//!   stages and the messaging layer publishes.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]) for turning wire bodies
//!   into bytes.
//!
//! # Architecture
//!
//! The protocol layer has no behaviour of its own. It sits underneath the
//! store, messaging, and lobby crates so they can agree on what a lobby
//! or a player is without depending on each other.
//!
//! ```text
//! Lobby lifecycle ─┬→ Store (persists Lobby / Player)
//!                  └→ Messaging (publishes Event as Message)
//!                         ↑ all share crewlobby-protocol
//! ```

mod codec;
mod error;
mod types;

pub use codec::{Codec, JsonCodec};
pub use error::ProtocolError;
pub use types::{
    CorrelationId, Event, EventId, Lobby, LobbyId, LobbyInfo, LobbyStatus,
    Message, Payload, Player, PlayerId, PlayerJoin, PlayerUpdate, Topic,
};
