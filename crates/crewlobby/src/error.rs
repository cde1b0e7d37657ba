//! Unified error type for crewlobby.

use crewlobby_lobby::LobbyError;
use crewlobby_messaging::MessagingError;
use crewlobby_protocol::ProtocolError;
use crewlobby_store::StoreError;

/// Top-level error that wraps all crate-specific errors.
///
/// When using the `crewlobby` meta-crate, you deal with this single
/// error type instead of importing errors from each sub-crate.
/// The `#[from]` attribute on each variant auto-generates `From` impls,
/// so the `?` operator converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum CrewlobbyError {
    /// Encoding or decoding a wire value failed.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The persistence adapter failed outside a lifecycle operation.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The messaging adapter could not be built or reached.
    #[error(transparent)]
    Messaging(#[from] MessagingError),

    /// A lobby or player operation was rejected or failed.
    #[error(transparent)]
    Lobby(#[from] LobbyError),

    /// A configuration value could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(String),
}
