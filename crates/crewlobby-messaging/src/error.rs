//! Error types for the messaging layer.

use crewlobby_protocol::ProtocolError;

/// Errors that can occur while publishing an event.
///
/// None of these ever undo a lobby change: the lifecycle layer publishes
/// after commit and only logs publish failures.
#[derive(Debug, thiserror::Error)]
pub enum MessagingError {
    /// The HTTP request could not be sent or its response not read.
    #[cfg(feature = "http")]
    #[error("messaging request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The configured service URL cannot carry the message endpoints.
    #[error("invalid messaging service url {0:?}")]
    InvalidUrl(String),

    /// The service answered with something other than `201 Created`.
    #[error("messaging service answered {status} to {call}")]
    UnexpectedStatus { call: &'static str, status: u16 },

    /// The service allocated an empty event id.
    #[error("messaging service returned an empty event id")]
    EmptyEventId,

    /// The message body could not be encoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The messenger is not accepting events right now.
    #[error("messaging unavailable: {0}")]
    Unavailable(String),
}
