//! Error types for the protocol layer.

/// Errors that can occur while parsing or (de)serializing protocol types.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into bytes).
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed (turning bytes into a Rust type).
    ///
    /// Common causes: malformed JSON, missing required fields, or an
    /// unknown enum value such as a lobby status other than
    /// `OPEN`/`PLAYING`.
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// A value parsed from text is not valid, e.g. an id that is not a
    /// UUID or an unknown status string.
    #[error("invalid value: {0}")]
    InvalidValue(String),
}
