//! Codec trait and the JSON implementation used for message bodies.
//!
//! The messaging layer never calls `serde_json` directly. It asks a
//! [`Codec`] for bytes, so a different body format only means a different
//! codec.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// Encodes Rust values to bytes and decodes them back.
///
/// `Send + Sync + 'static` because codecs live inside long-lived adapters
/// that are shared between Tokio tasks.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Encode`] if serialization fails.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Decode`] if the bytes are malformed or do
    /// not match the expected type.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] that uses JSON (via `serde_json`).
///
/// The messaging service accepts `application/json` bodies, so this is the
/// codec every shipped adapter uses.
///
/// ## Example
///
/// ```rust
/// use crewlobby_protocol::{Codec, JsonCodec, Message, Topic};
///
/// let codec = JsonCodec;
/// let message = Message {
///     topic: Topic::PlayerLagging,
///     message: serde_json::json!({ "player_id": "x" }),
/// };
///
/// let bytes = codec.encode(&message).unwrap();
/// let text = String::from_utf8(bytes).unwrap();
/// assert!(text.contains("\"PLAYER_LAGGING\""));
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}
