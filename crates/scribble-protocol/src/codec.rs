//! Codec trait and the JSON implementation.
//!
//! The gateway never touches `serde_json` directly. It asks a [`Codec`]
//! to turn a [`ServerEvent`](crate::ServerEvent) into bytes and bytes
//! into a [`ClientAction`](crate::ClientAction), so a binary codec can be
//! swapped in without touching the connection handler.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// Encodes values to bytes and decodes bytes back.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Encode`] if serialization fails.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Decode`] if the bytes are malformed or
    /// don't match the expected shape.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

/// A [`Codec`] backed by `serde_json`. Browser clients speak this one.
///
/// ```rust
/// use scribble_protocol::{ClientAction, Codec, JsonCodec};
///
/// let codec = JsonCodec;
/// let action: ClientAction = codec
///     .decode(br#"{"type":"Chat","text":"apple"}"#)
///     .unwrap();
/// assert_eq!(action, ClientAction::Chat { text: "apple".into() });
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
