//! Error types for the protocol layer.
//!
//! A `ProtocolError` always means the bytes or the shape of a message
//! were wrong. Room rules are checked one layer up.

/// Errors that can occur while encoding, decoding, or validating a
/// message at the Gateway boundary.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed.
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed: malformed JSON, unknown `type` tag,
    /// missing fields.
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The message decoded fine but carries a value outside the
    /// accepted range (empty name, oversized chat, bad setting).
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
