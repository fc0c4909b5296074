//! Unified error type for the Scribble server.

use scribble_protocol::ProtocolError;
use scribble_room::RoomError;

use crate::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant lets `?` convert layer errors
/// automatically.
#[derive(Debug, thiserror::Error)]
pub enum ScribbleError {
    /// Bind, accept, handshake, send or receive failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Malformed or out-of-range message.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A room rejected the request.
    #[error(transparent)]
    Room(#[from] RoomError),
}
