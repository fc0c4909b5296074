//! Error types for the room layer.

use scribble_protocol::{ErrorCode, PlayerId, ProtocolError, RoomId};

/// Errors that can occur during room operations.
///
/// Every variant is a validation failure reported to the connection that
/// caused it. Lost races (a late guess, a stale timer) are not errors;
/// the room logs and ignores them.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// The room does not exist.
    #[error("room {0} not found")]
    NotFound(RoomId),

    /// Every seat is taken.
    #[error("room {0} is full")]
    RoomFull(RoomId),

    /// The player is already in a room.
    #[error("player {0} already in room {1}")]
    AlreadyInRoom(PlayerId, RoomId),

    /// The player is not in this room (or in any room).
    #[error("player {0} is not in a room")]
    NotInRoom(PlayerId),

    /// Only the host may do this.
    #[error("player {0} is not the host")]
    NotHost(PlayerId),

    /// Only the current drawer may do this.
    #[error("player {0} is not the drawer")]
    NotDrawer(PlayerId),

    /// The room is in a phase that doesn't allow this operation.
    #[error("invalid room state for this operation: {0}")]
    InvalidState(String),

    /// Settings out of range or incompatible with the current room.
    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    /// Too few players to start a game.
    #[error("need at least {needed} players, have {have}")]
    NotEnoughPlayers { needed: usize, have: usize },

    /// The room's command channel is full or closed.
    #[error("room {0} is unavailable")]
    Unavailable(RoomId),
}

impl RoomError {
    /// Wire code sent to the client with the error message.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::NotFound(_) | Self::Unavailable(_) => ErrorCode::RoomNotFound,
            Self::RoomFull(_) => ErrorCode::RoomFull,
            Self::AlreadyInRoom(..) => ErrorCode::AlreadyInRoom,
            Self::NotHost(_) => ErrorCode::NotHost,
            Self::NotDrawer(_) => ErrorCode::NotDrawer,
            Self::NotInRoom(_) | Self::InvalidState(_) | Self::NotEnoughPlayers { .. } => {
                ErrorCode::InvalidState
            }
            Self::InvalidSettings(_) => ErrorCode::BadRequest,
        }
    }
}

impl From<ProtocolError> for RoomError {
    fn from(err: ProtocolError) -> Self {
        Self::InvalidSettings(err.to_string())
    }
}
