//! Wire protocol for Scribble.
//!
//! - **Types** ([`ClientAction`], [`ServerEvent`], [`Recipient`], ...):
//!   one variant per action or event tag, validated at the gateway
//!   boundary before anything reaches a room.
//! - **Settings** ([`Settings`], [`SettingUpdate`]): host-editable room
//!   rules and their accepted ranges.
//! - **Codec** ([`Codec`], [`JsonCodec`]): bytes in, typed values out.
//!
//! ```text
//! Transport (bytes) → Protocol (ClientAction) → Room (state machine)
//! ```

mod codec;
mod error;
mod settings;
mod types;

pub use codec::{Codec, JsonCodec};
pub use error::ProtocolError;
pub use settings::{SettingUpdate, Settings};
pub use types::{
    ChatMode, ChoosingView, ClientAction, ErrorCode, LiveState, MAX_CHAT_LEN, MAX_NAME_LEN,
    MatchView, PlayerId, PlayerInfo, Recipient, RoomId, RoomSnapshot, ServerEvent, Visibility,
};
