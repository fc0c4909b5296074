//! Wire types: identities, recipients, and the closed inbound/outbound
//! message sets.
//!
//! Every client action and server event has exactly one variant here.
//! Both enums are internally tagged on `"type"`, so a chat message is
//! `{ "type": "Chat", "text": "apple" }` on the wire.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{ProtocolError, SettingUpdate, Settings};

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// Opaque player identifier. The gateway derives it from the connection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub String);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PlayerId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Opaque room identifier, generated outside the room and only stored.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(pub String);

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RoomId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Recipient
// ---------------------------------------------------------------------------

/// Who should receive an outbound event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recipient {
    /// Every player in the room.
    All,
    /// One player.
    Player(PlayerId),
    /// Everyone except the listed players. Hints skip the drawer and
    /// everybody who already guessed.
    AllExcept(Vec<PlayerId>),
}

impl Recipient {
    /// Everyone except a single player.
    pub fn all_but(id: &PlayerId) -> Self {
        Self::AllExcept(vec![id.clone()])
    }

    /// Returns `true` if `player` is addressed.
    pub fn includes(&self, player: &PlayerId) -> bool {
        match self {
            Self::All => true,
            Self::Player(id) => id == player,
            Self::AllExcept(excluded) => !excluded.contains(player),
        }
    }
}

// ---------------------------------------------------------------------------
// Small shared shapes
// ---------------------------------------------------------------------------

/// Room visibility. Public rooms are reachable through quick join.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Visibility {
    Public,
    Private,
}

/// How a chat line should be rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChatMode {
    Normal,
    SystemInfo,
    SystemSuccess,
}

/// A player as shown in member lists. In `EndMatch` the `score` field is
/// the delta earned this turn, everywhere else the cumulative total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerInfo {
    pub id: PlayerId,
    pub name: String,
    pub score: u32,
}

/// What a player joining mid-game needs to render the current turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LiveState {
    /// Lobby, pacing pause, or results screen.
    Idle,
    /// A drawer is picking a word.
    Choosing { drawer_name: String },
    /// A drawer is drawing.
    Drawing { masked_word: String, time_left: u32 },
}

/// Full room state handed to a player on create/join.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomSnapshot {
    pub room_id: RoomId,
    pub host_id: PlayerId,
    pub players: Vec<PlayerInfo>,
    pub settings: Settings,
    pub round: u32,
    pub live: LiveState,
}

/// The `Choosing` event as seen by the drawer vs everyone else.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum ChoosingView {
    Drawer { choices: Vec<String> },
    Guesser { drawer_name: String },
}

/// The `StartMatch` event as seen by the drawer vs everyone else.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum MatchView {
    Drawer { word: String },
    Guesser { masked_word: String },
}

/// Machine-readable rejection reason sent with [`ServerEvent::Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    RoomFull,
    RoomNotFound,
    AlreadyInRoom,
    NotHost,
    NotDrawer,
    InvalidState,
    BadRequest,
}

// ---------------------------------------------------------------------------
// Inbound
// ---------------------------------------------------------------------------

pub const MAX_NAME_LEN: usize = 20;
pub const MAX_CHAT_LEN: usize = 100;

/// Everything a client may send.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientAction {
    /// Open a private room with the sender as host.
    Create { name: String },
    /// Enter an existing room by id.
    Join { room_id: RoomId, name: String },
    /// Enter any public room with a free seat, or open a new public one.
    QuickJoin { name: String },
    /// Leave the current room.
    Leave,
    /// Host only, lobby only.
    UpdateSetting { update: SettingUpdate },
    /// Host only, lobby only.
    StartGame { settings: Settings },
    /// Drawer only, while choosing.
    ChooseWord { word: String },
    /// Chat line, also evaluated as a guess.
    Chat { text: String },
    /// Drawer only. Relayed verbatim to the rest of the room.
    Drawing { data: serde_json::Value },
}

impl ClientAction {
    /// Normalizes and range-checks user supplied text and settings.
    ///
    /// Names and chat are trimmed. Anything that would reach the room
    /// empty or oversized is rejected here.
    ///
    /// # Errors
    /// Returns [`ProtocolError::InvalidMessage`] describing the problem.
    pub fn validated(self) -> Result<Self, ProtocolError> {
        Ok(match self {
            Self::Create { name } => Self::Create {
                name: clean_text("name", &name, MAX_NAME_LEN)?,
            },
            Self::Join { room_id, name } => Self::Join {
                room_id,
                name: clean_text("name", &name, MAX_NAME_LEN)?,
            },
            Self::QuickJoin { name } => Self::QuickJoin {
                name: clean_text("name", &name, MAX_NAME_LEN)?,
            },
            Self::UpdateSetting { update } => {
                Settings::default().with_update(update).validate()?;
                Self::UpdateSetting { update }
            }
            Self::StartGame { settings } => {
                settings.validate()?;
                Self::StartGame { settings }
            }
            Self::Chat { text } => Self::Chat {
                text: clean_text("chat", &text, MAX_CHAT_LEN)?,
            },
            other => other,
        })
    }
}

fn clean_text(field: &str, raw: &str, max: usize) -> Result<String, ProtocolError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ProtocolError::InvalidMessage(format!("{field} is empty")));
    }
    if trimmed.chars().count() > max {
        return Err(ProtocolError::InvalidMessage(format!(
            "{field} is longer than {max} characters"
        )));
    }
    Ok(trimmed.to_owned())
}

// ---------------------------------------------------------------------------
// Outbound
// ---------------------------------------------------------------------------

/// Everything the server may push to a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerEvent {
    RoomCreated { snapshot: RoomSnapshot },
    RoomJoined { snapshot: RoomSnapshot },
    /// Broadcast to everyone but the new host.
    HostInfo { host_id: PlayerId },
    /// Sent to the new host only.
    SetHost { host_id: PlayerId },
    /// Full member list, sorted by score once a game has started.
    RoomMembers { players: Vec<PlayerInfo> },
    SettingsUpdated { settings: Settings },
    Chat { name: String, text: String, mode: ChatMode },
    RoundInfo { round: u32 },
    Choosing { view: ChoosingView },
    StartMatch { view: MatchView, draw_time: u32 },
    /// Sent to a guesser who just got the word right.
    Guessed { word: String },
    Hint { masked_word: String },
    ReduceTime { time_left: u32 },
    /// Per-player deltas for the turn that just closed.
    EndMatch { scores: Vec<PlayerInfo>, word: String },
    /// Final standings, highest score first.
    Results { players: Vec<PlayerInfo> },
    Restart,
    DrawingData { data: serde_json::Value },
    /// Connected clients across the whole server, rooms or not.
    OnlinePlayers { count: usize },
    Error { code: ErrorCode, message: String },
}
