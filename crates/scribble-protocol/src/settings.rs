//! Per-room game settings and the single-key updates the host sends
//! from the lobby.

use serde::{Deserialize, Serialize};

use crate::ProtocolError;

/// Host-editable settings for one room.
///
/// Only mutable while the room is waiting in the lobby. Restored to
/// [`Settings::default`] when a game finishes and the room restarts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Seat limit. Joins beyond this are rejected with `ROOM_FULL`.
    pub total_players: usize,
    /// Number of rounds; every player draws once per round.
    pub max_rounds: u32,
    /// Seconds each drawer gets.
    pub draw_time: u32,
    /// Maximum number of hint reveals per turn.
    pub hints: u32,
    /// Number of word candidates offered to the drawer.
    pub choice_count: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            total_players: 8,
            max_rounds: 3,
            draw_time: 80,
            hints: 2,
            choice_count: 3,
        }
    }
}

impl Settings {
    pub const TOTAL_PLAYERS: (usize, usize) = (2, 20);
    pub const MAX_ROUNDS: (u32, u32) = (1, 10);
    pub const DRAW_TIME: (u32, u32) = (15, 240);
    pub const HINTS: (u32, u32) = (0, 5);
    pub const CHOICE_COUNT: (usize, usize) = (1, 5);

    /// Checks every field against its accepted range.
    ///
    /// # Errors
    /// Returns [`ProtocolError::InvalidMessage`] naming the first field
    /// that is out of range.
    pub fn validate(&self) -> Result<(), ProtocolError> {
        check("total_players", self.total_players, Self::TOTAL_PLAYERS)?;
        check("max_rounds", self.max_rounds, Self::MAX_ROUNDS)?;
        check("draw_time", self.draw_time, Self::DRAW_TIME)?;
        check("hints", self.hints, Self::HINTS)?;
        check("choice_count", self.choice_count, Self::CHOICE_COUNT)?;
        Ok(())
    }

    /// Returns a copy with one field replaced.
    pub fn with_update(mut self, update: SettingUpdate) -> Self {
        match update {
            SettingUpdate::TotalPlayers(v) => self.total_players = v,
            SettingUpdate::MaxRounds(v) => self.max_rounds = v,
            SettingUpdate::DrawTime(v) => self.draw_time = v,
            SettingUpdate::Hints(v) => self.hints = v,
            SettingUpdate::ChoiceCount(v) => self.choice_count = v,
        }
        self
    }
}

fn check<T: PartialOrd + std::fmt::Display>(
    field: &str,
    value: T,
    (min, max): (T, T),
) -> Result<(), ProtocolError> {
    if value < min || value > max {
        return Err(ProtocolError::InvalidMessage(format!(
            "{field} must be between {min} and {max}, got {value}"
        )));
    }
    Ok(())
}

/// A single-setting change sent by the host.
///
/// Adjacently tagged: `{ "key": "draw_time", "value": 60 }`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "key", content = "value", rename_all = "snake_case")]
pub enum SettingUpdate {
    TotalPlayers(usize),
    MaxRounds(u32),
    DrawTime(u32),
    Hints(u32),
    ChoiceCount(usize),
}
