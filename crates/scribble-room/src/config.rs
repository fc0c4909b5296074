//! Room configuration and status machine.

use std::time::Duration;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// RoomConfig
// ---------------------------------------------------------------------------

/// One early-end rule: once the share of guessers still missing the word
/// is at or below `unguessed_percent`, the turn is cut to `fraction` of
/// the draw time (if that is shorter than what is left).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeCutoff {
    pub unguessed_percent: u32,
    pub fraction: f64,
}

impl TimeCutoff {
    /// Remaining seconds this cutoff shrinks the turn to.
    pub fn threshold(&self, draw_time: u32) -> u32 {
        (f64::from(draw_time) * self.fraction).floor() as u32
    }
}

/// Server-wide tuning shared by every room.
///
/// Pacing delays are the fixed pauses between phases. The cutoffs and
/// the reveal cap are gameplay constants kept configurable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomConfig {
    /// Minimum players required to start a game.
    pub min_players: usize,

    /// Pause between the round announcement and the first drawer pick.
    pub announce_delay: Duration,

    /// Pause after a turn's results before the next drawer is picked.
    pub match_pacing: Duration,

    /// How long the final standings stay up before the room resets.
    pub results_pacing: Duration,

    /// How long a drawer may take to pick a word before one is picked
    /// for them.
    pub choice_timeout: Duration,

    /// Early-end rules, checked after every correct guess.
    pub cutoffs: [TimeCutoff; 3],

    /// At most this fraction of the word's characters is revealed by
    /// hints.
    pub hint_reveal_cap: f64,

    /// Command channel size for room actors.
    pub channel_size: usize,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            min_players: 2,
            announce_delay: Duration::from_secs(3),
            match_pacing: Duration::from_secs(5),
            results_pacing: Duration::from_secs(4),
            choice_timeout: Duration::from_secs(15),
            cutoffs: [
                TimeCutoff {
                    unguessed_percent: 70,
                    fraction: 0.72,
                },
                TimeCutoff {
                    unguessed_percent: 40,
                    fraction: 0.42,
                },
                TimeCutoff {
                    unguessed_percent: 10,
                    fraction: 0.12,
                },
            ],
            hint_reveal_cap: 0.5,
            channel_size: 64,
        }
    }
}

impl RoomConfig {
    /// Maximum number of characters hints may reveal in a word of
    /// `word_len` characters.
    pub fn reveal_cap(&self, word_len: usize) -> u32 {
        (word_len as f64 * self.hint_reveal_cap).floor() as u32
    }
}

// ---------------------------------------------------------------------------
// RoomStatus
// ---------------------------------------------------------------------------

/// The lifecycle state of a room.
///
/// ```text
/// Waiting → InProgress ⇄ InMatch
///               ↓           ↓
///            Finished ←─────┘
///               ↓
///            Waiting
/// ```
///
/// - **Waiting**: lobby. Settings editable, game not started.
/// - **InProgress**: a game is running between turns (announcement,
///   drawer choosing, post-turn pacing).
/// - **InMatch**: a drawer is drawing; guesses are evaluated.
/// - **Finished**: final standings shown; the room resets to Waiting after
///   the results pacing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoomStatus {
    Waiting,
    InProgress,
    InMatch,
    Finished,
}

impl RoomStatus {
    /// Returns `true` while a game is running.
    pub fn is_playing(&self) -> bool {
        matches!(self, Self::InProgress | Self::InMatch)
    }

    /// Returns `true` if moving to `target` is a legal transition.
    pub fn can_transition_to(self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Waiting, Self::InProgress)
                | (Self::InProgress, Self::InMatch)
                | (Self::InMatch, Self::InProgress)
                | (Self::InProgress, Self::Finished)
                | (Self::InMatch, Self::Finished)
                | (Self::Finished, Self::Waiting)
        )
    }
}

impl std::fmt::Display for RoomStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Waiting => write!(f, "Waiting"),
            Self::InProgress => write!(f, "InProgress"),
            Self::InMatch => write!(f, "InMatch"),
            Self::Finished => write!(f, "Finished"),
        }
    }
}
