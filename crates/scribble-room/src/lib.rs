//! Rooms for Scribble.
//!
//! Each room runs as an isolated Tokio task (actor model) owning a
//! [`Room`] state machine. Commands and timer alarms share the task, so
//! every reaction runs to completion before the next starts.
//!
//! # Key types
//!
//! - [`Room`]: rounds, turns, hints, guesses, scoring, end of game
//! - [`RoomRegistry`]: creates/destroys rooms, routes players
//! - [`RoomHandle`]: send commands to a running room actor
//! - [`RoomStatus`]: lifecycle state machine
//! - [`RoomConfig`]: server-wide pacing and gameplay constants
//! - [`WordSource`] / [`IndexPicker`]: injectable randomness

mod actor;
mod config;
mod error;
mod registry;
mod room;
pub mod scoring;
mod words;

pub use actor::{PlayerSender, RoomAction, RoomHandle, RoomInfo};
pub use config::{RoomConfig, RoomStatus, TimeCutoff};
pub use error::RoomError;
pub use registry::RoomRegistry;
pub use room::{Alarm, AlarmFired, Outbound, Room};
pub use words::{
    AlphanumericIds, Collaborators, IndexPicker, RandomPicker, RoomIdGenerator, WordList,
    WordSource,
};
