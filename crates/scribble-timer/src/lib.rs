//! Turn timing for Scribble.
//!
//! - [`TurnTimer`]: one cancelable delayed callback per concern (turn
//!   end, each hint check, pacing pauses) with a drift-free
//!   remaining-time query.
//! - [`HintSchedule`]: the pure plan of when hint checks fire.
//!
//! # Integration
//!
//! Timers never touch room state. The callback posts an alarm into the
//! room actor's mailbox, and the actor validates the ticket before acting:
//!
//! ```ignore
//! let tx = alarms.clone();
//! timer.start(Duration::from_secs(80), move |ticket| {
//!     let _ = tx.send(AlarmFired { alarm: Alarm::MatchTimeout, ticket });
//! });
//!
//! // later, inside the actor loop
//! if timer.fire(fired.ticket) {
//!     // close the turn
//! }
//! ```

mod hints;
mod turn;

pub use hints::{HintSchedule, hint_offsets};
pub use turn::{TimerTicket, TurnTimer};
