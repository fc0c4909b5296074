//! A single cancelable delayed callback with a drift-free countdown.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tracing::trace;

/// Identifies one arming of a [`TurnTimer`].
///
/// The callback receives the ticket of the arming that fired. The owner
/// hands it back to [`TurnTimer::fire`] when the alarm is processed; a
/// ticket from an arming that was cleared or replaced is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerTicket(u64);

/// One cancelable countdown.
///
/// Arming a timer that is already armed cancels the previous arming
/// first, so at most one callback per timer is ever pending.
///
/// Remaining time is computed from a monotonic deadline
/// ([`tokio::time::Instant`]) rather than by counting elapsed ticks, so
/// repeated rescheduling never accumulates drift. Using Tokio's clock also
/// means `tokio::time::pause()` drives it in tests.
///
/// # Cancellation
///
/// The callback runs on a spawned task and usually just posts a message
/// to the owner. Two guards keep a cancelled arming from having an
/// effect:
///
/// 1. the task checks the live epoch right before invoking the callback;
/// 2. the owner calls [`fire`](Self::fire) with the ticket when it
///    processes the posted message, which fails if [`clear`](Self::clear)
///    or a new [`start`](Self::start) ran in between.
#[derive(Debug)]
pub struct TurnTimer {
    /// Epoch of the current arming, `0` when idle. Shared with the task.
    live: Arc<AtomicU64>,
    epoch: u64,
    deadline: Option<Instant>,
    task: Option<JoinHandle<()>>,
}

impl TurnTimer {
    pub fn new() -> Self {
        Self {
            live: Arc::new(AtomicU64::new(0)),
            epoch: 0,
            deadline: None,
            task: None,
        }
    }

    /// Arms the timer to call `on_fire` after `after`.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start<F>(&mut self, after: Duration, on_fire: F) -> TimerTicket
    where
        F: FnOnce(TimerTicket) + Send + 'static,
    {
        self.clear();

        self.epoch += 1;
        let ticket = TimerTicket(self.epoch);
        let deadline = Instant::now() + after;

        self.live.store(ticket.0, Ordering::Release);
        self.deadline = Some(deadline);

        let live = Arc::clone(&self.live);
        self.task = Some(tokio::spawn(async move {
            time::sleep_until(deadline).await;
            if live.load(Ordering::Acquire) == ticket.0 {
                on_fire(ticket);
            } else {
                trace!(epoch = ticket.0, "timer superseded before firing");
            }
        }));

        ticket
    }

    /// Cancels the pending callback, if any, without firing it.
    pub fn clear(&mut self) {
        self.live.store(0, Ordering::Release);
        self.deadline = None;
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    /// Accepts a fired ticket.
    ///
    /// Returns `true` and disarms the timer if `ticket` belongs to the
    /// current arming. Returns `false` for anything stale.
    pub fn fire(&mut self, ticket: TimerTicket) -> bool {
        if !self.is_current(ticket) {
            return false;
        }
        self.live.store(0, Ordering::Release);
        self.deadline = None;
        self.task = None;
        true
    }

    /// Whether `ticket` belongs to the current, still-armed arming.
    pub fn is_current(&self, ticket: TimerTicket) -> bool {
        self.deadline.is_some() && self.live.load(Ordering::Acquire) == ticket.0
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// Time until the callback is due. Zero when idle.
    pub fn time_left(&self) -> Duration {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
            .unwrap_or(Duration::ZERO)
    }

    /// [`time_left`](Self::time_left) in whole seconds, rounded up, so a
    /// freshly armed 80 s timer reports 80.
    pub fn secs_left(&self) -> u32 {
        let left = self.time_left();
        let secs = left.as_secs() + u64::from(left.subsec_nanos() > 0);
        u32::try_from(secs).unwrap_or(u32::MAX)
    }
}

impl Default for TurnTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TurnTimer {
    fn drop(&mut self) {
        self.clear();
    }
}
