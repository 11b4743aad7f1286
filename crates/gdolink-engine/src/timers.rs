//! Deadline timers for the poll loop.
//!
//! All waiting in the engine is expressed as named deadlines checked each
//! tick; cancellation is simply removing the name. There is exactly one
//! deadline per [`TimerId`], so rescheduling replaces the previous one.

use std::time::{Duration, Instant};

/// The engine's named timers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerId {
    /// Periodic obstruction pulse-counter sampling.
    ObstructionSample,
    /// Periodic door-position estimate while the door moves.
    PositionSample,
    /// Door-action resend window.
    DoorCommandRetry,
    /// Status-response window during sync.
    SyncStatus,
    /// Return motion to clear after a detection.
    MotionClear,
    /// Timed stop for a move-to-position command.
    MoveStop,
    /// Deferred close after the close-with-alert warning.
    AlertClose,
}

/// A small set of named one-shot deadlines.
#[derive(Debug, Default)]
pub struct Timers {
    deadlines: Vec<(TimerId, Instant)>,
}

impl Timers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm (or re-arm) `id` to fire after `delay`.
    pub fn schedule(&mut self, id: TimerId, delay: Duration) {
        self.cancel(id);
        self.deadlines.push((id, Instant::now() + delay));
    }

    /// Disarm `id`. Returns whether it was armed.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        let before = self.deadlines.len();
        self.deadlines.retain(|(timer, _)| *timer != id);
        before != self.deadlines.len()
    }

    /// Remove and return every timer whose deadline has passed, earliest
    /// first.
    pub fn due(&mut self, now: Instant) -> Vec<TimerId> {
        let mut fired: Vec<(TimerId, Instant)> = Vec::new();
        self.deadlines.retain(|entry| {
            if entry.1 <= now {
                fired.push(*entry);
                false
            } else {
                true
            }
        });
        fired.sort_by_key(|entry| entry.1);
        fired.into_iter().map(|entry| entry.0).collect()
    }

    /// Whether `id` is currently armed.
    #[must_use]
    pub fn is_scheduled(&self, id: TimerId) -> bool {
        self.deadlines.iter().any(|(timer, _)| *timer == id)
    }
}
