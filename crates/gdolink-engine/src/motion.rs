//! Door travel tracking and position estimation.
//!
//! The motor unit never reports a position, only discrete states. This
//! module turns "started opening at T from position P" plus a calibrated
//! full-traversal duration into a continuous estimate, and measures the
//! calibration itself whenever a traversal runs terminal to terminal.
//!
//! Everything here is derived state: it can be dropped and rebuilt from
//! the next traversal, and it never owns the canonical door state.

use gdolink_core::constants::{
    DOOR_POSITION_CLOSED, DOOR_POSITION_OPEN, DOOR_POSITION_UNKNOWN,
};
use std::time::Instant;

/// Direction of an in-progress traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TravelDirection {
    Opening,
    Closing,
}

impl TravelDirection {
    /// Position change per second, as a sign.
    fn sign(self) -> f32 {
        match self {
            TravelDirection::Opening => 1.0,
            TravelDirection::Closing => -1.0,
        }
    }

    /// The terminal position a full traversal starts from.
    fn start_terminal(self) -> f32 {
        match self {
            TravelDirection::Opening => DOOR_POSITION_CLOSED,
            TravelDirection::Closing => DOOR_POSITION_OPEN,
        }
    }
}

/// Tracks the traversal currently in progress, if any.
#[derive(Debug, Default)]
pub struct DoorTravel {
    direction: Option<TravelDirection>,
    started_at: Option<Instant>,
    start_position: f32,
}

impl DoorTravel {
    pub fn new() -> Self {
        Self {
            direction: None,
            started_at: None,
            start_position: DOOR_POSITION_UNKNOWN,
        }
    }

    /// Record the start of a traversal.
    pub fn begin(&mut self, direction: TravelDirection, now: Instant, start_position: f32) {
        self.direction = Some(direction);
        self.started_at = Some(now);
        self.start_position = start_position;
    }

    /// Drop any in-progress traversal (stop, reversal, lost sync).
    pub fn abort(&mut self) {
        self.direction = None;
        self.started_at = None;
        self.start_position = DOOR_POSITION_UNKNOWN;
    }

    /// Complete a traversal in `direction`.
    ///
    /// Returns the elapsed seconds when the traversal ran from the far
    /// terminal (a full run, usable as calibration); `None` for partial
    /// runs, direction mismatches, or when nothing was in progress.
    pub fn finish(&mut self, direction: TravelDirection, now: Instant) -> Option<f32> {
        let elapsed = match (self.direction, self.started_at) {
            (Some(current), Some(started_at)) if current == direction => {
                let full_run = self.start_position == direction.start_terminal();
                full_run.then(|| now.duration_since(started_at).as_secs_f32())
            }
            _ => None,
        };
        self.abort();
        elapsed
    }

    /// Estimate the current position, clamped to [0, 1].
    ///
    /// Needs an in-progress traversal with a known start position and a
    /// calibrated duration for its direction; otherwise `None`.
    pub fn estimate(
        &self,
        now: Instant,
        opening_duration: f32,
        closing_duration: f32,
    ) -> Option<f32> {
        let direction = self.direction?;
        let started_at = self.started_at?;
        if self.start_position < 0.0 {
            return None;
        }

        let duration = match direction {
            TravelDirection::Opening => opening_duration,
            TravelDirection::Closing => closing_duration,
        };
        if duration <= 0.0 {
            return None;
        }

        let elapsed = now.duration_since(started_at).as_secs_f32();
        let position = self.start_position + direction.sign() * elapsed / duration;
        Some(position.clamp(DOOR_POSITION_CLOSED, DOOR_POSITION_OPEN))
    }

    /// Direction of the traversal in progress.
    #[must_use]
    pub fn direction(&self) -> Option<TravelDirection> {
        self.direction
    }

    /// Whether a traversal is being tracked.
    #[must_use]
    pub fn in_progress(&self) -> bool {
        self.direction.is_some()
    }

    /// Position the current traversal started from.
    #[must_use]
    pub fn start_position(&self) -> f32 {
        self.start_position
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_estimate_progresses_with_time() {
        let mut travel = DoorTravel::new();
        let start = Instant::now();
        travel.begin(TravelDirection::Opening, start, 0.0);

        let halfway = travel
            .estimate(start + Duration::from_secs(5), 10.0, 10.0)
            .unwrap();
        assert!((halfway - 0.5).abs() < 1e-3);
    }

    #[test]
    fn test_estimate_clamps_to_unit_range() {
        let mut travel = DoorTravel::new();
        let start = Instant::now();

        travel.begin(TravelDirection::Opening, start, 0.0);
        let overshoot = travel
            .estimate(start + Duration::from_secs(60), 10.0, 10.0)
            .unwrap();
        assert_eq!(overshoot, 1.0);

        travel.begin(TravelDirection::Closing, start, 1.0);
        let undershoot = travel
            .estimate(start + Duration::from_secs(60), 10.0, 10.0)
            .unwrap();
        assert_eq!(undershoot, 0.0);
    }

    #[test]
    fn test_estimate_requires_calibration() {
        let mut travel = DoorTravel::new();
        let start = Instant::now();
        travel.begin(TravelDirection::Opening, start, 0.0);

        assert_eq!(travel.estimate(start + Duration::from_secs(1), 0.0, 0.0), None);
    }

    #[test]
    fn test_estimate_requires_known_start() {
        let mut travel = DoorTravel::new();
        let start = Instant::now();
        travel.begin(TravelDirection::Opening, start, DOOR_POSITION_UNKNOWN);

        assert_eq!(travel.estimate(start + Duration::from_secs(1), 10.0, 10.0), None);
    }

    #[test]
    fn test_finish_full_run_yields_calibration() {
        let mut travel = DoorTravel::new();
        let start = Instant::now();
        travel.begin(TravelDirection::Opening, start, 0.0);

        let elapsed = travel
            .finish(TravelDirection::Opening, start + Duration::from_secs(12))
            .unwrap();
        assert!((elapsed - 12.0).abs() < 0.1);
        assert!(!travel.in_progress());
    }

    #[test]
    fn test_finish_partial_run_yields_nothing() {
        let mut travel = DoorTravel::new();
        let start = Instant::now();
        travel.begin(TravelDirection::Opening, start, 0.4);

        assert_eq!(
            travel.finish(TravelDirection::Opening, start + Duration::from_secs(5)),
            None
        );
    }

    #[test]
    fn test_finish_direction_mismatch_yields_nothing() {
        let mut travel = DoorTravel::new();
        let start = Instant::now();
        travel.begin(TravelDirection::Closing, start, 1.0);

        // Door reversed and reported fully open instead.
        assert_eq!(
            travel.finish(TravelDirection::Opening, start + Duration::from_secs(5)),
            None
        );
        assert!(!travel.in_progress());
    }

    #[test]
    fn test_abort_clears_state() {
        let mut travel = DoorTravel::new();
        travel.begin(TravelDirection::Opening, Instant::now(), 0.0);
        travel.abort();

        assert!(!travel.in_progress());
        assert_eq!(travel.start_position(), DOOR_POSITION_UNKNOWN);
    }
}
