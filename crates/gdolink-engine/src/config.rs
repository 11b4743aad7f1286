//! Engine configuration.

use gdolink_core::ClientId;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tunable parameters of the protocol engine.
///
/// The defaults are the values the hardware was characterized with; tests
/// shrink the timing windows to keep themselves fast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Our identity on the bus.
    pub client_id: ClientId,

    /// How long to wait for a status report confirming a door action
    /// before resending it.
    pub command_retry_delay: Duration,

    /// How many resends of an unconfirmed door action before giving up.
    /// Finite by design; each give-up is logged.
    pub command_retry_limit: u8,

    /// Delay between status queries while syncing.
    pub sync_retry_delay: Duration,

    /// Total status queries attempted by a sync before `sync_failed`.
    pub sync_attempts: u8,

    /// Cadence of door-position estimates while the door is moving.
    pub position_update_period: Duration,

    /// Cadence of obstruction pulse-counter sampling.
    pub obstruction_poll_period: Duration,

    /// Consecutive silent sampling cycles before the beam counts as
    /// obstructed.
    pub obstruction_silent_cycles: u8,

    /// How long a motion report stays `Detected` before clearing.
    pub motion_clear_delay: Duration,

    /// Warning lead time between the light alert and the actual close
    /// for `close_with_alert`.
    pub close_alert_lead: Duration,

    /// Persist the rolling counter every this many increments. Larger
    /// values spare flash wear at the cost of a bigger jump-ahead after
    /// an unclean restart.
    pub persist_interval: u32,

    /// Derive obstruction state from status reports instead of the beam
    /// pulse counter (for installations without the wired sensor input).
    pub obstruction_from_status: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            client_id: ClientId::default(),
            command_retry_delay: Duration::from_millis(1500),
            command_retry_limit: 1,
            sync_retry_delay: Duration::from_millis(1500),
            sync_attempts: 3,
            position_update_period: Duration::from_millis(500),
            obstruction_poll_period: Duration::from_millis(50),
            obstruction_silent_cycles: 3,
            motion_clear_delay: Duration::from_millis(3000),
            close_alert_lead: Duration::from_millis(3000),
            persist_interval: 8,
            obstruction_from_status: false,
        }
    }
}
