//! Shared constants for the Security+ 2.0 door controller.
//!
//! Timing defaults live with the engine configuration; this module only
//! holds the values that several crates agree on: position sentinels and
//! the wire-level identity defaults.

/// Sentinel for an unknown door position.
///
/// The position estimate is derived from elapsed travel time against a
/// calibrated traversal duration. Until one full traversal has been
/// observed there is nothing to derive from, and the observable carries
/// this value instead of a guess.
pub const DOOR_POSITION_UNKNOWN: f32 = -1.0;

/// Sentinel for an unknown remaining travel distance.
pub const DOOR_DELTA_UNKNOWN: f32 = -2.0;

/// Fully-open door position.
pub const DOOR_POSITION_OPEN: f32 = 1.0;

/// Fully-closed door position.
pub const DOOR_POSITION_CLOSED: f32 = 0.0;

/// Default client id used when none was provisioned.
///
/// Matches the factory default of wall-panel controllers on the same bus;
/// installations with more than one controller must assign unique ids.
pub const DEFAULT_CLIENT_ID: u32 = 0x539;

/// Client ids are 24-bit on the wire.
pub const CLIENT_ID_MASK: u32 = 0xff_ffff;

/// Time-to-close value meaning "unset / unknown".
pub const TTC_UNSET: u16 = 0xffff;
