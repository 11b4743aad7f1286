use crate::{Result, constants::CLIENT_ID_MASK, error::Error};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Bus participant identifier (24 bits on the wire).
///
/// Every controller sharing the two-wire bus embeds its client id in each
/// transmitted frame so the motor unit can tell senders apart. The id is
/// fixed for the lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClientId(u32);

impl ClientId {
    /// Create a new client id with validation.
    ///
    /// # Errors
    /// Returns `Error::InvalidClientId` if the value does not fit in 24 bits.
    pub fn new(id: u32) -> Result<Self> {
        if id & !CLIENT_ID_MASK != 0 {
            return Err(Error::InvalidClientId(id));
        }
        Ok(ClientId(id))
    }

    /// Get the raw id.
    #[must_use]
    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

impl Default for ClientId {
    fn default() -> Self {
        ClientId(crate::constants::DEFAULT_CLIENT_ID)
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:#08x}", self.0)
    }
}

/// Door travel state as reported by the motor unit.
///
/// The wire codes double as the STATUS payload encoding: `Open`/`Closed`
/// are stable states, `Opening`/`Closing` are transient (motor running with
/// a known direction), and `Stopped` means travel was interrupted midway.
/// `Unknown` is the initial state before the first status exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum DoorState {
    Unknown = 0,
    Open = 1,
    Closed = 2,
    Stopped = 3,
    Opening = 4,
    Closing = 5,
}

impl DoorState {
    /// Create a door state from its wire code.
    ///
    /// # Errors
    /// Returns `Error::InvalidStateCode` if the code is not 0-5.
    #[inline]
    pub fn from_u8(value: u8) -> Result<Self> {
        match value {
            0 => Ok(DoorState::Unknown),
            1 => Ok(DoorState::Open),
            2 => Ok(DoorState::Closed),
            3 => Ok(DoorState::Stopped),
            4 => Ok(DoorState::Opening),
            5 => Ok(DoorState::Closing),
            _ => Err(Error::InvalidStateCode {
                field: "door state",
                code: value,
            }),
        }
    }

    /// Convert the door state to its wire code.
    #[inline]
    #[must_use]
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    /// Returns `true` while the motor is moving the door.
    #[inline]
    #[must_use]
    pub fn is_transient(self) -> bool {
        matches!(self, DoorState::Opening | DoorState::Closing)
    }

    /// Returns `true` for states the door can rest in.
    #[inline]
    #[must_use]
    pub fn is_stable(self) -> bool {
        matches!(
            self,
            DoorState::Open | DoorState::Closed | DoorState::Stopped
        )
    }
}

impl fmt::Display for DoorState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DoorState::Unknown => write!(f, "unknown"),
            DoorState::Open => write!(f, "open"),
            DoorState::Closed => write!(f, "closed"),
            DoorState::Stopped => write!(f, "stopped"),
            DoorState::Opening => write!(f, "opening"),
            DoorState::Closing => write!(f, "closing"),
        }
    }
}

/// Worklight state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum LightState {
    Off = 0,
    On = 1,
    Unknown = 2,
}

impl LightState {
    /// # Errors
    /// Returns `Error::InvalidStateCode` if the code is not 0-2.
    #[inline]
    pub fn from_u8(value: u8) -> Result<Self> {
        match value {
            0 => Ok(LightState::Off),
            1 => Ok(LightState::On),
            2 => Ok(LightState::Unknown),
            _ => Err(Error::InvalidStateCode {
                field: "light state",
                code: value,
            }),
        }
    }

    #[inline]
    #[must_use]
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    /// The opposite state, used for optimistic toggle updates.
    #[inline]
    #[must_use]
    pub fn toggled(self) -> Self {
        match self {
            LightState::Off => LightState::On,
            LightState::On => LightState::Off,
            LightState::Unknown => LightState::Unknown,
        }
    }
}

impl fmt::Display for LightState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            LightState::Off => write!(f, "off"),
            LightState::On => write!(f, "on"),
            LightState::Unknown => write!(f, "unknown"),
        }
    }
}

/// Remote lockout ("vacation lock") state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum LockState {
    Unlocked = 0,
    Locked = 1,
    Unknown = 2,
}

impl LockState {
    /// # Errors
    /// Returns `Error::InvalidStateCode` if the code is not 0-2.
    #[inline]
    pub fn from_u8(value: u8) -> Result<Self> {
        match value {
            0 => Ok(LockState::Unlocked),
            1 => Ok(LockState::Locked),
            2 => Ok(LockState::Unknown),
            _ => Err(Error::InvalidStateCode {
                field: "lock state",
                code: value,
            }),
        }
    }

    #[inline]
    #[must_use]
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    #[inline]
    #[must_use]
    pub fn toggled(self) -> Self {
        match self {
            LockState::Unlocked => LockState::Locked,
            LockState::Locked => LockState::Unlocked,
            LockState::Unknown => LockState::Unknown,
        }
    }
}

impl fmt::Display for LockState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            LockState::Unlocked => write!(f, "unlocked"),
            LockState::Locked => write!(f, "locked"),
            LockState::Unknown => write!(f, "unknown"),
        }
    }
}

/// Hold-open state (suspends the time-to-close countdown).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum HoldState {
    Disabled = 0,
    Enabled = 1,
    Unknown = 2,
}

impl HoldState {
    /// # Errors
    /// Returns `Error::InvalidStateCode` if the code is not 0-2.
    #[inline]
    pub fn from_u8(value: u8) -> Result<Self> {
        match value {
            0 => Ok(HoldState::Disabled),
            1 => Ok(HoldState::Enabled),
            2 => Ok(HoldState::Unknown),
            _ => Err(Error::InvalidStateCode {
                field: "hold state",
                code: value,
            }),
        }
    }

    #[inline]
    #[must_use]
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    #[inline]
    #[must_use]
    pub fn toggled(self) -> Self {
        match self {
            HoldState::Disabled => HoldState::Enabled,
            HoldState::Enabled => HoldState::Disabled,
            HoldState::Unknown => HoldState::Unknown,
        }
    }
}

impl fmt::Display for HoldState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            HoldState::Disabled => write!(f, "disabled"),
            HoldState::Enabled => write!(f, "enabled"),
            HoldState::Unknown => write!(f, "unknown"),
        }
    }
}

/// Safety-beam obstruction classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum ObstructionState {
    Obstructed = 0,
    Clear = 1,
    Unknown = 2,
}

impl ObstructionState {
    /// # Errors
    /// Returns `Error::InvalidStateCode` if the code is not 0-2.
    #[inline]
    pub fn from_u8(value: u8) -> Result<Self> {
        match value {
            0 => Ok(ObstructionState::Obstructed),
            1 => Ok(ObstructionState::Clear),
            2 => Ok(ObstructionState::Unknown),
            _ => Err(Error::InvalidStateCode {
                field: "obstruction state",
                code: value,
            }),
        }
    }

    #[inline]
    #[must_use]
    pub fn to_u8(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for ObstructionState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ObstructionState::Obstructed => write!(f, "obstructed"),
            ObstructionState::Clear => write!(f, "clear"),
            ObstructionState::Unknown => write!(f, "unknown"),
        }
    }
}

/// Motor run state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum MotorState {
    Off = 0,
    On = 1,
    Unknown = 2,
}

impl MotorState {
    /// # Errors
    /// Returns `Error::InvalidStateCode` if the code is not 0-2.
    #[inline]
    pub fn from_u8(value: u8) -> Result<Self> {
        match value {
            0 => Ok(MotorState::Off),
            1 => Ok(MotorState::On),
            2 => Ok(MotorState::Unknown),
            _ => Err(Error::InvalidStateCode {
                field: "motor state",
                code: value,
            }),
        }
    }

    #[inline]
    #[must_use]
    pub fn to_u8(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for MotorState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            MotorState::Off => write!(f, "off"),
            MotorState::On => write!(f, "on"),
            MotorState::Unknown => write!(f, "unknown"),
        }
    }
}

/// Wall-button state echoed on the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum ButtonState {
    Pressed = 0,
    Released = 1,
    Unknown = 2,
}

impl ButtonState {
    /// # Errors
    /// Returns `Error::InvalidStateCode` if the code is not 0-2.
    #[inline]
    pub fn from_u8(value: u8) -> Result<Self> {
        match value {
            0 => Ok(ButtonState::Pressed),
            1 => Ok(ButtonState::Released),
            2 => Ok(ButtonState::Unknown),
            _ => Err(Error::InvalidStateCode {
                field: "button state",
                code: value,
            }),
        }
    }

    #[inline]
    #[must_use]
    pub fn to_u8(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for ButtonState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ButtonState::Pressed => write!(f, "pressed"),
            ButtonState::Released => write!(f, "released"),
            ButtonState::Unknown => write!(f, "unknown"),
        }
    }
}

/// Motion sensor state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum MotionState {
    Clear = 0,
    Detected = 1,
    Unknown = 2,
}

impl MotionState {
    /// # Errors
    /// Returns `Error::InvalidStateCode` if the code is not 0-2.
    #[inline]
    pub fn from_u8(value: u8) -> Result<Self> {
        match value {
            0 => Ok(MotionState::Clear),
            1 => Ok(MotionState::Detected),
            2 => Ok(MotionState::Unknown),
            _ => Err(Error::InvalidStateCode {
                field: "motion state",
                code: value,
            }),
        }
    }

    #[inline]
    #[must_use]
    pub fn to_u8(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for MotionState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            MotionState::Clear => write!(f, "clear"),
            MotionState::Detected => write!(f, "detected"),
            MotionState::Unknown => write!(f, "unknown"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0x539)]
    #[case(0)]
    #[case(0xff_ffff)]
    fn test_client_id_valid(#[case] input: u32) {
        let id = ClientId::new(input).unwrap();
        assert_eq!(id.as_u32(), input);
    }

    #[rstest]
    #[case(0x100_0000)]
    #[case(u32::MAX)]
    fn test_client_id_invalid(#[case] input: u32) {
        assert!(ClientId::new(input).is_err());
    }

    #[test]
    fn test_client_id_default() {
        assert_eq!(ClientId::default().as_u32(), 0x539);
    }

    #[rstest]
    #[case(0, DoorState::Unknown)]
    #[case(1, DoorState::Open)]
    #[case(2, DoorState::Closed)]
    #[case(3, DoorState::Stopped)]
    #[case(4, DoorState::Opening)]
    #[case(5, DoorState::Closing)]
    fn test_door_state_round_trip(#[case] code: u8, #[case] state: DoorState) {
        assert_eq!(DoorState::from_u8(code).unwrap(), state);
        assert_eq!(state.to_u8(), code);
    }

    #[test]
    fn test_door_state_invalid() {
        assert!(DoorState::from_u8(6).is_err());
        assert!(DoorState::from_u8(0xff).is_err());
    }

    #[test]
    fn test_door_state_classes() {
        assert!(DoorState::Opening.is_transient());
        assert!(DoorState::Closing.is_transient());
        assert!(!DoorState::Open.is_transient());

        assert!(DoorState::Open.is_stable());
        assert!(DoorState::Closed.is_stable());
        assert!(DoorState::Stopped.is_stable());
        assert!(!DoorState::Unknown.is_stable());
        assert!(!DoorState::Opening.is_stable());
    }

    #[test]
    fn test_light_state_toggled() {
        assert_eq!(LightState::Off.toggled(), LightState::On);
        assert_eq!(LightState::On.toggled(), LightState::Off);
        assert_eq!(LightState::Unknown.toggled(), LightState::Unknown);
    }

    #[test]
    fn test_lock_state_toggled() {
        assert_eq!(LockState::Unlocked.toggled(), LockState::Locked);
        assert_eq!(LockState::Locked.toggled(), LockState::Unlocked);
        assert_eq!(LockState::Unknown.toggled(), LockState::Unknown);
    }

    #[test]
    fn test_hold_state_toggled() {
        assert_eq!(HoldState::Disabled.toggled(), HoldState::Enabled);
        assert_eq!(HoldState::Enabled.toggled(), HoldState::Disabled);
    }

    #[rstest]
    #[case(3)]
    #[case(0xff)]
    fn test_small_enums_reject_out_of_range(#[case] code: u8) {
        assert!(LightState::from_u8(code).is_err());
        assert!(LockState::from_u8(code).is_err());
        assert!(HoldState::from_u8(code).is_err());
        assert!(ObstructionState::from_u8(code).is_err());
        assert!(MotorState::from_u8(code).is_err());
        assert!(ButtonState::from_u8(code).is_err());
        assert!(MotionState::from_u8(code).is_err());
    }

    #[test]
    fn test_display_formatting() {
        assert_eq!(DoorState::Opening.to_string(), "opening");
        assert_eq!(LightState::On.to_string(), "on");
        assert_eq!(ObstructionState::Obstructed.to_string(), "obstructed");
        assert_eq!(ClientId::default().to_string(), "0x000539");
    }
}
