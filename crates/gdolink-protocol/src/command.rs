//! Command opcode definitions for the Security+ 2.0 bus.
//!
//! Every frame on the bus carries a 12-bit command opcode split across the
//! fixed and data words (high nibble beside the sender id, low byte beside
//! the payload). Commands form query/report pairs: `GetStatus` is answered
//! by `Status`, `TtcGetDuration` by `TtcDuration`, `GetOpenings` by
//! `Openings`, and so on.
//!
//! # Usage
//!
//! ```
//! use gdolink_protocol::Command;
//!
//! let cmd = Command::try_from(0x081).unwrap();
//! assert_eq!(cmd, Command::Status);
//! assert_eq!(cmd.to_u16(), 0x081);
//!
//! // Unrecognized opcodes are an error; the decode boundary maps them
//! // to `Command::Unknown` explicitly.
//! assert!(Command::try_from(0x7777).is_err());
//! assert_eq!(Command::from_wire(0x7777), Command::Unknown);
//! ```

use gdolink_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Command opcodes understood by this controller.
///
/// The set is closed: opcodes observed on the bus that are not listed here
/// decode as [`Command::Unknown`] and are dropped by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u16)]
pub enum Command {
    Unknown = 0x000,

    GetStatus = 0x080,
    Status = 0x081,
    Obstruction1 = 0x084,
    Obstruction2 = 0x085,
    GetExtStatus = 0x0a0,
    ExtStatus = 0x0a1,

    Learn2 = 0x181,
    Lock = 0x18c,

    DoorAction = 0x280,
    Light = 0x281,
    MotorOn = 0x284,
    Motion = 0x285,

    Learn1 = 0x391,
    Ping = 0x392,
    PingResp = 0x393,

    TtcGetDuration = 0x400,
    TtcDuration = 0x401,
    TtcSetDuration = 0x402,
    TtcCancel = 0x408,
    TtcCountdown = 0x40a,

    GetOpenings = 0x48b,
    Openings = 0x48c,
}

impl Command {
    /// Convert the command to its wire opcode.
    #[inline]
    #[must_use]
    pub fn to_u16(self) -> u16 {
        self as u16
    }

    /// Decode-boundary conversion: unrecognized opcodes become `Unknown`.
    #[inline]
    #[must_use]
    pub fn from_wire(value: u16) -> Self {
        Command::try_from(value).unwrap_or(Command::Unknown)
    }

    /// Returns `true` if this command reports state (as opposed to
    /// requesting an action or a query).
    #[must_use]
    pub fn is_report(self) -> bool {
        matches!(
            self,
            Command::Status
                | Command::ExtStatus
                | Command::TtcDuration
                | Command::TtcCountdown
                | Command::Openings
                | Command::MotorOn
                | Command::Motion
        )
    }
}

impl TryFrom<u16> for Command {
    type Error = Error;

    fn try_from(value: u16) -> Result<Self> {
        match value {
            0x000 => Ok(Command::Unknown),
            0x080 => Ok(Command::GetStatus),
            0x081 => Ok(Command::Status),
            0x084 => Ok(Command::Obstruction1),
            0x085 => Ok(Command::Obstruction2),
            0x0a0 => Ok(Command::GetExtStatus),
            0x0a1 => Ok(Command::ExtStatus),
            0x181 => Ok(Command::Learn2),
            0x18c => Ok(Command::Lock),
            0x280 => Ok(Command::DoorAction),
            0x281 => Ok(Command::Light),
            0x284 => Ok(Command::MotorOn),
            0x285 => Ok(Command::Motion),
            0x391 => Ok(Command::Learn1),
            0x392 => Ok(Command::Ping),
            0x393 => Ok(Command::PingResp),
            0x400 => Ok(Command::TtcGetDuration),
            0x401 => Ok(Command::TtcDuration),
            0x402 => Ok(Command::TtcSetDuration),
            0x408 => Ok(Command::TtcCancel),
            0x40a => Ok(Command::TtcCountdown),
            0x48b => Ok(Command::GetOpenings),
            0x48c => Ok(Command::Openings),
            _ => Err(Error::InvalidCommand { code: value }),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}({:#05x})", self, self.to_u16())
    }
}

/// Payload word values and helpers.
///
/// The 24-bit payload word carried beside the command byte has three
/// fields: a low nibble (bits 0-3), "byte1" (bits 8-15) and "byte2"
/// (bits 16-23). Bits 4-7 are reserved for the parity nibble and are
/// always transmitted as zero.
pub mod payload {
    /// Mask of the bits a payload word may use.
    pub const MASK: u32 = 0x00ff_ff0f;

    pub const DOOR_CLOSE: u32 = 0;
    pub const DOOR_OPEN: u32 = 1;
    pub const DOOR_TOGGLE: u32 = 2;
    pub const DOOR_STOP: u32 = 3;

    pub const LIGHT_OFF: u32 = 0;
    pub const LIGHT_ON: u32 = 1;
    pub const LIGHT_TOGGLE: u32 = 2;

    pub const LOCK_OFF: u32 = 0;
    pub const LOCK_ON: u32 = 1;
    pub const LOCK_TOGGLE: u32 = 2;

    // Fixed cancel payloads observed from wall pads; exact meaning of the
    // byte1 values is undocumented, reproduce them verbatim.
    pub const TTC_CANCEL_OFF: u32 = 0x000501;
    pub const TTC_CANCEL_TOGGLE_HOLD: u32 = 0x000401;

    pub const GET_EXT_STATUS: u32 = 1;
    pub const TTC_GET_DURATION: u32 = 1;

    /// Pack a 16-bit quantity into the byte1/byte2 fields
    /// (`value = byte1 << 8 | byte2`).
    #[inline]
    #[must_use]
    pub fn u16_pair(value: u16) -> u32 {
        ((value & 0xff00) as u32) | (((value & 0x00ff) as u32) << 16)
    }

    /// Inverse of [`u16_pair`].
    #[inline]
    #[must_use]
    pub fn parse_u16_pair(payload: u32) -> u16 {
        let byte1 = (payload >> 8) & 0xff;
        let byte2 = (payload >> 16) & 0xff;
        ((byte1 << 8) | byte2) as u16
    }

    /// The low nibble field.
    #[inline]
    #[must_use]
    pub fn nibble(payload: u32) -> u8 {
        (payload & 0xf) as u8
    }

    /// The byte1 field.
    #[inline]
    #[must_use]
    pub fn byte1(payload: u32) -> u8 {
        ((payload >> 8) & 0xff) as u8
    }

    /// The byte2 field.
    #[inline]
    #[must_use]
    pub fn byte2(payload: u32) -> u8 {
        ((payload >> 16) & 0xff) as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0x080, Command::GetStatus)]
    #[case(0x081, Command::Status)]
    #[case(0x0a1, Command::ExtStatus)]
    #[case(0x280, Command::DoorAction)]
    #[case(0x281, Command::Light)]
    #[case(0x284, Command::MotorOn)]
    #[case(0x285, Command::Motion)]
    #[case(0x402, Command::TtcSetDuration)]
    #[case(0x408, Command::TtcCancel)]
    #[case(0x48c, Command::Openings)]
    fn test_opcode_round_trip(#[case] code: u16, #[case] command: Command) {
        assert_eq!(Command::try_from(code).unwrap(), command);
        assert_eq!(command.to_u16(), code);
    }

    #[rstest]
    #[case(0x001)]
    #[case(0x082)]
    #[case(0xfff)]
    fn test_unrecognized_opcode(#[case] code: u16) {
        assert!(Command::try_from(code).is_err());
        assert_eq!(Command::from_wire(code), Command::Unknown);
    }

    #[test]
    fn test_is_report() {
        assert!(Command::Status.is_report());
        assert!(Command::TtcCountdown.is_report());
        assert!(!Command::GetStatus.is_report());
        assert!(!Command::DoorAction.is_report());
    }

    #[test]
    fn test_u16_pair_round_trip() {
        for value in [0u16, 1, 120, 0x1234, 0xffff] {
            let packed = payload::u16_pair(value);
            assert_eq!(packed & !payload::MASK, 0);
            assert_eq!(payload::parse_u16_pair(packed), value);
        }
    }

    #[test]
    fn test_u16_pair_field_placement() {
        // 300 seconds = 0x012c: byte1 carries 0x01, byte2 carries 0x2c.
        let packed = payload::u16_pair(300);
        assert_eq!(payload::byte1(packed), 0x01);
        assert_eq!(payload::byte2(packed), 0x2c);
        assert_eq!(payload::nibble(packed), 0);
    }

    #[test]
    fn test_cancel_payloads_fit_mask() {
        assert_eq!(payload::TTC_CANCEL_OFF & !payload::MASK, 0);
        assert_eq!(payload::TTC_CANCEL_TOGGLE_HOLD & !payload::MASK, 0);
    }
}
