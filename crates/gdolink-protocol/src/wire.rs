//! Frame encoder/decoder with the rolling-code obfuscation.
//!
//! # Frame layout
//!
//! A frame is 19 bytes: the 3-byte preamble (`55 01 00`) followed by two
//! 8-byte halves. Three quantities are spread across the halves:
//!
//! - the 28-bit **rolling code**, bit-reversed and re-expressed as 18
//!   base-3 digits (nine per half);
//! - the 40-bit **fixed word**: command high nibble at bits 32-35, the
//!   24-bit sender client id at bits 0-23;
//! - the 32-bit **data word**: payload `<< 8 | command low byte`, with a
//!   parity nibble at bits 12-15 (XOR of the fixed word's command nibble
//!   and every other data nibble).
//!
//! Each half carries the high or low portion of the fixed (20 bits) and
//! data (16 bits) words. Within a half, the first two ternary digits form
//! an indicator (0-8) that selects how the 36 payload bits, split into
//! three 12-bit parts, are inverted and reordered; the remaining seven
//! digits ride alongside, and a 10-bit residue closes the half so the
//! decoder can reject corrupted or misaligned frames before acting on
//! them.
//!
//! Decoding is the exact inverse and fails on: missing preamble, residue
//! mismatch, an indicator or ternary digit out of range, a rolling value
//! exceeding 28 bits, or a parity mismatch. No state is kept between
//! calls; replay protection lives in [`RollingCodeState`].
//!
//! [`RollingCodeState`]: crate::rolling::RollingCodeState

use crate::command::{Command, payload};
use crate::packet::{PACKET_LENGTH, PREAMBLE, WirePacket};
use gdolink_core::{ClientId, Error, Result};

/// Rolling codes are 28-bit.
pub const ROLLING_CODE_BITS: u32 = 28;

/// Modulus for rolling-code arithmetic.
pub const ROLLING_CODE_MODULUS: u32 = 1 << ROLLING_CODE_BITS;

/// Prime modulus for the per-half residue check.
const RESIDUE_MODULUS: u64 = 1021;

/// Part permutation per indicator value.
const ORDER: [[usize; 3]; 9] = [
    [0, 1, 2],
    [0, 2, 1],
    [1, 0, 2],
    [1, 2, 0],
    [2, 0, 1],
    [2, 1, 0],
    [0, 2, 1],
    [1, 0, 2],
    [2, 1, 0],
];

/// Part inversion per indicator value.
const INVERT: [[bool; 3]; 9] = [
    [false, false, false],
    [true, false, true],
    [false, true, false],
    [true, true, false],
    [false, false, true],
    [true, false, false],
    [true, true, true],
    [false, true, true],
    [false, true, true],
];

/// A successfully decoded frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decoded {
    /// Command opcode; unrecognized opcodes surface as [`Command::Unknown`].
    pub command: Command,
    /// 24-bit payload word (see [`payload`]).
    pub data: u32,
    /// Sender's rolling code at transmission time.
    pub rolling: u32,
    /// Sender's client id.
    pub client_id: ClientId,
}

/// Encode a frame.
///
/// `data` is masked to the 24-bit payload layout; `rolling` to 28 bits.
/// Deterministic and stateless: the caller owns counter advancement.
#[must_use]
pub fn encode(command: Command, data: u32, rolling: u32, client_id: ClientId) -> WirePacket {
    let cmd = command.to_u16();
    let fixed: u64 = ((u64::from(cmd) & 0xf00) << 24) | u64::from(client_id.as_u32());

    let mut wire_data: u32 = ((data & payload::MASK) << 8) | (u32::from(cmd) & 0xff);
    wire_data |= data_parity(fixed, wire_data) << 12;

    let digits = ternary_digits(mirror28(rolling % ROLLING_CODE_MODULUS));

    let half_a = encode_half(
        &digits[..9],
        ((fixed >> 20) & 0xf_ffff) as u32,
        (wire_data >> 16) as u16,
    );
    let half_b = encode_half(
        &digits[9..],
        (fixed & 0xf_ffff) as u32,
        (wire_data & 0xffff) as u16,
    );

    let mut bytes = [0u8; PACKET_LENGTH];
    bytes[..3].copy_from_slice(&PREAMBLE);
    bytes[3..11].copy_from_slice(&half_a);
    bytes[11..19].copy_from_slice(&half_b);
    WirePacket::new(bytes)
}

/// Decode a frame.
///
/// # Errors
/// Returns `Error::InvalidFrame` for any malformed frame (bad preamble,
/// residue, indicator, ternary digit, rolling range or parity). A frame
/// that fails here must cause no state change in the caller.
pub fn decode(packet: &WirePacket) -> Result<Decoded> {
    if !packet.has_preamble() {
        return Err(invalid("bad preamble"));
    }

    let bytes = packet.as_bytes();
    let mut half = [0u8; 8];
    half.copy_from_slice(&bytes[3..11]);
    let (digits_a, fixed_a, data_a) = decode_half(half)?;
    half.copy_from_slice(&bytes[11..19]);
    let (digits_b, fixed_b, data_b) = decode_half(half)?;

    let mut mirrored: u32 = 0;
    for digit in digits_a.iter().chain(digits_b.iter()) {
        mirrored = mirrored
            .checked_mul(3)
            .and_then(|v| v.checked_add(u32::from(*digit)))
            .ok_or_else(|| invalid("rolling code out of range"))?;
    }
    if mirrored >= ROLLING_CODE_MODULUS {
        return Err(invalid("rolling code out of range"));
    }
    let rolling = mirror28(mirrored);

    let fixed: u64 = (u64::from(fixed_a) << 20) | u64::from(fixed_b);
    let wire_data: u32 = (u32::from(data_a) << 16) | u32::from(data_b);

    let stored_parity = (wire_data >> 12) & 0xf;
    if data_parity(fixed, wire_data & !0xf000) != stored_parity {
        return Err(invalid("parity mismatch"));
    }

    let opcode = (((fixed >> 24) & 0xf00) as u16) | (wire_data & 0xff) as u16;
    let data = ((wire_data & !0xf000) >> 8) & payload::MASK;
    let client_id = ClientId::new((fixed & 0xff_ffff) as u32)?;

    Ok(Decoded {
        command: Command::from_wire(opcode),
        data,
        rolling,
        client_id,
    })
}

fn invalid(reason: &str) -> Error {
    Error::InvalidFrame {
        reason: reason.to_string(),
    }
}

/// Parity nibble: command nibble of the fixed word XORed with every data
/// nibble. Computed with the parity slot held at zero.
fn data_parity(fixed: u64, wire_data: u32) -> u32 {
    let mut parity = ((fixed >> 32) & 0xf) as u32;
    for offset in (0..32).step_by(4) {
        parity ^= (wire_data >> offset) & 0xf;
    }
    parity
}

/// Reverse the low 28 bits (involution).
fn mirror28(value: u32) -> u32 {
    value.reverse_bits() >> 4
}

/// Express a 28-bit value as 18 base-3 digits, most significant first.
fn ternary_digits(mut value: u32) -> [u8; 18] {
    let mut digits = [0u8; 18];
    for slot in digits.iter_mut().rev() {
        *slot = (value % 3) as u8;
        value /= 3;
    }
    digits
}

fn encode_half(digits: &[u8], fixed_half: u32, data_half: u16) -> [u8; 8] {
    debug_assert_eq!(digits.len(), 9);
    let indicator = usize::from(digits[0] * 3 + digits[1]);

    let bits36: u64 = (u64::from(fixed_half) << 16) | u64::from(data_half);
    let parts = [
        (bits36 >> 24) & 0xfff,
        (bits36 >> 12) & 0xfff,
        bits36 & 0xfff,
    ];

    let mut scrambled = [0u64; 3];
    for (i, slot) in scrambled.iter_mut().enumerate() {
        *slot = if INVERT[indicator][i] {
            parts[i] ^ 0xfff
        } else {
            parts[i]
        };
    }

    let mut digit_bits: u64 = 0;
    for digit in &digits[2..] {
        digit_bits = (digit_bits << 2) | u64::from(*digit);
    }

    let upper: u64 = ((indicator as u64) << 50)
        | (digit_bits << 36)
        | (scrambled[ORDER[indicator][0]] << 24)
        | (scrambled[ORDER[indicator][1]] << 12)
        | scrambled[ORDER[indicator][2]];

    let half = (upper << 10) | (upper % RESIDUE_MODULUS);
    half.to_be_bytes()
}

fn decode_half(bytes: [u8; 8]) -> Result<([u8; 9], u32, u16)> {
    let half = u64::from_be_bytes(bytes);
    let upper = half >> 10;
    if upper % RESIDUE_MODULUS != half & 0x3ff {
        return Err(invalid("residue mismatch"));
    }

    let indicator = (upper >> 50) as usize;
    if indicator > 8 {
        return Err(invalid("indicator out of range"));
    }

    let mut digits = [0u8; 9];
    digits[0] = (indicator / 3) as u8;
    digits[1] = (indicator % 3) as u8;
    let digit_bits = (upper >> 36) & 0x3fff;
    for j in 0..7 {
        let digit = ((digit_bits >> (2 * (6 - j))) & 0b11) as u8;
        if digit > 2 {
            return Err(invalid("ternary digit out of range"));
        }
        digits[2 + j] = digit;
    }

    let out = [(upper >> 24) & 0xfff, (upper >> 12) & 0xfff, upper & 0xfff];
    let mut scrambled = [0u64; 3];
    for (k, value) in out.iter().enumerate() {
        scrambled[ORDER[indicator][k]] = *value;
    }

    let mut bits36: u64 = 0;
    for (i, slot) in scrambled.iter().enumerate() {
        let part = if INVERT[indicator][i] {
            slot ^ 0xfff
        } else {
            *slot
        };
        bits36 = (bits36 << 12) | part;
    }

    Ok((
        digits,
        ((bits36 >> 16) & 0xf_ffff) as u32,
        (bits36 & 0xffff) as u16,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    fn client() -> ClientId {
        ClientId::new(0x539).unwrap()
    }

    #[rstest]
    #[case(Command::GetStatus, 0)]
    #[case(Command::Status, 0x02_0100 | payload::DOOR_OPEN)]
    #[case(Command::DoorAction, payload::DOOR_CLOSE)]
    #[case(Command::Light, payload::LIGHT_TOGGLE)]
    #[case(Command::TtcSetDuration, payload::u16_pair(120))]
    #[case(Command::TtcCancel, payload::TTC_CANCEL_OFF)]
    #[case(Command::GetOpenings, 0)]
    fn test_round_trip(#[case] command: Command, #[case] data: u32) {
        let packet = encode(command, data, 0x123456, client());
        let decoded = decode(&packet).unwrap();

        assert_eq!(decoded.command, command);
        assert_eq!(decoded.data, data & payload::MASK);
        assert_eq!(decoded.rolling, 0x123456);
        assert_eq!(decoded.client_id, client());
    }

    #[test]
    fn test_rolling_extremes_round_trip() {
        for rolling in [0, 1, ROLLING_CODE_MODULUS - 1, 0x0aaa_aaaa & (ROLLING_CODE_MODULUS - 1)] {
            let packet = encode(Command::GetStatus, 0, rolling, client());
            assert_eq!(decode(&packet).unwrap().rolling, rolling);
        }
    }

    #[test]
    fn test_mirror28_is_involution() {
        for value in [0u32, 1, 0x0800_0000, 0x0fff_ffff, 0x0123_4567] {
            assert_eq!(mirror28(mirror28(value)), value);
            assert!(mirror28(value) < ROLLING_CODE_MODULUS);
        }
    }

    #[test]
    fn test_decode_rejects_bad_preamble() {
        let packet = encode(Command::GetStatus, 0, 1, client());
        let mut bytes = *packet.as_bytes();
        bytes[0] = 0x54;
        let err = decode(&WirePacket::new(bytes)).unwrap_err();
        assert!(err.to_string().contains("preamble"));
    }

    #[test]
    fn test_decode_rejects_corrupted_body() {
        let packet = encode(Command::Status, 0x0100, 42, client());
        // Flip one bit anywhere in a half; the residue check must fire.
        for byte_index in 3..PACKET_LENGTH {
            let mut bytes = *packet.as_bytes();
            bytes[byte_index] ^= 0x10;
            assert!(
                decode(&WirePacket::new(bytes)).is_err(),
                "corruption at byte {byte_index} went undetected"
            );
        }
    }

    #[test]
    fn test_decode_rejects_parity_mismatch() {
        // Rebuild the low half with a flipped parity nibble but a valid
        // residue, so only the parity check can catch it.
        let packet = encode(Command::Status, 0x0100, 42, client());
        let bytes = packet.as_bytes();
        let mut half = [0u8; 8];
        half.copy_from_slice(&bytes[11..19]);
        let (digits_b, fixed_b, data_b) = decode_half(half).unwrap();
        let tampered_half = encode_half(&digits_b, fixed_b, data_b ^ (1 << 12));

        let mut tampered = *bytes;
        tampered[11..19].copy_from_slice(&tampered_half);
        let err = decode(&WirePacket::new(tampered)).unwrap_err();
        assert!(err.to_string().contains("parity"));
    }

    #[test]
    fn test_unknown_opcode_decodes_as_unknown() {
        // 0x082 is not an assigned opcode but encodes fine.
        let fixed: u64 = u64::from(client().as_u32());
        let mut wire_data: u32 = 0x82;
        wire_data |= data_parity(fixed, wire_data) << 12;
        let digits = ternary_digits(mirror28(7));
        let half_a = encode_half(&digits[..9], ((fixed >> 20) & 0xf_ffff) as u32, (wire_data >> 16) as u16);
        let half_b = encode_half(&digits[9..], (fixed & 0xf_ffff) as u32, (wire_data & 0xffff) as u16);
        let mut bytes = [0u8; PACKET_LENGTH];
        bytes[..3].copy_from_slice(&PREAMBLE);
        bytes[3..11].copy_from_slice(&half_a);
        bytes[11..19].copy_from_slice(&half_b);

        let decoded = decode(&WirePacket::new(bytes)).unwrap();
        assert_eq!(decoded.command, Command::Unknown);
    }

    #[test]
    fn test_payload_reserved_bits_are_masked() {
        let packet = encode(Command::DoorAction, 0xf0 | payload::DOOR_OPEN, 9, client());
        let decoded = decode(&packet).unwrap();
        assert_eq!(decoded.data, payload::DOOR_OPEN);
    }

    proptest! {
        #[test]
        fn prop_round_trip(
            opcode in prop::sample::select(vec![
                0x080u16, 0x081, 0x0a0, 0x0a1, 0x280, 0x281, 0x284, 0x285,
                0x400, 0x401, 0x402, 0x408, 0x40a, 0x48b, 0x48c,
            ]),
            data in 0u32..0x0100_0000,
            rolling in 0u32..(1 << 28),
            client_raw in 0u32..0x0100_0000,
        ) {
            let command = Command::try_from(opcode).unwrap();
            let client_id = ClientId::new(client_raw).unwrap();
            let packet = encode(command, data, rolling, client_id);
            let decoded = decode(&packet).unwrap();

            prop_assert_eq!(decoded.command, command);
            prop_assert_eq!(decoded.data, data & payload::MASK);
            prop_assert_eq!(decoded.rolling, rolling);
            prop_assert_eq!(decoded.client_id, client_id);
        }
    }
}
