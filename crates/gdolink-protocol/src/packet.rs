//! Fixed-length wire frame buffer.

use gdolink_core::{Error, Result};
use std::fmt;

/// Every Security+ 2.0 frame is exactly this long.
pub const PACKET_LENGTH: usize = 19;

/// Frame preamble: sync byte, protocol version, reserved.
pub const PREAMBLE: [u8; 3] = [0x55, 0x01, 0x00];

/// A raw 19-byte frame as it travels on the bus.
///
/// Opaque outside the codec: consumers hand these to [`decode`] or receive
/// them from [`encode`] and otherwise only move them around.
///
/// [`decode`]: crate::wire::decode
/// [`encode`]: crate::wire::encode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WirePacket([u8; PACKET_LENGTH]);

impl WirePacket {
    /// Wrap an already-complete frame buffer.
    #[must_use]
    pub fn new(bytes: [u8; PACKET_LENGTH]) -> Self {
        WirePacket(bytes)
    }

    /// Copy a frame out of a byte slice.
    ///
    /// # Errors
    /// Returns `Error::InvalidFrame` if the slice is not exactly
    /// [`PACKET_LENGTH`] bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let buf: [u8; PACKET_LENGTH] =
            bytes.try_into().map_err(|_| Error::InvalidFrame {
                reason: format!("expected {PACKET_LENGTH} bytes, got {}", bytes.len()),
            })?;
        Ok(WirePacket(buf))
    }

    /// Get the raw bytes of the frame.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; PACKET_LENGTH] {
        &self.0
    }

    /// Returns `true` if the frame starts with the expected preamble.
    #[must_use]
    pub fn has_preamble(&self) -> bool {
        self.0[..PREAMBLE.len()] == PREAMBLE
    }
}

impl AsRef<[u8]> for WirePacket {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for WirePacket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, byte) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{byte:02X}")?;
        }
        Ok(())
    }
}
