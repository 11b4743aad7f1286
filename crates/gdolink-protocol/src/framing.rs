//! Frame synchronization over a raw byte stream.
//!
//! The bus is half-duplex and byte-oriented: a read can return a partial
//! frame, several frames back to back, or line noise between frames. The
//! [`FrameAccumulator`] buffers incoming bytes, discards garbage until it
//! finds the `55 01 00` preamble, and yields complete 19-byte frames.
//!
//! ```
//! use gdolink_protocol::FrameAccumulator;
//!
//! let mut accumulator = FrameAccumulator::new();
//! accumulator.feed(&[0xff, 0xff]); // noise
//! accumulator.feed(&[0x55, 0x01, 0x00]);
//! accumulator.feed(&[0u8; 16]);
//! assert!(accumulator.next_frame().is_some());
//! ```
//!
//! [`WireFrameCodec`] wraps the accumulator (plus [`decode`]) for use with
//! Tokio's `Framed` streams on async transports.
//!
//! [`decode`]: crate::wire::decode

use bytes::{Buf, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::packet::{PACKET_LENGTH, PREAMBLE, WirePacket};
use crate::wire::{self, Decoded};
use gdolink_core::{Error, Result};

/// Upper bound on buffered bytes before the accumulator resets.
///
/// Frames are 19 bytes; anything approaching this limit means the line is
/// producing garbage faster than we find preambles in it.
const MAX_BUFFER_SIZE: usize = 4 * 1024;

/// Stateful byte accumulator yielding aligned wire frames.
#[derive(Debug, Default)]
pub struct FrameAccumulator {
    buffer: BytesMut,
}

impl FrameAccumulator {
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(4 * PACKET_LENGTH),
        }
    }

    /// Append raw bytes read from the transport.
    pub fn feed(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
        if self.buffer.len() > MAX_BUFFER_SIZE {
            // Runaway garbage; drop everything rather than grow unbounded.
            self.buffer.clear();
        }
    }

    /// Extract the next complete frame, if one is buffered.
    ///
    /// Bytes preceding the first preamble are discarded. Returns `None`
    /// while the buffered data is still short of a full frame.
    pub fn next_frame(&mut self) -> Option<WirePacket> {
        self.discard_until_preamble();
        if self.buffer.len() < PACKET_LENGTH {
            return None;
        }

        let mut bytes = [0u8; PACKET_LENGTH];
        bytes.copy_from_slice(&self.buffer[..PACKET_LENGTH]);
        self.buffer.advance(PACKET_LENGTH);
        Some(WirePacket::new(bytes))
    }

    /// Number of bytes currently buffered.
    #[must_use]
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Drop leading bytes until the buffer starts with the preamble (or
    /// with a prefix of it, in case the rest has not arrived yet).
    fn discard_until_preamble(&mut self) {
        while !self.buffer.is_empty() {
            let matched = self
                .buffer
                .iter()
                .zip(PREAMBLE.iter())
                .take_while(|(a, b)| a == b)
                .count();
            if matched == PREAMBLE.len() || matched == self.buffer.len() {
                return;
            }
            self.buffer.advance(1);
        }
    }
}

/// Tokio codec adapter: decodes aligned frames into [`Decoded`] commands
/// and writes pre-encoded [`WirePacket`]s.
#[derive(Debug, Default)]
pub struct WireFrameCodec {
    accumulator: FrameAccumulator,
}

impl WireFrameCodec {
    pub fn new() -> Self {
        Self {
            accumulator: FrameAccumulator::new(),
        }
    }
}

impl Decoder for WireFrameCodec {
    type Item = Decoded;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        if !src.is_empty() {
            self.accumulator.feed(src);
            src.clear();
        }

        match self.accumulator.next_frame() {
            Some(frame) => wire::decode(&frame).map(Some),
            None => Ok(None),
        }
    }
}

impl Encoder<WirePacket> for WireFrameCodec {
    type Error = Error;

    fn encode(&mut self, item: WirePacket, dst: &mut BytesMut) -> Result<()> {
        dst.extend_from_slice(item.as_bytes());
        Ok(())
    }
}
