//! Wire protocol for Security+ 2.0 door openers.
//!
//! This crate owns everything that touches raw bus bytes: the command
//! opcode set, the 19-byte frame codec with its rolling anti-replay
//! counter, the rolling-code state itself, and stream framing (both a pure
//! byte accumulator and a Tokio codec adapter).

pub mod command;
pub mod framing;
pub mod packet;
pub mod rolling;
pub mod wire;

pub use command::{Command, payload};
pub use framing::{FrameAccumulator, WireFrameCodec};
pub use packet::{PACKET_LENGTH, PREAMBLE, WirePacket};
pub use rolling::RollingCodeState;
pub use wire::{Decoded, decode, encode};
