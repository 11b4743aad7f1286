//! Hardware boundaries for the door controller.
//!
//! The protocol engine is pure logic; everything that touches the outside
//! world sits behind the traits in this crate:
//!
//! - [`SerialTransport`]: the half-duplex two-wire bus (read bytes, write
//!   one frame). The engine owns no knowledge of UART configuration.
//! - [`PreferenceStore`]: durable storage for the small restart record
//!   (rolling counter, optional client id, restore flags).
//! - [`PulseCounter`]: the obstruction-beam edge counter, the single piece
//!   of state shared with an interrupt context.
//!
//! Mock implementations ([`LoopbackTransport`], [`MemoryPreferences`]) let
//! the engine be exercised without hardware; the `hardware-serial` feature
//! adds a real UART transport backed by the `serialport` crate.

pub mod error;
pub mod obstruction;
pub mod persistence;
#[cfg(feature = "hardware-serial")]
pub mod serial;
pub mod transport;

pub use error::{HardwareError, Result};
pub use obstruction::PulseCounter;
pub use persistence::{FilePreferences, MemoryPreferences, PreferenceStore, StoredState};
#[cfg(feature = "hardware-serial")]
pub use serial::UartTransport;
pub use transport::{LoopbackHandle, LoopbackTransport, SerialTransport};
