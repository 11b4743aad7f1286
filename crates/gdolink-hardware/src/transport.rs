//! Serial transport abstraction and loopback test double.
//!
//! The bus is half-duplex: one party talks at a time, frames are fixed
//! length, and there is no flow control. The engine only needs two
//! primitives — drain whatever bytes have arrived, and put one complete
//! frame on the wire — so that is the whole trait.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::error::{HardwareError, Result};

/// Byte-level access to the two-wire bus.
pub trait SerialTransport {
    /// Fetch the next received byte, if one is available.
    ///
    /// Non-blocking: returns `Ok(None)` when the receive buffer is empty.
    ///
    /// # Errors
    /// Returns an error if the underlying device failed or disconnected.
    fn read_byte(&mut self) -> Result<Option<u8>>;

    /// Write one complete frame to the bus.
    ///
    /// # Errors
    /// Returns an error if the frame could not be written in full.
    fn write_frame(&mut self, frame: &[u8]) -> Result<()>;
}

/// In-memory transport for tests and the emulated setup.
///
/// The paired [`LoopbackHandle`] plays the part of the far end of the bus:
/// it injects bytes the transport will "receive" and captures the frames
/// the engine transmits.
///
/// # Examples
///
/// ```
/// use gdolink_hardware::{LoopbackTransport, SerialTransport};
///
/// let (mut transport, handle) = LoopbackTransport::new();
/// handle.inject(&[0x55, 0x01, 0x00]);
///
/// assert_eq!(transport.read_byte().unwrap(), Some(0x55));
/// transport.write_frame(&[0xaa; 19]).unwrap();
/// assert_eq!(handle.sent_frames().len(), 1);
/// ```
#[derive(Debug)]
pub struct LoopbackTransport {
    shared: Arc<Mutex<LoopbackShared>>,
}

/// Controlling handle for a [`LoopbackTransport`].
#[derive(Debug, Clone)]
pub struct LoopbackHandle {
    shared: Arc<Mutex<LoopbackShared>>,
}

#[derive(Debug, Default)]
struct LoopbackShared {
    rx: VecDeque<u8>,
    tx: Vec<Vec<u8>>,
    connected: bool,
}

impl LoopbackTransport {
    /// Create a connected transport and its controlling handle.
    pub fn new() -> (Self, LoopbackHandle) {
        let shared = Arc::new(Mutex::new(LoopbackShared {
            connected: true,
            ..LoopbackShared::default()
        }));
        (
            Self {
                shared: Arc::clone(&shared),
            },
            LoopbackHandle { shared },
        )
    }
}

impl Default for LoopbackTransport {
    fn default() -> Self {
        Self::new().0
    }
}

impl SerialTransport for LoopbackTransport {
    fn read_byte(&mut self) -> Result<Option<u8>> {
        let mut shared = self.lock()?;
        if !shared.connected {
            return Err(HardwareError::disconnected("loopback"));
        }
        Ok(shared.rx.pop_front())
    }

    fn write_frame(&mut self, frame: &[u8]) -> Result<()> {
        let mut shared = self.lock()?;
        if !shared.connected {
            return Err(HardwareError::disconnected("loopback"));
        }
        shared.tx.push(frame.to_vec());
        Ok(())
    }
}

impl LoopbackTransport {
    fn lock(&self) -> Result<std::sync::MutexGuard<'_, LoopbackShared>> {
        self.shared
            .lock()
            .map_err(|_| HardwareError::communication("loopback state poisoned"))
    }
}

impl LoopbackHandle {
    /// Queue bytes for the engine to receive.
    pub fn inject(&self, bytes: &[u8]) {
        if let Ok(mut shared) = self.shared.lock() {
            shared.rx.extend(bytes.iter().copied());
        }
    }

    /// Frames the engine has transmitted so far, oldest first.
    pub fn sent_frames(&self) -> Vec<Vec<u8>> {
        self.shared
            .lock()
            .map(|shared| shared.tx.clone())
            .unwrap_or_default()
    }

    /// Drop all captured transmit frames.
    pub fn clear_sent(&self) {
        if let Ok(mut shared) = self.shared.lock() {
            shared.tx.clear();
        }
    }

    /// Simulate the device going away; subsequent reads and writes fail.
    pub fn disconnect(&self) {
        if let Ok(mut shared) = self.shared.lock() {
            shared.connected = false;
        }
    }
}
