//! UART transport backed by the `serialport` crate.
//!
//! The Security+ 2.0 bus runs at 9600 baud, 8N1. Reads are non-blocking:
//! `read_byte` only pulls bytes the driver already buffered, keeping the
//! poll loop free of arbitrary stalls.

use std::io::{Read, Write};
use std::time::Duration;

use serialport::SerialPort;
use tracing::debug;

use crate::error::{HardwareError, Result};
use crate::transport::SerialTransport;

/// Bus baud rate.
pub const BAUD_RATE: u32 = 9600;

/// Driver-level read timeout; only hit when `bytes_to_read` lied.
const READ_TIMEOUT: Duration = Duration::from_millis(20);

/// Real serial-port transport.
pub struct UartTransport {
    port: Box<dyn SerialPort>,
    path: String,
}

impl UartTransport {
    /// Open the given serial device at the bus rate.
    ///
    /// # Errors
    /// Returns an error if the device cannot be opened or configured.
    pub fn open(path: &str) -> Result<Self> {
        let port = serialport::new(path, BAUD_RATE)
            .data_bits(serialport::DataBits::Eight)
            .parity(serialport::Parity::None)
            .stop_bits(serialport::StopBits::One)
            .timeout(READ_TIMEOUT)
            .open()
            .map_err(|err| HardwareError::communication(format!("open {path}: {err}")))?;
        debug!(path, baud = BAUD_RATE, "serial port opened");
        Ok(Self {
            port,
            path: path.to_string(),
        })
    }

    /// Device path this transport was opened on.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }
}

impl SerialTransport for UartTransport {
    fn read_byte(&mut self) -> Result<Option<u8>> {
        let pending = self
            .port
            .bytes_to_read()
            .map_err(|err| HardwareError::communication(err.to_string()))?;
        if pending == 0 {
            return Ok(None);
        }

        let mut buf = [0u8; 1];
        self.port.read_exact(&mut buf)?;
        Ok(Some(buf[0]))
    }

    fn write_frame(&mut self, frame: &[u8]) -> Result<()> {
        self.port.write_all(frame)?;
        self.port.flush()?;
        Ok(())
    }
}
