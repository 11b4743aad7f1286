use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    // Protocol errors
    #[error("Invalid frame: {reason}")]
    InvalidFrame { reason: String },

    #[error("Invalid command opcode: {code:#05x}")]
    InvalidCommand { code: u16 },

    #[error("Invalid {field} code: {code}")]
    InvalidStateCode { field: &'static str, code: u8 },

    #[error("Stale rolling code {received:#x} (last seen {last_seen:#x})")]
    StaleRollingCode { received: u32, last_seen: u32 },

    #[error("Client id {0:#x} exceeds 24 bits")]
    InvalidClientId(u32),

    // Command surface errors
    #[error("Door position must be 0.0-1.0, got {0}")]
    InvalidPosition(f32),

    #[error("Door position and travel durations are not calibrated yet")]
    NotCalibrated,

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
