//! # Error Types
//!
//! Custom error types for RC Link using `thiserror`.

use thiserror::Error;

/// Main error type for RC Link
#[derive(Debug, Error)]
pub enum RcLinkError {
    /// Caller passed arguments the operation cannot work with
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Payload does not fit in a single frame
    #[error("Payload size {size} exceeds maximum {max}")]
    PayloadTooLarge { size: usize, max: usize },

    /// Stored checksum does not match, or cannot be located
    #[error("Checksum mismatch: expected 0x{expected:02X}, got 0x{actual:02X}")]
    InvalidChecksum { expected: u8, actual: u8 },

    /// Frame carries a different protocol version
    #[error("Protocol version mismatch: expected {expected}, got {actual}")]
    VersionMismatch { expected: u8, actual: u8 },

    /// Frame is valid but of another packet type
    #[error("Unexpected packet type: expected 0x{expected:02X}, got 0x{actual:02X}")]
    UnexpectedType { expected: u8, actual: u8 },

    /// Frame is valid but carries a payload of another length
    #[error("Payload length mismatch: expected {expected}, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    /// Nothing waiting on the transport
    #[error("No data available")]
    NoData,

    /// Transport reported a failed transmission
    #[error("Radio hardware failure")]
    HardwareFailure,

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serial port errors
    #[error("Serial error: {0}")]
    Serial(String),

    /// None of the candidate serial devices could be opened
    #[error("No radio adapter found (tried: {0})")]
    SerialPortNotFound(String),
}

impl RcLinkError {
    /// Returns true for errors produced by frame validation or decoding.
    pub fn is_decode_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidChecksum { .. }
                | Self::VersionMismatch { .. }
                | Self::UnexpectedType { .. }
                | Self::LengthMismatch { .. }
        )
    }
}

/// Result type alias for RC Link
pub type Result<T> = std::result::Result<T, RcLinkError>;
