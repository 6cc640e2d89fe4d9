//! # RC Link Protocol Module
//!
//! Framing for the 32-byte radio link.
//!
//! This module handles:
//! - Frame layout and packet types
//! - Frame encoding (command, telemetry, heartbeat, emergency)
//! - Frame validation and decoding
//! - CRC-8 checksum calculation

pub mod packet;
pub mod encoder;
pub mod decoder;
pub mod crc;

pub use decoder::{frame_size, is_emergency, DecodedFrame};
pub use packet::{
    Frame, FrameSlot, FrameView, PacketFlags, PacketHeader, PacketType, FRAME_SIZE,
    MAX_PAYLOAD_SIZE, PROTOCOL_VERSION,
};

/// Encoder/decoder bound to one protocol version.
///
/// The codec holds no state besides the version, so it is `Copy` and can be
/// shared freely between links.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketCodec {
    version: u8,
}

impl Default for PacketCodec {
    fn default() -> Self {
        Self::new(PROTOCOL_VERSION)
    }
}

impl PacketCodec {
    /// Creates a codec that writes and accepts `version`.
    #[must_use]
    pub fn new(version: u8) -> Self {
        Self { version }
    }

    /// Protocol version written into and required of every frame.
    pub fn version(&self) -> u8 {
        self.version
    }
}
