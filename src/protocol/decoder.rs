//! # Frame Decoder
//!
//! Validates received frames and extracts their payloads.
//!
//! Checks run in a fixed order: frame completeness and checksum first, then
//! protocol version, then packet type and payload length. A frame whose
//! checksum cannot be located (truncated, or `payload_len` above 26) counts as
//! a checksum failure, so line noise is never reported as a version mismatch.

use super::crc::crc8;
use super::packet::*;
use super::PacketCodec;
use crate::error::{RcLinkError, Result};

/// A frame that passed validation, with no type or length expectation applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedFrame {
    /// Raw type byte (may be a type this build does not know)
    pub packet_type: u8,
    pub sequence: u8,
    pub flags: PacketFlags,
    pub payload: Vec<u8>,
}

impl DecodedFrame {
    /// Packet type, if known
    pub fn kind(&self) -> Option<PacketType> {
        PacketType::try_from(self.packet_type).ok()
    }
}

impl PacketCodec {
    /// Check version, length bound and checksum of a frame
    ///
    /// # Returns
    ///
    /// * `bool` - true if the frame can be trusted; type, sequence and flags
    ///   are not inspected
    pub fn validate(&self, frame: &[u8]) -> bool {
        self.check(frame).is_ok()
    }

    /// Decode a frame and return exactly `expected_len` payload bytes
    ///
    /// # Arguments
    ///
    /// * `frame` - Received bytes (a full 32-byte slot or just the logical frame)
    /// * `expected_type` - Packet type the caller is waiting for
    /// * `expected_len` - Payload length the application contract fixes
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Checksum does not match or cannot be located (`InvalidChecksum`)
    /// - Version differs from the codec's (`VersionMismatch`)
    /// - Type differs from `expected_type` (`UnexpectedType`)
    /// - `payload_len` differs from `expected_len` (`LengthMismatch`)
    ///
    /// # Examples
    ///
    /// ```
    /// use rc_link::protocol::{PacketCodec, PacketType};
    ///
    /// let codec = PacketCodec::default();
    /// let frame = codec.encode(PacketType::Telemetry, &[1, 2, 3], 0)?;
    /// let payload = codec.decode(frame.slot(), PacketType::Telemetry, 3)?;
    /// assert_eq!(payload, vec![1, 2, 3]);
    /// # Ok::<(), rc_link::error::RcLinkError>(())
    /// ```
    pub fn decode(&self, frame: &[u8], expected_type: PacketType, expected_len: usize) -> Result<Vec<u8>> {
        let view = self.check(frame)?;

        if view.packet_type() != expected_type.as_u8() {
            return Err(RcLinkError::UnexpectedType {
                expected: expected_type.as_u8(),
                actual: view.packet_type(),
            });
        }

        if view.payload_len() != expected_len {
            return Err(RcLinkError::LengthMismatch {
                expected: expected_len,
                actual: view.payload_len(),
            });
        }

        Ok(view.payload().map(<[u8]>::to_vec).unwrap_or_default())
    }

    /// Decode any valid frame, whatever its type and length
    pub fn decode_any(&self, frame: &[u8]) -> Result<DecodedFrame> {
        let view = self.check(frame)?;

        Ok(DecodedFrame {
            packet_type: view.packet_type(),
            sequence: view.sequence(),
            flags: view.flags(),
            payload: view.payload().map(<[u8]>::to_vec).unwrap_or_default(),
        })
    }

    fn check<'a>(&self, frame: &'a [u8]) -> Result<FrameView<'a>> {
        let view = FrameView::new(frame).ok_or(RcLinkError::InvalidChecksum {
            expected: 0,
            actual: 0,
        })?;

        let (checked, stored) = match (view.checked_bytes(), view.checksum()) {
            (Some(checked), Some(stored)) => (checked, stored),
            _ => {
                return Err(RcLinkError::InvalidChecksum {
                    expected: 0,
                    actual: frame.get(view.frame_size() - 1).copied().unwrap_or(0),
                })
            }
        };

        let calculated = crc8(checked);
        if calculated != stored {
            return Err(RcLinkError::InvalidChecksum {
                expected: calculated,
                actual: stored,
            });
        }

        if view.version() != self.version() {
            return Err(RcLinkError::VersionMismatch {
                expected: self.version(),
                actual: view.version(),
            });
        }

        Ok(view)
    }
}

/// Logical size of a frame: `5 + payload_len + 1`
///
/// Returns `None` if the bytes do not even hold a header.
pub fn frame_size(frame: &[u8]) -> Option<usize> {
    FrameView::new(frame).map(|view| view.frame_size())
}

/// True if the frame is an emergency packet or carries the emergency flag
pub fn is_emergency(frame: &[u8]) -> bool {
    FrameView::new(frame).is_some_and(|view| {
        view.packet_type() == PacketType::Emergency.as_u8()
            || view.flags().contains(PacketFlags::EMERGENCY)
    })
}
