//! # Frame Encoder
//!
//! Builds RC link frames from opaque application payloads.

use super::crc::crc8;
use super::packet::*;
use super::PacketCodec;
use crate::error::{RcLinkError, Result};

impl PacketCodec {
    /// Encode a payload into a frame
    ///
    /// # Arguments
    ///
    /// * `packet_type` - Packet type byte to write
    /// * `payload` - Opaque application data (max 26 bytes)
    /// * `sequence` - Sender sequence number
    ///
    /// # Errors
    ///
    /// Returns `PayloadTooLarge` if the payload exceeds [`MAX_PAYLOAD_SIZE`].
    ///
    /// # Examples
    ///
    /// ```
    /// use rc_link::protocol::{PacketCodec, PacketType};
    ///
    /// let codec = PacketCodec::default();
    /// let frame = codec.encode(PacketType::Command, &[0x10, 0x20], 7)?;
    /// assert_eq!(frame.size(), 8);
    /// assert_eq!(frame.sequence(), 7);
    /// # Ok::<(), rc_link::error::RcLinkError>(())
    /// ```
    pub fn encode(&self, packet_type: PacketType, payload: &[u8], sequence: u8) -> Result<Frame> {
        self.encode_with_flags(packet_type, payload, sequence, PacketFlags::empty())
    }

    /// Encode a payload into a frame with explicit header flags
    pub fn encode_with_flags(
        &self,
        packet_type: PacketType,
        payload: &[u8],
        sequence: u8,
        flags: PacketFlags,
    ) -> Result<Frame> {
        if payload.len() > MAX_PAYLOAD_SIZE {
            return Err(RcLinkError::PayloadTooLarge {
                size: payload.len(),
                max: MAX_PAYLOAD_SIZE,
            });
        }

        let header = PacketHeader {
            version: self.version(),
            packet_type: packet_type.as_u8(),
            sequence,
            flags,
            payload_len: payload.len() as u8,
        };

        let mut slot: FrameSlot = [0u8; FRAME_SIZE];
        let crc_offset = HEADER_SIZE + payload.len();

        slot[..HEADER_SIZE].copy_from_slice(&header.to_bytes());
        slot[HEADER_SIZE..crc_offset].copy_from_slice(payload);
        slot[crc_offset] = crc8(&slot[..crc_offset]);

        Ok(Frame::from_slot(slot))
    }

    /// Encode an empty keep-alive frame
    pub fn encode_heartbeat(&self, sequence: u8) -> Frame {
        self.empty_frame(PacketType::Heartbeat, sequence, PacketFlags::empty())
    }

    /// Encode an empty emergency frame with the emergency flag set
    pub fn encode_emergency(&self, sequence: u8) -> Frame {
        self.empty_frame(PacketType::Emergency, sequence, PacketFlags::EMERGENCY)
    }

    fn empty_frame(&self, packet_type: PacketType, sequence: u8, flags: PacketFlags) -> Frame {
        let header = PacketHeader {
            version: self.version(),
            packet_type: packet_type.as_u8(),
            sequence,
            flags,
            payload_len: 0,
        };

        let mut slot: FrameSlot = [0u8; FRAME_SIZE];
        slot[..HEADER_SIZE].copy_from_slice(&header.to_bytes());
        slot[HEADER_SIZE] = crc8(&slot[..HEADER_SIZE]);

        Frame::from_slot(slot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_header_fields() {
        let codec = PacketCodec::default();
        let frame = codec.encode(PacketType::Telemetry, &[1, 2, 3], 42).unwrap();
        let bytes = frame.as_bytes();

        assert_eq!(bytes[0], PROTOCOL_VERSION);
        assert_eq!(bytes[1], PacketType::Telemetry.as_u8());
        assert_eq!(bytes[2], 42);
        assert_eq!(bytes[3], 0);
        assert_eq!(bytes[4], 3);
        assert_eq!(&bytes[5..8], &[1, 2, 3]);
    }

    #[test]
    fn test_encode_checksum_follows_payload() {
        let codec = PacketCodec::default();
        let frame = codec.encode(PacketType::Command, &[0xAA; 18], 0).unwrap();

        assert_eq!(frame.size(), 24);
        assert_eq!(frame.slot()[23], crc8(&frame.slot()[..23]));
        // Unused slot bytes are zeroed
        assert!(frame.slot()[24..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_encode_max_payload() {
        let codec = PacketCodec::default();
        let frame = codec.encode(PacketType::Command, &[0x55; 26], 0).unwrap();

        assert_eq!(frame.size(), FRAME_SIZE);
        assert_eq!(frame.payload().len(), 26);
    }

    #[test]
    fn test_encode_payload_too_large() {
        let codec = PacketCodec::default();
        let result = codec.encode(PacketType::Command, &[0u8; 27], 0);

        match result {
            Err(RcLinkError::PayloadTooLarge { size, max }) => {
                assert_eq!(size, 27);
                assert_eq!(max, 26);
            }
            other => panic!("Expected PayloadTooLarge, got: {:?}", other),
        }
    }

    #[test]
    fn test_encode_is_deterministic() {
        let codec = PacketCodec::default();
        let a = codec.encode(PacketType::Command, &[9, 8, 7], 3).unwrap();
        let b = codec.encode(PacketType::Command, &[9, 8, 7], 3).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_encode_uses_codec_version() {
        let codec = PacketCodec::new(7);
        let frame = codec.encode(PacketType::Command, &[], 0).unwrap();
        assert_eq!(frame.as_bytes()[0], 7);
    }

    #[test]
    fn test_encode_heartbeat() {
        let codec = PacketCodec::default();
        let frame = codec.encode_heartbeat(5);

        assert_eq!(frame.size(), 6);
        assert_eq!(frame.as_bytes()[1], PacketType::Heartbeat.as_u8());
        assert_eq!(frame.as_bytes()[5], crc8(&[1, 0x03, 5, 0, 0]));
        assert_eq!(frame, codec.encode(PacketType::Heartbeat, &[], 5).unwrap());
    }

    #[test]
    fn test_encode_emergency_sets_flag() {
        let codec = PacketCodec::default();
        let frame = codec.encode_emergency(9);

        assert_eq!(frame.size(), 6);
        assert_eq!(frame.as_bytes()[1], PacketType::Emergency.as_u8());
        assert_eq!(frame.view().flags(), PacketFlags::EMERGENCY);
    }

    #[test]
    fn test_different_payload_different_crc() {
        let codec = PacketCodec::default();
        let a = codec.encode(PacketType::Command, &[0x00, 0x04], 0).unwrap();
        let b = codec.encode(PacketType::Command, &[0x00, 0x05], 0).unwrap();
        assert_ne!(a.as_bytes()[7], b.as_bytes()[7]);
    }
}
