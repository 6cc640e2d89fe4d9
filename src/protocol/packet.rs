//! # RC Link Frame Layout
//!
//! Constants and types describing one radio frame:
//!
//! ```text
//! ┌─────────────┬──────────────────────┬────────┐
//! │   Header    │       Payload        │  CRC   │
//! │   5 bytes   │     0-26 bytes       │ 1 byte │
//! └─────────────┴──────────────────────┴────────┘
//! ```
//!
//! The checksum sits directly after the valid payload, so its offset depends
//! on `payload_len`. Frames are therefore handled as length-prefixed views
//! ([`FrameView`]) and never as a fixed record.

use bitflags::bitflags;

/// Default protocol version; frames carrying another version are rejected
pub const PROTOCOL_VERSION: u8 = 1;

/// Radio slot size (nRF24L01 payload limit)
pub const FRAME_SIZE: usize = 32;

/// Header size: version, type, sequence, flags, payload_len
pub const HEADER_SIZE: usize = 5;

/// Checksum size
pub const CHECKSUM_SIZE: usize = 1;

/// Maximum payload size: 32 - 5 - 1
pub const MAX_PAYLOAD_SIZE: usize = FRAME_SIZE - HEADER_SIZE - CHECKSUM_SIZE;

/// Smallest logical frame (empty payload)
pub const MIN_FRAME_SIZE: usize = HEADER_SIZE + CHECKSUM_SIZE;

/// One full radio slot as handed to / received from the transport
pub type FrameSlot = [u8; FRAME_SIZE];

/// Packet type byte
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PacketType {
    /// Ground → aircraft control command
    Command = 0x01,
    /// Aircraft → ground telemetry
    Telemetry = 0x02,
    /// Keep-alive, empty payload
    Heartbeat = 0x03,
    /// Emergency command, empty payload
    Emergency = 0x04,
}

impl PacketType {
    /// Wire value of this packet type
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for PacketType {
    type Error = u8;

    fn try_from(value: u8) -> std::result::Result<Self, Self::Error> {
        match value {
            0x01 => Ok(Self::Command),
            0x02 => Ok(Self::Telemetry),
            0x03 => Ok(Self::Heartbeat),
            0x04 => Ok(Self::Emergency),
            other => Err(other),
        }
    }
}

bitflags! {
    /// Header flag bits. Advisory only: validation ignores them.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct PacketFlags: u8 {
        /// Sender would like an acknowledgement
        const ACK_REQ = 1 << 0;
        /// Frame carries an emergency request
        const EMERGENCY = 1 << 1;
    }
}

/// Decoded frame header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketHeader {
    pub version: u8,
    pub packet_type: u8,
    pub sequence: u8,
    pub flags: PacketFlags,
    pub payload_len: u8,
}

impl PacketHeader {
    /// Serialize the header into its 5 wire bytes
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        [
            self.version,
            self.packet_type,
            self.sequence,
            self.flags.bits(),
            self.payload_len,
        ]
    }
}

/// Borrowed, length-prefixed view over received frame bytes.
///
/// Construction only checks that a header is present. The payload and
/// checksum accessors return `None` until the bytes they need exist and
/// `payload_len` is within bounds.
#[derive(Debug, Clone, Copy)]
pub struct FrameView<'a> {
    bytes: &'a [u8],
}

impl<'a> FrameView<'a> {
    /// Wrap raw bytes. Returns `None` if fewer than [`HEADER_SIZE`] bytes are given.
    pub fn new(bytes: &'a [u8]) -> Option<Self> {
        if bytes.len() < HEADER_SIZE {
            return None;
        }
        Some(Self { bytes })
    }

    pub fn version(&self) -> u8 {
        self.bytes[0]
    }

    pub fn packet_type(&self) -> u8 {
        self.bytes[1]
    }

    pub fn sequence(&self) -> u8 {
        self.bytes[2]
    }

    /// Flag bits, reserved bits included
    pub fn flags(&self) -> PacketFlags {
        PacketFlags::from_bits_retain(self.bytes[3])
    }

    pub fn payload_len(&self) -> usize {
        self.bytes[4] as usize
    }

    pub fn header(&self) -> PacketHeader {
        PacketHeader {
            version: self.version(),
            packet_type: self.packet_type(),
            sequence: self.sequence(),
            flags: self.flags(),
            payload_len: self.bytes[4],
        }
    }

    /// Logical frame size: header + payload + checksum.
    ///
    /// Computed from the header alone, so it is meaningful for any view.
    pub fn frame_size(&self) -> usize {
        HEADER_SIZE + self.payload_len() + CHECKSUM_SIZE
    }

    /// True if `payload_len` is legal and the bytes hold the whole frame
    pub fn is_complete(&self) -> bool {
        self.payload_len() <= MAX_PAYLOAD_SIZE && self.bytes.len() >= self.frame_size()
    }

    /// Bytes covered by the checksum: header plus valid payload
    pub fn checked_bytes(&self) -> Option<&'a [u8]> {
        self.is_complete()
            .then(|| &self.bytes[..HEADER_SIZE + self.payload_len()])
    }

    /// Valid payload bytes only
    pub fn payload(&self) -> Option<&'a [u8]> {
        self.is_complete()
            .then(|| &self.bytes[HEADER_SIZE..HEADER_SIZE + self.payload_len()])
    }

    /// Stored checksum byte at offset `5 + payload_len`
    pub fn checksum(&self) -> Option<u8> {
        self.is_complete()
            .then(|| self.bytes[HEADER_SIZE + self.payload_len()])
    }
}

/// An encoded frame occupying one 32-byte radio slot.
///
/// Bytes past the checksum are zeroed when encoding but carry no meaning.
#[derive(Clone, PartialEq, Eq)]
pub struct Frame {
    slot: FrameSlot,
}

impl Frame {
    pub(crate) fn from_slot(slot: FrameSlot) -> Self {
        Self { slot }
    }

    /// Full 32-byte slot, as transmitted
    pub fn slot(&self) -> &FrameSlot {
        &self.slot
    }

    /// Logical frame bytes (header + payload + checksum)
    pub fn as_bytes(&self) -> &[u8] {
        &self.slot[..self.size()]
    }

    /// Length-prefixed view over this frame
    pub fn view(&self) -> FrameView<'_> {
        FrameView { bytes: &self.slot }
    }

    /// Logical frame size
    pub fn size(&self) -> usize {
        self.view().frame_size()
    }

    pub fn sequence(&self) -> u8 {
        self.view().sequence()
    }

    /// Valid payload bytes
    pub fn payload(&self) -> &[u8] {
        let len = self.view().payload_len().min(MAX_PAYLOAD_SIZE);
        &self.slot[HEADER_SIZE..HEADER_SIZE + len]
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("header", &self.view().header())
            .field("payload", &self.payload())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_constants() {
        assert_eq!(FRAME_SIZE, 32);
        assert_eq!(HEADER_SIZE, 5);
        assert_eq!(MAX_PAYLOAD_SIZE, 26);
        assert_eq!(MIN_FRAME_SIZE, 6);
        assert_eq!(PROTOCOL_VERSION, 1);
    }

    #[test]
    fn test_packet_type_values() {
        assert_eq!(PacketType::Command.as_u8(), 0x01);
        assert_eq!(PacketType::Telemetry.as_u8(), 0x02);
        assert_eq!(PacketType::Heartbeat.as_u8(), 0x03);
        assert_eq!(PacketType::Emergency.as_u8(), 0x04);
    }

    #[test]
    fn test_packet_type_try_from() {
        assert_eq!(PacketType::try_from(0x02), Ok(PacketType::Telemetry));
        assert_eq!(PacketType::try_from(0x00), Err(0x00));
        assert_eq!(PacketType::try_from(0x05), Err(0x05));
    }

    #[test]
    fn test_packet_flags_bits() {
        assert_eq!(PacketFlags::ACK_REQ.bits(), 0x01);
        assert_eq!(PacketFlags::EMERGENCY.bits(), 0x02);
        assert_eq!(PacketFlags::from_bits_truncate(0xFF), PacketFlags::all());
    }

    #[test]
    fn test_header_to_bytes() {
        let header = PacketHeader {
            version: 1,
            packet_type: 0x02,
            sequence: 200,
            flags: PacketFlags::EMERGENCY,
            payload_len: 22,
        };
        assert_eq!(header.to_bytes(), [1, 0x02, 200, 0x02, 22]);
    }

    #[test]
    fn test_view_requires_header() {
        assert!(FrameView::new(&[1, 2, 3, 4]).is_none());
        assert!(FrameView::new(&[1, 2, 3, 4, 0]).is_some());
    }

    #[test]
    fn test_view_checksum_position_follows_length() {
        let bytes = [1, 0x01, 0, 0, 3, 0xAA, 0xBB, 0xCC, 0x42, 0xEE];
        let view = FrameView::new(&bytes).unwrap();

        assert_eq!(view.frame_size(), 9);
        assert_eq!(view.payload(), Some(&[0xAA, 0xBB, 0xCC][..]));
        assert_eq!(view.checksum(), Some(0x42));
        assert_eq!(view.checked_bytes().unwrap().len(), 8);
    }

    #[test]
    fn test_view_keeps_reserved_flag_bits() {
        let bytes = [1, 0x03, 0, 0x86, 0, 0];
        let view = FrameView::new(&bytes).unwrap();

        assert_eq!(view.flags().bits(), 0x86);
        assert!(view.flags().contains(PacketFlags::EMERGENCY));
        assert_eq!(view.header().to_bytes()[3], 0x86);
    }

    #[test]
    fn test_view_truncated_frame() {
        // payload_len says 3 but only 2 payload bytes and no checksum present
        let bytes = [1, 0x01, 0, 0, 3, 0xAA, 0xBB];
        let view = FrameView::new(&bytes).unwrap();

        assert!(!view.is_complete());
        assert!(view.payload().is_none());
        assert!(view.checksum().is_none());
    }

    #[test]
    fn test_view_rejects_oversized_length() {
        let mut bytes = [0u8; FRAME_SIZE];
        bytes[4] = 27;
        let view = FrameView::new(&bytes).unwrap();

        assert!(!view.is_complete());
        assert_eq!(view.frame_size(), 33);
        assert!(view.checksum().is_none());
    }
}
