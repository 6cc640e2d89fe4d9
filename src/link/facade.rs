//! # RC Link Facade
//!
//! Composes the packet codec and the link tracker behind role-oriented
//! operations.
//!
//! ## Roles
//!
//! | Role | Sends | Receives |
//! |------|-------|----------|
//! | Ground | commands, heartbeats, emergencies | telemetry |
//! | Aircraft | telemetry | commands (with failsafe substitution) |
//!
//! The generic [`RcLink::send`] and [`RcLink::receive`] work in either role;
//! the named wrappers reject the wrong role with `InvalidParameter`.
//!
//! ## Usage
//!
//! ```
//! use rc_link::link::{ChannelTransport, ManualClock, RcLink, Role, TrackerConfig};
//! use rc_link::protocol::{PacketCodec, PacketType};
//!
//! let (ground_radio, aircraft_radio) = ChannelTransport::pair(8);
//! let clock = ManualClock::new(0);
//! let codec = PacketCodec::default();
//!
//! let mut ground = RcLink::new(Role::Ground, codec, TrackerConfig::default(), ground_radio, clock.clone());
//! let mut aircraft = RcLink::new(Role::Aircraft, codec, TrackerConfig::default(), aircraft_radio, clock);
//!
//! ground.send_command(&[1, 2, 3])?;
//! assert_eq!(aircraft.receive(PacketType::Command, 3)?, vec![1, 2, 3]);
//! assert!(aircraft.is_active());
//! # Ok::<(), rc_link::error::RcLinkError>(())
//! ```

use tracing::{debug, warn};

use super::stats::LinkStatistics;
use super::tracker::{LinkEvent, LinkTracker, TrackerConfig};
use super::transport::{Clock, Transport};
use crate::error::{RcLinkError, Result};
use crate::protocol::{DecodedFrame, Frame, PacketCodec, PacketType, MAX_PAYLOAD_SIZE};

/// Which end of the link this instance is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Ground,
    Aircraft,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Ground => write!(f, "ground"),
            Role::Aircraft => write!(f, "aircraft"),
        }
    }
}

/// Failsafe installed by [`RcLink::new`]: eight little-endian u16 channels
/// (throttle low at 0, the rest centered at 1024), then switches and mode.
pub const DEFAULT_FAILSAFE_COMMAND: [u8; 18] = [
    0x00, 0x04, 0x00, 0x04, 0x00, 0x00, 0x00, 0x04, 0x00, 0x04, 0x00, 0x04, 0x00, 0x04, 0x00, 0x04,
    0x00, 0x00,
];

/// One end of an RC link session.
///
/// Owns its transport, clock and all link state; several links can live in
/// one process.
pub struct RcLink<T, C> {
    role: Role,
    codec: PacketCodec,
    tracker: LinkTracker,
    transport: T,
    clock: C,
    tx_sequence: u8,
    failsafe: Vec<u8>,
    emergency_pending: bool,
}

impl<T, C> std::fmt::Debug for RcLink<T, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RcLink")
            .field("role", &self.role)
            .field("tx_sequence", &self.tx_sequence)
            .field("tracker", &self.tracker)
            .finish_non_exhaustive()
    }
}

impl<T: Transport, C: Clock> RcLink<T, C> {
    /// Creates a link in the `Inactive` state with [`DEFAULT_FAILSAFE_COMMAND`]
    /// as its failsafe payload.
    pub fn new(role: Role, codec: PacketCodec, config: TrackerConfig, transport: T, clock: C) -> Self {
        Self {
            role,
            codec,
            tracker: LinkTracker::new(config),
            transport,
            clock,
            tx_sequence: 0,
            failsafe: DEFAULT_FAILSAFE_COMMAND.to_vec(),
            emergency_pending: false,
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn codec(&self) -> &PacketCodec {
        &self.codec
    }

    pub fn tracker(&self) -> &LinkTracker {
        &self.tracker
    }

    /// Sequence number the next outgoing frame will carry
    pub fn tx_sequence(&self) -> u8 {
        self.tx_sequence
    }

    pub fn is_active(&self) -> bool {
        self.tracker.is_active()
    }

    pub fn failsafe_engaged(&self) -> bool {
        self.tracker.failsafe_engaged()
    }

    /// Milliseconds since the last accepted frame, `None` if never received
    pub fn time_since_rx(&self) -> Option<u32> {
        self.tracker.time_since_rx(self.clock.now_ms())
    }

    pub fn stats(&self) -> Option<&LinkStatistics> {
        self.tracker.stats()
    }

    pub fn reset_stats(&mut self) {
        self.tracker.reset_stats();
    }

    /// Store the command returned while the link is lost
    ///
    /// # Errors
    ///
    /// Returns `PayloadTooLarge` if the payload does not fit in a frame.
    pub fn set_failsafe(&mut self, payload: &[u8]) -> Result<()> {
        if payload.len() > MAX_PAYLOAD_SIZE {
            return Err(RcLinkError::PayloadTooLarge {
                size: payload.len(),
                max: MAX_PAYLOAD_SIZE,
            });
        }
        self.failsafe = payload.to_vec();
        debug!("Failsafe values updated ({} bytes)", payload.len());
        Ok(())
    }

    pub fn failsafe(&self) -> &[u8] {
        &self.failsafe
    }

    /// Re-evaluate link health at `now`
    pub fn tick(&mut self, now: u32) -> Option<LinkEvent> {
        self.tracker.on_tick(now)
    }

    /// Re-evaluate link health using the link's own clock
    pub fn update(&mut self) -> Option<LinkEvent> {
        let now = self.clock.now_ms();
        self.tick(now)
    }

    /// Encode and transmit a payload
    ///
    /// # Returns
    ///
    /// * `Result<u8>` - Sequence number the frame was sent with
    ///
    /// # Errors
    ///
    /// - `PayloadTooLarge` if the payload exceeds 26 bytes
    /// - `HardwareFailure` if the transport rejects the frame; the sequence
    ///   number is then reused by the next send
    pub fn send(&mut self, payload: &[u8], packet_type: PacketType) -> Result<u8> {
        let frame = self.codec.encode(packet_type, payload, self.tx_sequence)?;
        self.transmit(frame, packet_type)
    }

    /// Transmit an empty keep-alive frame
    pub fn send_heartbeat(&mut self) -> Result<u8> {
        let frame = self.codec.encode_heartbeat(self.tx_sequence);
        self.transmit(frame, PacketType::Heartbeat)
    }

    /// Transmit an empty emergency frame (ground only)
    pub fn send_emergency(&mut self) -> Result<u8> {
        self.require_role(Role::Ground, "send_emergency")?;
        let frame = self.codec.encode_emergency(self.tx_sequence);
        self.transmit(frame, PacketType::Emergency)
    }

    /// Send a command to the aircraft (ground only)
    pub fn send_command(&mut self, command: &[u8]) -> Result<u8> {
        self.require_role(Role::Ground, "send_command")?;
        self.send(command, PacketType::Command)
    }

    /// Send telemetry to the ground station (aircraft only)
    pub fn send_telemetry(&mut self, telemetry: &[u8]) -> Result<u8> {
        self.require_role(Role::Aircraft, "send_telemetry")?;
        self.send(telemetry, PacketType::Telemetry)
    }

    /// Poll the transport and decode one frame
    ///
    /// A decode failure is counted in the statistics but never takes the link
    /// down by itself; that is left to [`RcLink::tick`].
    ///
    /// # Errors
    ///
    /// - `NoData` if nothing was waiting (link state untouched)
    /// - Any decode error from [`PacketCodec::decode`]
    pub fn receive(&mut self, expected_type: PacketType, expected_len: usize) -> Result<Vec<u8>> {
        let slot = self.transport.try_receive().ok_or(RcLinkError::NoData)?;

        match self.codec.decode(&slot, expected_type, expected_len) {
            Ok(payload) => {
                let sequence = slot[2];
                self.tracker.on_decode_success(sequence, self.clock.now_ms());
                debug!("{:?} received (seq={})", expected_type, sequence);
                Ok(payload)
            }
            Err(e) => Err(self.reject(e)),
        }
    }

    /// Poll the transport and decode one frame of any type and length
    pub fn receive_any(&mut self) -> Result<DecodedFrame> {
        let slot = self.transport.try_receive().ok_or(RcLinkError::NoData)?;

        match self.codec.decode_any(&slot) {
            Ok(frame) => {
                self.tracker.on_decode_success(frame.sequence, self.clock.now_ms());
                debug!("Frame type 0x{:02X} received (seq={})", frame.packet_type, frame.sequence);
                Ok(frame)
            }
            Err(e) => Err(self.reject(e)),
        }
    }

    /// Receive telemetry from the aircraft (ground only)
    pub fn receive_telemetry(&mut self, expected_len: usize) -> Result<Vec<u8>> {
        self.require_role(Role::Ground, "receive_telemetry")?;
        self.receive(PacketType::Telemetry, expected_len)
    }

    /// Receive a command from the ground station (aircraft only)
    ///
    /// Heartbeat and emergency frames share the ground's sequence numbers, so
    /// they are credited to the link on the way to the next command instead
    /// of being rejected. An emergency frame also raises the flag read by
    /// [`RcLink::take_emergency`].
    pub fn receive_command(&mut self, expected_len: usize) -> Result<Vec<u8>> {
        self.require_role(Role::Aircraft, "receive_command")?;
        self.receive_command_frame(expected_len)
    }

    /// True if an emergency frame reached the command path since the last call
    pub fn take_emergency(&mut self) -> bool {
        std::mem::take(&mut self.emergency_pending)
    }

    /// Receive a command, substituting the failsafe payload once the link is lost
    ///
    /// When nothing usable arrives, link health is re-evaluated on the spot;
    /// if the link is `Inactive` the stored failsafe payload is returned as
    /// success. The first substitution of a loss episode is logged; later
    /// ones are silent.
    ///
    /// # Errors
    ///
    /// - `InvalidParameter` if called in the ground role, or if a failsafe
    ///   substitution is due and the failsafe length differs from `expected_len`
    /// - `NoData` / decode errors while the link is still `Active`
    pub fn receive_command_with_failsafe(&mut self, expected_len: usize) -> Result<Vec<u8>> {
        self.require_role(Role::Aircraft, "receive_command_with_failsafe")?;

        let error = match self.receive_command_frame(expected_len) {
            Ok(command) => return Ok(command),
            Err(e) => e,
        };

        // Detect loss here too, without waiting for the next tick
        self.tracker.on_tick(self.clock.now_ms());
        if self.tracker.is_active() {
            return Err(error);
        }

        if self.failsafe.len() != expected_len {
            return Err(RcLinkError::InvalidParameter(format!(
                "failsafe payload is {} bytes, command expects {}",
                self.failsafe.len(),
                expected_len
            )));
        }

        if self.tracker.engage_failsafe() {
            warn!("Link lost - activating failsafe");
        }
        debug!("Failsafe substituted for: {}", error);
        Ok(self.failsafe.clone())
    }

    fn receive_command_frame(&mut self, expected_len: usize) -> Result<Vec<u8>> {
        loop {
            let slot = self.transport.try_receive().ok_or(RcLinkError::NoData)?;

            let frame = match self.codec.decode_any(&slot) {
                Ok(frame) => frame,
                Err(e) => return Err(self.reject(e)),
            };

            match frame.kind() {
                Some(PacketType::Heartbeat) => {
                    self.tracker.on_decode_success(frame.sequence, self.clock.now_ms());
                    debug!("Heartbeat received (seq={})", frame.sequence);
                }
                Some(PacketType::Emergency) => {
                    self.tracker.on_decode_success(frame.sequence, self.clock.now_ms());
                    self.emergency_pending = true;
                    warn!("Emergency frame received (seq={})", frame.sequence);
                }
                Some(PacketType::Command) if frame.payload.len() == expected_len => {
                    self.tracker.on_decode_success(frame.sequence, self.clock.now_ms());
                    debug!("Command received (seq={})", frame.sequence);
                    return Ok(frame.payload);
                }
                Some(PacketType::Command) => {
                    return Err(self.reject(RcLinkError::LengthMismatch {
                        expected: expected_len,
                        actual: frame.payload.len(),
                    }));
                }
                _ => {
                    return Err(self.reject(RcLinkError::UnexpectedType {
                        expected: PacketType::Command.as_u8(),
                        actual: frame.packet_type,
                    }));
                }
            }
        }
    }

    fn transmit(&mut self, frame: Frame, packet_type: PacketType) -> Result<u8> {
        if !self.transport.transmit(frame.slot()) {
            return Err(RcLinkError::HardwareFailure);
        }

        let sequence = self.tx_sequence;
        self.tx_sequence = self.tx_sequence.wrapping_add(1);
        self.tracker.on_sent();

        debug!("{:?} sent (seq={})", packet_type, sequence);
        Ok(sequence)
    }

    fn reject(&mut self, error: RcLinkError) -> RcLinkError {
        match &error {
            RcLinkError::InvalidChecksum { .. } | RcLinkError::VersionMismatch { .. } => {
                warn!("Frame rejected: {}", error);
            }
            _ => debug!("Frame rejected: {}", error),
        }
        self.tracker.on_decode_failure(&error);
        error
    }

    fn require_role(&self, role: Role, operation: &str) -> Result<()> {
        if self.role != role {
            return Err(RcLinkError::InvalidParameter(format!(
                "{} requires the {} role, link is {}",
                operation, role, self.role
            )));
        }
        Ok(())
    }
}
