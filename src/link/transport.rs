//! Collaborator traits for the radio and the clock, with the implementations
//! the crate ships.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc;

use crate::protocol::FrameSlot;

/// Radio driver contract
#[cfg_attr(test, mockall::automock)]
pub trait Transport {
    /// Send one 32-byte slot. May block briefly inside the driver.
    ///
    /// Returns false if the radio reported a failure.
    fn transmit(&mut self, slot: &FrameSlot) -> bool;

    /// Poll for one received slot without blocking
    fn try_receive(&mut self) -> Option<FrameSlot>;
}

/// Millisecond clock contract. Wraps silently at `u32::MAX`.
#[cfg_attr(test, mockall::automock)]
pub trait Clock {
    fn now_ms(&self) -> u32;
}

impl<F> Clock for F
where
    F: Fn() -> u32,
{
    fn now_ms(&self) -> u32 {
        self()
    }
}

/// Monotonic clock counting from its creation
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemClock {
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> u32 {
        // Truncation is the wraparound the link expects
        self.origin.elapsed().as_millis() as u32
    }
}

/// Settable clock shared between clones, for simulations and tests
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<AtomicU32>,
}

impl ManualClock {
    #[must_use]
    pub fn new(start_ms: u32) -> Self {
        Self {
            now: Arc::new(AtomicU32::new(start_ms)),
        }
    }

    pub fn set(&self, ms: u32) {
        self.now.store(ms, Ordering::Relaxed);
    }

    /// Move the clock forward, wrapping at `u32::MAX`
    pub fn advance(&self, ms: u32) {
        let now = self.now.load(Ordering::Relaxed);
        self.now.store(now.wrapping_add(ms), Ordering::Relaxed);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u32 {
        self.now.load(Ordering::Relaxed)
    }
}

/// Transport over bounded channels of 32-byte slots.
///
/// `transmit` fails when the outbound channel is full or closed, which is how
/// a stalled radio adapter surfaces as a hardware failure.
#[derive(Debug)]
pub struct ChannelTransport {
    tx: mpsc::Sender<FrameSlot>,
    rx: mpsc::Receiver<FrameSlot>,
}

impl ChannelTransport {
    pub fn new(tx: mpsc::Sender<FrameSlot>, rx: mpsc::Receiver<FrameSlot>) -> Self {
        Self { tx, rx }
    }

    /// Two transports wired to each other, as if over the air
    pub fn pair(capacity: usize) -> (Self, Self) {
        let (a_tx, b_rx) = mpsc::channel(capacity);
        let (b_tx, a_rx) = mpsc::channel(capacity);
        (Self::new(a_tx, a_rx), Self::new(b_tx, b_rx))
    }
}

impl Transport for ChannelTransport {
    fn transmit(&mut self, slot: &FrameSlot) -> bool {
        self.tx.try_send(*slot).is_ok()
    }

    fn try_receive(&mut self) -> Option<FrameSlot> {
        self.rx.try_recv().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::FRAME_SIZE;

    #[test]
    fn test_channel_pair_delivers_both_ways() {
        let (mut ground, mut aircraft) = ChannelTransport::pair(4);

        assert!(ground.transmit(&[1u8; FRAME_SIZE]));
        assert!(aircraft.transmit(&[2u8; FRAME_SIZE]));

        assert_eq!(aircraft.try_receive(), Some([1u8; FRAME_SIZE]));
        assert_eq!(ground.try_receive(), Some([2u8; FRAME_SIZE]));
        assert_eq!(ground.try_receive(), None);
    }

    #[test]
    fn test_channel_transmit_fails_when_full() {
        let (mut ground, _aircraft) = ChannelTransport::pair(1);
        assert!(ground.transmit(&[0u8; FRAME_SIZE]));
        assert!(!ground.transmit(&[0u8; FRAME_SIZE]));
    }

    #[test]
    fn test_channel_transmit_fails_when_peer_gone() {
        let (mut ground, aircraft) = ChannelTransport::pair(4);
        drop(aircraft);
        assert!(!ground.transmit(&[0u8; FRAME_SIZE]));
        assert_eq!(ground.try_receive(), None);
    }

    #[test]
    fn test_manual_clock_shared_and_wrapping() {
        let clock = ManualClock::new(u32::MAX - 1);
        let other = clock.clone();

        clock.advance(3);
        assert_eq!(other.now_ms(), 1);

        other.set(500);
        assert_eq!(clock.now_ms(), 500);
    }

    #[test]
    fn test_closure_clock() {
        let clock = || 1234u32;
        assert_eq!(clock.now_ms(), 1234);
    }

    #[test]
    fn test_system_clock_monotonic() {
        let clock = SystemClock::new();
        let a = clock.now_ms();
        let b = clock.now_ms();
        assert!(b >= a);
    }
}
