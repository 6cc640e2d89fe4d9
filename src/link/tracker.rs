//! # Link Health Tracker
//!
//! Decides whether the link is up from decode outcomes and time samples.
//!
//! ## States
//!
//! `Inactive` (initial) and `Active`. The link is taken down by a tick when
//! either loss condition holds:
//!
//! 1. **Timeout**: more than `timeout_ms` since the last accepted frame
//!    (skipped until a first frame arrives).
//! 2. **Sequence gaps**: `consecutive_missed >= loss_threshold`.
//!
//! Only an accepted frame brings the link back up. Failed decodes feed
//! statistics but never change state, so one corrupted frame cannot flap the
//! link.
//!
//! All time arithmetic uses wrapping `u32` subtraction, so a clock rolling
//! over past `u32::MAX` is harmless.

use tracing::{debug, info, warn};

use super::stats::LinkStatistics;
use crate::error::RcLinkError;

/// Default link-loss timeout in milliseconds
pub const DEFAULT_LINK_TIMEOUT_MS: u32 = 1000;

/// Default number of missed sequence numbers before declaring loss
pub const DEFAULT_LINK_LOSS_THRESHOLD: u8 = 10;

/// Tracker tuning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackerConfig {
    /// Silence longer than this declares the link lost
    pub timeout_ms: u32,
    /// Accumulated sequence gap that declares the link lost
    pub loss_threshold: u8,
    /// Whether statistics are collected
    pub statistics: bool,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_LINK_TIMEOUT_MS,
            loss_threshold: DEFAULT_LINK_LOSS_THRESHOLD,
            statistics: true,
        }
    }
}

/// Why the link was declared lost
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LossReason {
    /// Nothing accepted for `elapsed_ms`
    Timeout { elapsed_ms: u32 },
    /// Too many sequence numbers skipped
    SequenceGap { missed: u8 },
}

/// State change reported by the tracker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkEvent {
    Lost(LossReason),
    Restored,
}

/// Per-session link state.
#[derive(Debug, Clone)]
pub struct LinkTracker {
    config: TrackerConfig,
    rx_sequence_last: u8,
    last_rx_time: Option<u32>,
    consecutive_missed: u8,
    active: bool,
    failsafe_engaged: bool,
    stats: Option<LinkStatistics>,
}

impl LinkTracker {
    /// Creates a tracker in the `Inactive` state with nothing received yet.
    #[must_use]
    pub fn new(config: TrackerConfig) -> Self {
        Self {
            config,
            rx_sequence_last: 0,
            last_rx_time: None,
            consecutive_missed: 0,
            active: false,
            failsafe_engaged: false,
            stats: config.statistics.then(LinkStatistics::default),
        }
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn consecutive_missed(&self) -> u8 {
        self.consecutive_missed
    }

    pub fn rx_sequence_last(&self) -> u8 {
        self.rx_sequence_last
    }

    /// Timestamp of the last accepted frame, `None` if nothing arrived yet
    pub fn last_rx_time(&self) -> Option<u32> {
        self.last_rx_time
    }

    pub fn failsafe_engaged(&self) -> bool {
        self.failsafe_engaged
    }

    /// Milliseconds since the last accepted frame
    pub fn time_since_rx(&self, now: u32) -> Option<u32> {
        self.last_rx_time.map(|last| now.wrapping_sub(last))
    }

    /// Statistics, if enabled
    pub fn stats(&self) -> Option<&LinkStatistics> {
        self.stats.as_ref()
    }

    /// Zero all statistics counters (no-op when statistics are disabled)
    pub fn reset_stats(&mut self) {
        if let Some(stats) = self.stats.as_mut() {
            *stats = LinkStatistics::default();
            info!("Link statistics reset");
        }
    }

    /// Re-evaluate both loss conditions
    ///
    /// # Returns
    ///
    /// * `Some(LinkEvent::Lost)` - if the link just went down
    /// * `None` - otherwise
    pub fn on_tick(&mut self, now: u32) -> Option<LinkEvent> {
        if let Some(stats) = self.stats.as_mut() {
            stats.update_link_quality();
        }

        let elapsed = self.time_since_rx(now);
        let timed_out = elapsed.is_some_and(|ms| ms > self.config.timeout_ms);
        let gap_exceeded = self.consecutive_missed >= self.config.loss_threshold;

        if !self.active || !(timed_out || gap_exceeded) {
            return None;
        }

        self.active = false;
        self.failsafe_engaged = true;

        let reason = match elapsed {
            Some(elapsed_ms) if timed_out => LossReason::Timeout { elapsed_ms },
            _ => LossReason::SequenceGap {
                missed: self.consecutive_missed,
            },
        };

        match reason {
            LossReason::Timeout { elapsed_ms } => {
                warn!("Link lost: timeout ({} ms)", elapsed_ms);
            }
            LossReason::SequenceGap { missed } => {
                warn!("Link lost: {} consecutive missed packets", missed);
            }
        }

        Some(LinkEvent::Lost(reason))
    }

    /// Account for a frame that passed validation
    ///
    /// # Returns
    ///
    /// * `Some(LinkEvent::Restored)` - if the link was inactive
    /// * `None` - otherwise
    pub fn on_decode_success(&mut self, sequence: u8, now: u32) -> Option<LinkEvent> {
        if self.last_rx_time.is_some() {
            let expected = self.rx_sequence_last.wrapping_add(1);
            let gap = sequence.wrapping_sub(expected);

            if gap > 0 {
                self.consecutive_missed = self.consecutive_missed.saturating_add(gap);
                if let Some(stats) = self.stats.as_mut() {
                    stats.record_missed(gap);
                }
                debug!("Sequence gap: missed {} packets (seq={})", gap, sequence);
            } else {
                self.consecutive_missed = 0;
            }
        }

        self.rx_sequence_last = sequence;
        self.last_rx_time = Some(now);

        if let Some(stats) = self.stats.as_mut() {
            stats.record_received();
        }

        if self.active {
            return None;
        }

        self.active = true;
        self.consecutive_missed = 0;
        self.failsafe_engaged = false;
        info!("Link restored (seq={})", sequence);

        Some(LinkEvent::Restored)
    }

    /// Account for a frame that failed to decode
    ///
    /// Statistics only: the link state and `consecutive_missed` are untouched.
    pub fn on_decode_failure(&mut self, error: &RcLinkError) {
        let Some(stats) = self.stats.as_mut() else {
            return;
        };

        match error {
            RcLinkError::InvalidChecksum { .. } => stats.record_checksum_failure(),
            RcLinkError::VersionMismatch { .. } => stats.record_version_mismatch(),
            RcLinkError::UnexpectedType { .. } | RcLinkError::LengthMismatch { .. } => {
                stats.record_unexpected_frame()
            }
            _ => {}
        }
    }

    /// Credit a successful transmission
    pub fn on_sent(&mut self) {
        if let Some(stats) = self.stats.as_mut() {
            stats.record_sent();
        }
    }

    /// Latch the failsafe while inactive
    ///
    /// # Returns
    ///
    /// * `bool` - true only on the first call of a loss episode
    pub fn engage_failsafe(&mut self) -> bool {
        if self.active || self.failsafe_engaged {
            return false;
        }
        self.failsafe_engaged = true;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker(timeout_ms: u32, loss_threshold: u8) -> LinkTracker {
        LinkTracker::new(TrackerConfig {
            timeout_ms,
            loss_threshold,
            statistics: true,
        })
    }

    fn receive_all(tracker: &mut LinkTracker, sequences: &[u8]) {
        for (i, &seq) in sequences.iter().enumerate() {
            tracker.on_decode_success(seq, i as u32);
        }
    }

    #[test]
    fn test_initial_state() {
        let tracker = tracker(100, 10);
        assert!(!tracker.is_active());
        assert_eq!(tracker.last_rx_time(), None);
        assert_eq!(tracker.time_since_rx(500), None);
        assert_eq!(tracker.consecutive_missed(), 0);
        assert!(!tracker.failsafe_engaged());
    }

    #[test]
    fn test_tick_never_brings_link_up() {
        let mut tracker = tracker(100, 10);
        assert_eq!(tracker.on_tick(0), None);
        assert_eq!(tracker.on_tick(50_000), None);
        assert!(!tracker.is_active());
    }

    #[test]
    fn test_first_frame_activates() {
        let mut tracker = tracker(100, 10);
        assert_eq!(tracker.on_decode_success(77, 10), Some(LinkEvent::Restored));
        assert!(tracker.is_active());
        assert_eq!(tracker.consecutive_missed(), 0);
        assert_eq!(tracker.rx_sequence_last(), 77);
        assert_eq!(tracker.last_rx_time(), Some(10));
    }

    #[test]
    fn test_in_order_sequence_no_gap() {
        let mut tracker = tracker(100, 10);
        receive_all(&mut tracker, &[0, 1, 2, 3]);
        assert_eq!(tracker.consecutive_missed(), 0);
        assert_eq!(tracker.stats().unwrap().packets_missed, 0);
    }

    #[test]
    fn test_sequence_gap_counts_skipped_numbers() {
        let mut tracker = tracker(100, 10);
        receive_all(&mut tracker, &[0, 1, 2, 5]);
        // 3 and 4 never arrived
        assert_eq!(tracker.consecutive_missed(), 2);
        assert_eq!(tracker.stats().unwrap().packets_missed, 2);
    }

    #[test]
    fn test_in_order_frame_resets_gap() {
        let mut tracker = tracker(100, 10);
        receive_all(&mut tracker, &[0, 4, 5]);
        assert_eq!(tracker.consecutive_missed(), 0);
        assert_eq!(tracker.stats().unwrap().packets_missed, 3);
    }

    #[test]
    fn test_gap_across_rollover() {
        let mut tracker = tracker(100, 10);
        receive_all(&mut tracker, &[254, 255, 0, 1]);
        assert_eq!(tracker.consecutive_missed(), 0);

        receive_all(&mut tracker, &[3]);
        assert_eq!(tracker.consecutive_missed(), 1);
    }

    #[test]
    fn test_duplicate_counts_as_wrapped_gap() {
        let mut tracker = tracker(100, 10);
        receive_all(&mut tracker, &[10, 10]);
        assert_eq!(tracker.consecutive_missed(), 255);
    }

    #[test]
    fn test_consecutive_missed_saturates() {
        let mut tracker = tracker(100, 255);
        receive_all(&mut tracker, &[0, 200, 150, 100]);
        assert_eq!(tracker.consecutive_missed(), u8::MAX);
    }

    #[test]
    fn test_timeout_transition() {
        let mut tracker = tracker(100, 10);
        tracker.on_decode_success(0, 0);

        assert_eq!(tracker.on_tick(99), None);
        assert!(tracker.is_active());
        assert_eq!(tracker.on_tick(100), None);
        assert!(tracker.is_active());

        assert_eq!(
            tracker.on_tick(101),
            Some(LinkEvent::Lost(LossReason::Timeout { elapsed_ms: 101 }))
        );
        assert!(!tracker.is_active());
        assert!(tracker.failsafe_engaged());

        // Loss reported once per episode
        assert_eq!(tracker.on_tick(500), None);
    }

    #[test]
    fn test_timeout_across_clock_wraparound() {
        let mut tracker = tracker(100, 10);
        tracker.on_decode_success(0, u32::MAX - 10);

        assert_eq!(tracker.on_tick(50), None);
        assert_eq!(tracker.time_since_rx(50), Some(61));
        assert!(tracker.is_active());

        assert!(tracker.on_tick(95).is_some());
        assert!(!tracker.is_active());
    }

    #[test]
    fn test_threshold_transition() {
        let mut tracker = tracker(100, 10);
        tracker.on_decode_success(0, 0);

        // Nine missed (1..=9)
        tracker.on_decode_success(10, 1);
        assert_eq!(tracker.consecutive_missed(), 9);
        assert_eq!(tracker.on_tick(2), None);
        assert!(tracker.is_active());

        // Tenth missed (11)
        tracker.on_decode_success(12, 3);
        assert_eq!(tracker.consecutive_missed(), 10);
        assert!(tracker.is_active(), "only a tick takes the link down");

        assert_eq!(
            tracker.on_tick(4),
            Some(LinkEvent::Lost(LossReason::SequenceGap { missed: 10 }))
        );
        assert!(!tracker.is_active());
    }

    #[test]
    fn test_recovery_resets_missed_in_same_step() {
        let mut tracker = tracker(100, 10);
        tracker.on_decode_success(0, 0);
        tracker.on_decode_success(20, 1);
        tracker.on_tick(2);
        assert!(!tracker.is_active());
        assert!(tracker.failsafe_engaged());

        assert_eq!(tracker.on_decode_success(21, 3), Some(LinkEvent::Restored));
        assert!(tracker.is_active());
        assert_eq!(tracker.consecutive_missed(), 0);
        assert!(!tracker.failsafe_engaged());
    }

    #[test]
    fn test_recovery_after_timeout() {
        let mut tracker = tracker(100, 10);
        tracker.on_decode_success(0, 0);
        tracker.on_tick(200);
        assert!(!tracker.is_active());

        assert_eq!(tracker.on_decode_success(1, 210), Some(LinkEvent::Restored));
        assert_eq!(tracker.on_tick(250), None);
        assert!(tracker.is_active());
    }

    #[test]
    fn test_decode_failure_is_statistics_only() {
        let mut tracker = tracker(100, 10);
        tracker.on_decode_success(0, 0);

        for _ in 0..50 {
            tracker.on_decode_failure(&RcLinkError::InvalidChecksum { expected: 1, actual: 2 });
        }
        tracker.on_decode_failure(&RcLinkError::VersionMismatch { expected: 1, actual: 2 });
        tracker.on_decode_failure(&RcLinkError::UnexpectedType { expected: 1, actual: 3 });
        tracker.on_decode_failure(&RcLinkError::NoData);

        assert!(tracker.is_active());
        assert_eq!(tracker.consecutive_missed(), 0);
        assert_eq!(tracker.on_tick(10), None);

        let stats = tracker.stats().unwrap();
        assert_eq!(stats.checksum_failures, 50);
        assert_eq!(stats.version_mismatches, 1);
        assert_eq!(stats.unexpected_frames, 1);
    }

    #[test]
    fn test_engage_failsafe_once_per_episode() {
        let mut tracker = tracker(100, 10);
        assert!(tracker.engage_failsafe());
        assert!(!tracker.engage_failsafe());

        tracker.on_decode_success(0, 0);
        assert!(!tracker.engage_failsafe(), "never engaged while active");

        tracker.on_tick(1000);
        assert!(!tracker.engage_failsafe(), "tick already latched it");
    }

    #[test]
    fn test_statistics_disabled() {
        let mut tracker = LinkTracker::new(TrackerConfig {
            statistics: false,
            ..Default::default()
        });
        tracker.on_sent();
        tracker.on_decode_success(0, 0);
        tracker.on_decode_success(5, 1);
        tracker.on_tick(2);
        tracker.reset_stats();

        assert!(tracker.stats().is_none());
        assert_eq!(tracker.consecutive_missed(), 4);
    }

    #[test]
    fn test_link_quality_updated_on_tick() {
        let mut tracker = tracker(1000, 100);
        receive_all(&mut tracker, &[0, 1, 2, 4]);
        tracker.on_tick(10);
        // 4 received, 1 missed
        assert_eq!(tracker.stats().unwrap().link_quality, 80);

        tracker.reset_stats();
        assert_eq!(tracker.stats().unwrap(), &LinkStatistics::default());
    }
}
