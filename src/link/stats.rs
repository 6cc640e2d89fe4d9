//! Link statistics counters.

use serde::Serialize;

/// Monotonic link counters plus derived link quality.
///
/// Counters saturate instead of wrapping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LinkStatistics {
    /// Frames handed to the transport successfully
    pub packets_sent: u32,

    /// Frames received and decoded successfully
    pub packets_received: u32,

    /// Frames the peer sent that never arrived (sequence gaps)
    pub packets_missed: u32,

    /// Frames dropped for a bad or unlocatable checksum
    pub checksum_failures: u32,

    /// Frames dropped for a protocol version mismatch
    pub version_mismatches: u32,

    /// Valid frames of the wrong type or payload length
    pub unexpected_frames: u32,

    /// Share of the peer's frames that arrived (0-100%)
    pub link_quality: u8,
}

impl LinkStatistics {
    pub(crate) fn record_sent(&mut self) {
        self.packets_sent = self.packets_sent.saturating_add(1);
    }

    pub(crate) fn record_received(&mut self) {
        self.packets_received = self.packets_received.saturating_add(1);
    }

    pub(crate) fn record_missed(&mut self, count: u8) {
        self.packets_missed = self.packets_missed.saturating_add(u32::from(count));
    }

    pub(crate) fn record_checksum_failure(&mut self) {
        self.checksum_failures = self.checksum_failures.saturating_add(1);
    }

    pub(crate) fn record_version_mismatch(&mut self) {
        self.version_mismatches = self.version_mismatches.saturating_add(1);
    }

    pub(crate) fn record_unexpected_frame(&mut self) {
        self.unexpected_frames = self.unexpected_frames.saturating_add(1);
    }

    /// Recompute `link_quality` as received / (received + missed)
    pub(crate) fn update_link_quality(&mut self) {
        let received = u64::from(self.packets_received);
        let expected = received + u64::from(self.packets_missed);

        self.link_quality = if expected == 0 {
            0
        } else {
            ((received * 100) / expected).min(100) as u8
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_quality_no_traffic() {
        let mut stats = LinkStatistics::default();
        stats.update_link_quality();
        assert_eq!(stats.link_quality, 0);
    }

    #[test]
    fn test_link_quality_ratio() {
        let mut stats = LinkStatistics::default();
        for _ in 0..3 {
            stats.record_received();
        }
        stats.record_missed(1);
        stats.update_link_quality();
        assert_eq!(stats.link_quality, 75);
    }

    #[test]
    fn test_link_quality_perfect() {
        let mut stats = LinkStatistics::default();
        stats.record_received();
        stats.update_link_quality();
        assert_eq!(stats.link_quality, 100);
    }

    #[test]
    fn test_counters_saturate() {
        let mut stats = LinkStatistics {
            packets_sent: u32::MAX,
            packets_missed: u32::MAX - 1,
            ..Default::default()
        };
        stats.record_sent();
        stats.record_missed(200);
        assert_eq!(stats.packets_sent, u32::MAX);
        assert_eq!(stats.packets_missed, u32::MAX);
    }

    #[test]
    fn test_serializes_to_json() {
        let stats = LinkStatistics {
            packets_sent: 5,
            link_quality: 80,
            ..Default::default()
        };
        let json = serde_json::to_value(stats).unwrap();
        assert_eq!(json["packets_sent"], 5);
        assert_eq!(json["link_quality"], 80);
        assert_eq!(json["checksum_failures"], 0);
    }
}
