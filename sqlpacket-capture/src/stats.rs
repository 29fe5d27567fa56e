//! Kernel-side capture counters

/// Counters reported by the capture subsystem for one handle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CaptureStats {
    /// Packets that passed the filter
    pub packets_received: u64,
    /// Packets dropped because the capture buffer was full
    pub packets_dropped: u64,
    /// Packets dropped by the interface or its driver
    pub packets_if_dropped: u64,
}

impl CaptureStats {
    /// Create statistics from pcap stats
    pub fn from_pcap_stats(stats: pcap::Stat) -> Self {
        Self {
            packets_received: u64::from(stats.received),
            packets_dropped: u64::from(stats.dropped),
            packets_if_dropped: u64::from(stats.if_dropped),
        }
    }

    /// Calculate drop rate as percentage
    pub fn drop_rate(&self) -> f64 {
        if self.packets_received == 0 {
            return 0.0;
        }
        (self.packets_dropped as f64 / self.packets_received as f64) * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drop_rate() {
        let stats = CaptureStats {
            packets_received: 200,
            packets_dropped: 50,
            packets_if_dropped: 0,
        };
        assert_eq!(stats.drop_rate(), 25.0);
    }

    #[test]
    fn test_drop_rate_empty() {
        assert_eq!(CaptureStats::default().drop_rate(), 0.0);
    }
}
