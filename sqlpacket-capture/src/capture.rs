//! Live packet capture wrapper around pcap

use pcap::{Active, Capture};
use sqlpacket_core::{Error, Packet, Result};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, info};

use crate::interface::find_interface;
use crate::stats::CaptureStats;

/// Default timeout for packet capture (milliseconds)
///
/// Bounds how long a read blocks so the caller can observe shutdown
/// on an idle interface.
const DEFAULT_TIMEOUT_MS: i32 = 1000;

/// Configuration for packet capture
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Maximum bytes to capture per packet
    pub snaplen: i32,
    /// Read timeout in milliseconds
    pub timeout_ms: i32,
    /// Enable promiscuous mode
    pub promiscuous: bool,
    /// Enable immediate mode (deliver packets immediately)
    pub immediate_mode: bool,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            snaplen: sqlpacket_core::config::DEFAULT_SNAPLEN,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            promiscuous: true,
            immediate_mode: true,
        }
    }
}

impl CaptureConfig {
    /// Capture configuration with a custom snapshot length
    pub fn with_snaplen(snaplen: i32) -> Self {
        Self {
            snaplen,
            ..Self::default()
        }
    }
}

/// One step of a capture sequence
#[derive(Debug)]
pub enum CaptureEvent {
    /// A packet matched the filter
    Packet(Packet),
    /// The read timeout expired without a packet
    Timeout,
    /// The source is exhausted and will not produce more packets
    Closed,
}

/// An ordered, lazily produced sequence of captured packets
pub trait PacketSource: Send {
    /// Name of the interface this source captures on
    fn interface(&self) -> &str;

    /// Block until the next packet, a read timeout, or the end of the source
    fn next_event(&mut self) -> Result<CaptureEvent>;

    /// Kernel counters for this source, if the backend reports them
    fn stats(&mut self) -> Option<CaptureStats> {
        None
    }
}

/// Live capture on one device with a BPF filter applied
pub struct LiveCapture {
    /// Interface name
    interface: String,
    /// BPF filter in effect
    filter: String,
    /// Active pcap capture
    capture: Capture<Active>,
}

impl LiveCapture {
    /// Open a live capture on `interface` and apply `filter`
    ///
    /// Every failure is reported as [`Error::CaptureSetup`].
    pub fn open(interface: &str, filter: &str, config: &CaptureConfig) -> Result<Self> {
        debug!(interface = %interface, ?config, "Opening live capture");

        find_interface(interface)?;

        let capture = Capture::from_device(interface)
            .map_err(|e| Error::capture_setup(interface, format!("Failed to create capture: {}", e)))?
            .promisc(config.promiscuous)
            .snaplen(config.snaplen)
            .timeout(config.timeout_ms)
            .immediate_mode(config.immediate_mode);

        let mut capture = capture
            .open()
            .map_err(|e| Error::capture_setup(interface, format!("Failed to open capture: {}", e)))?;

        capture
            .filter(filter, true)
            .map_err(|e| Error::capture_setup(interface, format!("Invalid BPF filter: {}", e)))?;

        info!(interface = %interface, filter = %filter, "Capture initialized");

        Ok(Self {
            interface: interface.to_string(),
            filter: filter.to_string(),
            capture,
        })
    }

    /// BPF filter applied to this capture
    pub fn filter(&self) -> &str {
        &self.filter
    }
}

impl PacketSource for LiveCapture {
    fn interface(&self) -> &str {
        &self.interface
    }

    fn next_event(&mut self) -> Result<CaptureEvent> {
        match self.capture.next_packet() {
            Ok(packet) => {
                let timestamp = timeval_to_system_time(
                    packet.header.ts.tv_sec as i64,
                    packet.header.ts.tv_usec as i64,
                );
                Ok(CaptureEvent::Packet(Packet {
                    timestamp,
                    interface: self.interface.clone(),
                    data: packet.data.to_vec(),
                    len: packet.header.len as usize,
                }))
            }
            Err(pcap::Error::TimeoutExpired) => Ok(CaptureEvent::Timeout),
            Err(pcap::Error::NoMorePackets) => Ok(CaptureEvent::Closed),
            Err(e) if is_handle_gone(&e) => {
                info!(interface = %self.interface, error = %e, "Capture device is gone");
                Ok(CaptureEvent::Closed)
            }
            Err(e) => Err(Error::Capture(format!("{}: {}", self.interface, e))),
        }
    }

    fn stats(&mut self) -> Option<CaptureStats> {
        self.capture.stats().ok().map(CaptureStats::from_pcap_stats)
    }
}

/// Whether a read error means the handle will never produce packets again
fn is_handle_gone(err: &pcap::Error) -> bool {
    match err {
        pcap::Error::PcapError(msg) => {
            let msg = msg.to_ascii_lowercase();
            msg.contains("went down") || msg.contains("disappeared") || msg.contains("no such device")
        }
        _ => false,
    }
}

/// Convert a pcap `timeval` into a wall-clock instant
pub fn timeval_to_system_time(secs: i64, micros: i64) -> SystemTime {
    let micros = micros.clamp(0, 999_999) as u64;
    let sub = Duration::from_micros(micros);

    if secs >= 0 {
        UNIX_EPOCH + Duration::from_secs(secs as u64) + sub
    } else {
        UNIX_EPOCH - Duration::from_secs(secs.unsigned_abs()) + sub
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters;

    #[test]
    fn test_capture_config_default() {
        let config = CaptureConfig::default();
        assert_eq!(config.snaplen, 65535);
        assert_eq!(config.timeout_ms, DEFAULT_TIMEOUT_MS);
        assert!(config.promiscuous);
        assert!(config.immediate_mode);
    }

    #[test]
    fn test_capture_config_snaplen() {
        let config = CaptureConfig::with_snaplen(1500);
        assert_eq!(config.snaplen, 1500);
        assert!(config.promiscuous);
    }

    #[test]
    fn test_timeval_conversion() {
        let ts = timeval_to_system_time(1_700_000_000, 250_000);
        let since = ts.duration_since(UNIX_EPOCH).unwrap();
        assert_eq!(since.as_secs(), 1_700_000_000);
        assert_eq!(since.subsec_micros(), 250_000);
    }

    #[test]
    fn test_timeval_before_epoch() {
        let ts = timeval_to_system_time(-2, 500_000);
        let before = UNIX_EPOCH.duration_since(ts).unwrap();
        assert_eq!(before, Duration::from_millis(1500));
    }

    #[test]
    fn test_handle_gone_errors() {
        assert!(is_handle_gone(&pcap::Error::PcapError(
            "The interface went down".to_string()
        )));
        assert!(is_handle_gone(&pcap::Error::PcapError(
            "The interface disappeared".to_string()
        )));
        assert!(!is_handle_gone(&pcap::Error::PcapError(
            "recvfrom: Interrupted system call".to_string()
        )));
        assert!(!is_handle_gone(&pcap::Error::TimeoutExpired));
    }

    #[test]
    fn test_open_unknown_device_is_setup_error() {
        let result = LiveCapture::open(
            "nonexistent_interface_xyz",
            &filters::tcp_port_filter(3306),
            &CaptureConfig::default(),
        );
        assert!(matches!(result, Err(Error::CaptureSetup { .. })));
    }

    #[test]
    fn test_open_loopback() {
        let result = LiveCapture::open("lo", &filters::tcp_port_filter(3306), &CaptureConfig::default())
            .or_else(|_| {
                LiveCapture::open("lo0", &filters::tcp_port_filter(3306), &CaptureConfig::default())
            });

        // This might fail if not running with permissions
        match result {
            Ok(capture) => {
                assert!(!capture.interface().is_empty());
                assert!(capture.filter().contains("3306"));
            }
            Err(e) => {
                assert!(e.is_fatal());
                println!("Could not open capture (may need privileges): {}", e);
            }
        }
    }
}
