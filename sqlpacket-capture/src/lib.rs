//! Packet capture library for the sqlpacket agent
//!
//! This crate wraps pcap to produce the capture sequence a forwarding worker
//! consumes: one live handle per device, with the BPF filter applied at open.
//!
//! ## Example
//!
//! ```no_run
//! use sqlpacket_capture::{filters, CaptureConfig, CaptureEvent, LiveCapture, PacketSource};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut capture = LiveCapture::open(
//!     "eth0",
//!     &filters::tcp_port_filter(3306),
//!     &CaptureConfig::default(),
//! )?;
//!
//! loop {
//!     match capture.next_event()? {
//!         CaptureEvent::Packet(packet) => println!("Got packet: {} bytes", packet.len()),
//!         CaptureEvent::Timeout => continue,
//!         CaptureEvent::Closed => break,
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod capture;
pub mod filters;
pub mod interface;
pub mod stats;

// Re-export main types
pub use capture::{CaptureConfig, CaptureEvent, LiveCapture, PacketSource};
pub use filters::tcp_port_filter;
pub use interface::{
    capture_capable, find_interface, list_capture_interfaces, list_interfaces, InterfaceInfo,
};
pub use stats::CaptureStats;
