//! Packet types

use std::time::SystemTime;

/// A packet captured on one interface
#[derive(Debug, Clone)]
pub struct Packet {
    /// When the capture subsystem saw the packet
    pub timestamp: SystemTime,
    /// Interface the packet was received on
    pub interface: String,
    /// Captured bytes (link-layer header included)
    pub data: Vec<u8>,
    /// Length on the wire (may exceed data.len() if truncated by the snaplen)
    pub len: usize,
}

impl Packet {
    /// Create a packet stamped with the current time
    pub fn new(interface: String, data: Vec<u8>) -> Self {
        Self::with_timestamp(interface, data, SystemTime::now())
    }

    /// Create a packet with an explicit capture timestamp
    pub fn with_timestamp(interface: String, data: Vec<u8>, timestamp: SystemTime) -> Self {
        let len = data.len();
        Self {
            timestamp,
            interface,
            data,
            len,
        }
    }

    /// Get packet data as slice
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Get packet length on the wire
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check if packet is empty
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Whether the capture kept fewer bytes than the packet had on the wire
    pub fn is_truncated(&self) -> bool {
        self.data.len() < self.len
    }
}
