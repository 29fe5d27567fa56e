//! Capture device enumeration

use pcap::Device;
use sqlpacket_core::{Error, Result};
use std::net::IpAddr;

/// Pseudo-device that captures on every interface (Linux)
pub const ANY_DEVICE: &str = "any";

/// Information about a capture device
#[derive(Debug, Clone)]
pub struct InterfaceInfo {
    /// Device name (e.g., "eth0", "en0")
    pub name: String,
    /// Human-readable description
    pub description: String,
    /// Addresses assigned to this device
    pub ips: Vec<IpAddr>,
    /// Whether the device is up
    pub is_up: bool,
    /// Whether the device is a loopback
    pub is_loopback: bool,
}

impl From<&Device> for InterfaceInfo {
    fn from(device: &Device) -> Self {
        InterfaceInfo {
            name: device.name.clone(),
            description: device.desc.clone().unwrap_or_else(|| device.name.clone()),
            ips: device.addresses.iter().map(|a| a.addr).collect(),
            is_up: device.flags.is_up(),
            is_loopback: device.flags.is_loopback(),
        }
    }
}

impl InterfaceInfo {
    /// Check if the device is a sensible capture target
    pub fn is_capture_capable(&self) -> bool {
        self.is_up && !self.is_loopback
    }
}

/// List all devices the capture subsystem can open
pub fn list_interfaces() -> Result<Vec<InterfaceInfo>> {
    let devices = Device::list()
        .map_err(|e| Error::Capture(format!("Failed to enumerate devices: {}", e)))?;

    Ok(devices.iter().map(InterfaceInfo::from).collect())
}

/// List the devices worth capturing on: up and not loopback
pub fn list_capture_interfaces() -> Result<Vec<InterfaceInfo>> {
    Ok(capture_capable(list_interfaces()?))
}

/// Keep only capture-capable devices, preserving order
pub fn capture_capable(devices: Vec<InterfaceInfo>) -> Vec<InterfaceInfo> {
    devices
        .into_iter()
        .filter(InterfaceInfo::is_capture_capable)
        .collect()
}

/// Look up a device by name before opening it
///
/// The `any` pseudo-device is accepted even where it is not listed.
pub fn find_interface(name: &str) -> Result<InterfaceInfo> {
    let devices = match list_interfaces() {
        Ok(devices) => devices,
        Err(_) if name == ANY_DEVICE => Vec::new(),
        Err(e) => return Err(Error::capture_setup(name, e)),
    };

    if let Some(info) = devices.into_iter().find(|d| d.name == name) {
        return Ok(info);
    }

    if name == ANY_DEVICE {
        return Ok(InterfaceInfo {
            name: name.to_string(),
            description: "Pseudo-device that captures on all interfaces".to_string(),
            ips: Vec::new(),
            is_up: true,
            is_loopback: false,
        });
    }

    Err(Error::capture_setup(name, "no such capture device"))
}
