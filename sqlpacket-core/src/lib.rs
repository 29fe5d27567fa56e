//! sqlpacket core library
//!
//! This crate provides the error taxonomy, the validated agent configuration
//! and the captured packet type shared by the capture and forwarding crates.

pub mod config;
pub mod error;
pub mod packet;

// Re-export commonly used types
pub use config::AgentConfig;
pub use error::{Error, Result};
pub use packet::Packet;
