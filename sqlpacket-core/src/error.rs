//! Error types for the sqlpacket agent

use thiserror::Error;

/// Result type alias for sqlpacket operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the sqlpacket agent
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Missing or malformed configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// The capture device could not be opened or the filter could not be applied
    #[error("Capture setup failed on '{interface}': {reason}")]
    CaptureSetup { interface: String, reason: String },

    /// Error while reading from an open capture
    #[error("Packet capture error: {0}")]
    Capture(String),

    /// TCP dial or handshake failure
    #[error("Dial {addr} failed: {reason}")]
    Dial { addr: String, reason: String },

    /// Writing a frame to the server failed
    #[error("Send failed: {0}")]
    Send(std::io::Error),

    /// Every reconnect attempt failed
    #[error("Reconnect to server failed after {attempts} attempts: {last_error}")]
    ReconnectExhausted { attempts: u32, last_error: String },

    /// A frame could not be encoded
    #[error("Frame encoding error: {0}")]
    Encoding(String),
}

impl Error {
    /// Create a configuration error with a custom message
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Error::Config(msg.into())
    }

    /// Create a capture setup error for an interface
    pub fn capture_setup<I: Into<String>, R: std::fmt::Display>(interface: I, reason: R) -> Self {
        Error::CaptureSetup {
            interface: interface.into(),
            reason: reason.to_string(),
        }
    }

    /// Create a dial error for a server address
    pub fn dial<A: Into<String>, R: std::fmt::Display>(addr: A, reason: R) -> Self {
        Error::Dial {
            addr: addr.into(),
            reason: reason.to_string(),
        }
    }

    /// Create an encoding error with a custom message
    pub fn encoding<S: Into<String>>(msg: S) -> Self {
        Error::Encoding(msg.into())
    }

    /// Whether this error must stop the whole agent
    ///
    /// Dial and send failures are handled by the session's bounded reconnect,
    /// and a capture read error only ends the worker that hit it.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::Config(_)
                | Error::CaptureSetup { .. }
                | Error::ReconnectExhausted { .. }
                | Error::Encoding(_)
        )
    }
}
