//! Process exit codes

use sqlpacket_core::Error;

/// Exit code constants.
pub mod codes {
    /// Successful execution.
    pub const SUCCESS: u8 = 0;
    /// Invalid arguments or configuration.
    pub const INVALID_CONFIG: u8 = 1;
    /// A capture device could not be opened or filtered.
    pub const CAPTURE_SETUP: u8 = 2;
    /// The analysis server stayed unreachable.
    pub const NETWORK: u8 = 3;
    /// Anything else.
    pub const INTERNAL: u8 = 4;
}

/// Map an agent error to an exit code.
pub fn exit_code(error: &Error) -> u8 {
    match error {
        Error::Config(_) => codes::INVALID_CONFIG,
        Error::CaptureSetup { .. } => codes::CAPTURE_SETUP,
        Error::ReconnectExhausted { .. } | Error::Dial { .. } | Error::Send(_) => codes::NETWORK,
        Error::Encoding(_) | Error::Capture(_) | Error::Io(_) => codes::INTERNAL,
    }
}
