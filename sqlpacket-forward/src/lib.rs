//! Capture-and-forward machinery for the sqlpacket agent
//!
//! This crate turns captured packets into length-prefixed frames and ships
//! them to the analysis server. It includes:
//!
//! - `frame`: handshake and frame encoding (and decoding, for receivers)
//! - `Session`: one server connection with bounded reconnect and
//!   at-most-once sends
//! - `CaptureWorker`: the per-interface capture, encode, send loop
//! - `Supervisor`: worker threads, signals and graceful shutdown
//!
//! # Example
//!
//! ```no_run
//! use sqlpacket_capture::{tcp_port_filter, CaptureConfig, LiveCapture};
//! use sqlpacket_core::AgentConfig;
//! use sqlpacket_forward::{CaptureWorker, RetryPolicy, Session, ShutdownFlag, TcpConnector};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AgentConfig::from_file("etc/config.yaml")?;
//!     let session = Session::new(
//!         TcpConnector::from_config(&config),
//!         RetryPolicy::from_config(&config),
//!     );
//!
//!     let filter = tcp_port_filter(config.target_port);
//!     let capture_config = CaptureConfig::with_snaplen(config.snaplen);
//!     let summary = CaptureWorker::new("eth0", session, ShutdownFlag::new())
//!         .run(|| LiveCapture::open("eth0", &filter, &capture_config))?;
//!
//!     println!("delivered {} frames", summary.frames_delivered);
//!     Ok(())
//! }
//! ```

pub mod connector;
pub mod frame;
pub mod retry;
pub mod session;
pub mod signal;
pub mod state;
pub mod supervisor;
pub mod worker;

#[cfg(test)]
mod testing;

pub use connector::{Connector, TcpConnector};
pub use frame::{decode_frame, encode_frame, DecodedFrame, Handshake};
pub use retry::{retry, RealSleeper, RetryPolicy, Sleeper};
pub use session::{SendOutcome, Session};
pub use signal::{AgentSignal, ShutdownFlag, SignalListener};
pub use state::{StateHandle, WorkerState};
pub use supervisor::{ShutdownReason, Supervisor, WorkerExit};
pub use worker::{CaptureWorker, WorkerSummary};
