//! Per-interface capture worker
//!
//! A worker connects its session, opens its capture source and then runs a
//! strictly sequential loop: next packet, encode, send. It owns both the
//! source and the session; nothing is shared with other workers except the
//! shutdown flag.

use sqlpacket_capture::{CaptureEvent, PacketSource};
use sqlpacket_core::{Packet, Result};
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::connector::Connector;
use crate::frame::encode_frame;
use crate::retry::Sleeper;
use crate::session::{SendOutcome, Session};
use crate::signal::ShutdownFlag;
use crate::state::{StateHandle, WorkerState};

/// Pause after a failed capture read before reading again
const READ_ERROR_PAUSE: Duration = Duration::from_millis(5);

/// Counters reported when a worker terminates
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkerSummary {
    /// Interface the worker captured on
    pub interface: String,
    /// Packets read from the capture source
    pub packets_captured: u64,
    /// Frames fully written to the server
    pub frames_delivered: u64,
    /// Frames discarded because their write failed
    pub frames_dropped: u64,
    /// Bytes written for delivered frames
    pub bytes_delivered: u64,
    /// Reconnects after failed sends
    pub reconnects: u64,
    /// Capture reads that failed and were retried
    pub read_errors: u64,
}

/// Why the capture loop ended without an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoopEnd {
    Shutdown,
    SourceClosed,
}

/// Capture-and-forward loop for one interface
pub struct CaptureWorker<C: Connector, S: Sleeper> {
    interface: String,
    session: Session<C, S>,
    shutdown: ShutdownFlag,
    state: StateHandle,
    summary: WorkerSummary,
}

impl<C: Connector, S: Sleeper> CaptureWorker<C, S> {
    /// Create a worker for `interface`
    pub fn new(interface: &str, session: Session<C, S>, shutdown: ShutdownFlag) -> Self {
        Self::with_state(interface, session, shutdown, StateHandle::new())
    }

    /// Create a worker that publishes its state through `state`
    pub fn with_state(
        interface: &str,
        session: Session<C, S>,
        shutdown: ShutdownFlag,
        state: StateHandle,
    ) -> Self {
        state.set(WorkerState::Idle);
        Self {
            interface: interface.to_string(),
            session: session.with_state(state.clone()),
            shutdown,
            state,
            summary: WorkerSummary {
                interface: interface.to_string(),
                ..WorkerSummary::default()
            },
        }
    }

    /// Handle to observe this worker's state
    pub fn state(&self) -> StateHandle {
        self.state.clone()
    }

    /// Connect, open the capture source via `open_source`, and forward until
    /// shutdown, the end of the source, or a fatal error
    ///
    /// Connection and capture setup failures, an exhausted reconnect and
    /// encoding failures are returned as errors. A failed capture read is
    /// logged and the read is retried after a short pause.
    pub fn run<P, F>(mut self, open_source: F) -> Result<WorkerSummary>
    where
        P: PacketSource,
        F: FnOnce() -> Result<P>,
    {
        info!(interface = %self.interface, server = %self.session.addr(), "Starting capture worker");

        if let Err(e) = self.session.open() {
            self.terminate();
            return Err(e);
        }

        let mut source = match open_source() {
            Ok(source) => source,
            Err(e) => {
                self.terminate();
                return Err(e);
            }
        };

        self.state.set(WorkerState::Capturing);
        let result = self.capture_loop(&mut source);

        if let Some(stats) = source.stats() {
            info!(
                interface = %self.interface,
                received = stats.packets_received,
                dropped = stats.packets_dropped,
                if_dropped = stats.packets_if_dropped,
                drop_rate = stats.drop_rate(),
                "Capture statistics"
            );
        }
        drop(source);
        self.terminate();

        match result {
            Ok(end) => {
                info!(
                    interface = %self.interface,
                    reason = ?end,
                    captured = self.summary.packets_captured,
                    delivered = self.summary.frames_delivered,
                    dropped = self.summary.frames_dropped,
                    reconnects = self.summary.reconnects,
                    read_errors = self.summary.read_errors,
                    "Capture worker finished"
                );
                Ok(self.summary)
            }
            Err(e) => Err(e),
        }
    }

    fn capture_loop<P: PacketSource>(&mut self, source: &mut P) -> Result<LoopEnd> {
        loop {
            if self.shutdown.should_stop() {
                debug!(interface = %self.interface, "Shutdown requested");
                return Ok(LoopEnd::Shutdown);
            }

            match source.next_event() {
                Ok(CaptureEvent::Packet(packet)) => self.forward(&packet)?,
                Ok(CaptureEvent::Timeout) => continue,
                Ok(CaptureEvent::Closed) => {
                    info!(interface = %self.interface, "Capture source closed");
                    return Ok(LoopEnd::SourceClosed);
                }
                Err(e) => {
                    self.summary.read_errors += 1;
                    warn!(
                        interface = %self.interface,
                        error = %e,
                        read_errors = self.summary.read_errors,
                        "Capture read failed, retrying"
                    );
                    thread::sleep(READ_ERROR_PAUSE);
                }
            }
        }
    }

    fn forward(&mut self, packet: &Packet) -> Result<()> {
        self.summary.packets_captured += 1;

        let frame = encode_frame(packet.data(), packet.timestamp)?;
        let outcome = self.session.send(&frame);
        self.summary.reconnects = self.session.reconnects();

        match outcome? {
            SendOutcome::Delivered => {
                self.summary.frames_delivered += 1;
                self.summary.bytes_delivered += frame.len() as u64;
            }
            SendOutcome::Dropped => {
                self.summary.frames_dropped += 1;
                warn!(
                    interface = %self.interface,
                    dropped = self.summary.frames_dropped,
                    "Frame dropped after send failure"
                );
            }
        }
        Ok(())
    }

    fn terminate(&mut self) {
        self.session.close();
        self.state.set(WorkerState::Terminated);
    }
}
