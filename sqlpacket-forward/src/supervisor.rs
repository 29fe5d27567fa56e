//! Supervisor for the per-interface capture workers
//!
//! Workers run on dedicated OS threads because packet capture blocks. The
//! supervisor lives on the async runtime and waits on two things at once:
//! signals, and worker exits. A termination signal or a fatal worker error
//! raises the shared [`ShutdownFlag`]; workers then get a grace period to
//! wind down before they are abandoned.

use sqlpacket_core::Result;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::signal::{AgentSignal, ShutdownFlag};
use crate::state::{StateHandle, WorkerState};
use crate::worker::WorkerSummary;

/// How often the supervisor checks for stopped workers during shutdown
const STOP_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Result of one worker thread
#[derive(Debug)]
pub struct WorkerExit {
    /// Interface the worker was bound to
    pub interface: String,
    /// Summary, or the error that ended it
    pub result: Result<WorkerSummary>,
}

/// Why [`Supervisor::run`] returned normally
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    /// A termination signal arrived
    Signal(AgentSignal),
    /// The signal source went away
    SignalsClosed,
}

struct WorkerHandle {
    interface: String,
    state: StateHandle,
    thread: JoinHandle<()>,
}

/// Owns the worker threads and the shutdown sequence
pub struct Supervisor {
    shutdown: ShutdownFlag,
    grace: Duration,
    workers: Vec<WorkerHandle>,
    exit_tx: mpsc::UnboundedSender<WorkerExit>,
    exit_rx: mpsc::UnboundedReceiver<WorkerExit>,
}

impl Supervisor {
    /// Create a supervisor that waits up to `grace` for workers to stop
    pub fn new(grace: Duration) -> Self {
        let (exit_tx, exit_rx) = mpsc::unbounded_channel();
        Self {
            shutdown: ShutdownFlag::new(),
            grace,
            workers: Vec::new(),
            exit_tx,
            exit_rx,
        }
    }

    /// The flag handed to every worker
    pub fn shutdown_flag(&self) -> ShutdownFlag {
        self.shutdown.clone()
    }

    /// Number of workers spawned
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Current state of every worker, in spawn order
    pub fn states(&self) -> Vec<(String, WorkerState)> {
        self.workers
            .iter()
            .map(|w| (w.interface.clone(), w.state.get()))
            .collect()
    }

    /// Start `job` on a new thread named after `interface`
    pub fn spawn<F>(&mut self, interface: &str, job: F) -> Result<()>
    where
        F: FnOnce(ShutdownFlag, StateHandle) -> Result<WorkerSummary> + Send + 'static,
    {
        let state = StateHandle::new();
        let shutdown = self.shutdown.clone();
        let exit_tx = self.exit_tx.clone();
        let worker_state = state.clone();
        let name = interface.to_string();

        let thread = thread::Builder::new()
            .name(format!("capture-{}", interface))
            .spawn(move || {
                let result = job(shutdown, worker_state);
                // The supervisor may already be gone
                let _ = exit_tx.send(WorkerExit {
                    interface: name,
                    result,
                });
            })?;

        debug!(interface = %interface, "Capture worker spawned");
        self.workers.push(WorkerHandle {
            interface: interface.to_string(),
            state,
            thread,
        });
        Ok(())
    }

    /// Supervise until a termination signal or a fatal worker error
    ///
    /// SIGPIPE is ignored. Workers that end without a fatal error are logged
    /// and the agent keeps running. In every case the shutdown flag is
    /// raised and workers get the grace period before this returns.
    pub async fn run(
        mut self,
        mut signals: mpsc::UnboundedReceiver<AgentSignal>,
    ) -> Result<ShutdownReason> {
        info!(workers = self.workers.len(), "Supervising capture workers");

        let outcome = loop {
            tokio::select! {
                sig = signals.recv() => match sig {
                    Some(sig) if sig.is_termination() => {
                        info!(signal = %sig, "Termination signal received, shutting down");
                        break Ok(ShutdownReason::Signal(sig));
                    }
                    Some(sig) => {
                        debug!(signal = %sig, "Ignoring signal");
                    }
                    None => {
                        warn!("Signal channel closed, shutting down");
                        break Ok(ShutdownReason::SignalsClosed);
                    }
                },
                Some(exit) = self.exit_rx.recv() => {
                    if let Err(e) = self.handle_exit(exit) {
                        break Err(e);
                    }
                }
            }
        };

        self.stop().await;
        outcome
    }

    fn handle_exit(&self, exit: WorkerExit) -> Result<()> {
        match exit.result {
            Ok(summary) => {
                info!(
                    interface = %exit.interface,
                    delivered = summary.frames_delivered,
                    dropped = summary.frames_dropped,
                    "Capture worker exited"
                );
                Ok(())
            }
            Err(e) if e.is_fatal() => {
                error!(interface = %exit.interface, error = %e, "Capture worker failed");
                Err(e)
            }
            Err(e) => {
                warn!(interface = %exit.interface, error = %e, "Capture worker stopped");
                Ok(())
            }
        }
    }

    /// Raise the shutdown flag and wait for workers, up to the grace period
    async fn stop(&mut self) {
        self.shutdown.trigger();

        let deadline = Instant::now() + self.grace;
        while Instant::now() < deadline && self.workers.iter().any(|w| !w.thread.is_finished()) {
            tokio::time::sleep(STOP_POLL_INTERVAL).await;
        }

        for worker in self.workers.drain(..) {
            if !worker.thread.is_finished() {
                warn!(
                    interface = %worker.interface,
                    state = %worker.state.get(),
                    grace_secs = self.grace.as_secs_f64(),
                    "Capture worker did not stop in time, abandoning"
                );
                continue;
            }
            if worker.thread.join().is_err() {
                error!(interface = %worker.interface, "Capture worker panicked");
            }
        }

        while let Ok(exit) = self.exit_rx.try_recv() {
            match exit.result {
                Ok(summary) => info!(
                    interface = %exit.interface,
                    captured = summary.packets_captured,
                    delivered = summary.frames_delivered,
                    dropped = summary.frames_dropped,
                    reconnects = summary.reconnects,
                    "Capture worker stopped"
                ),
                Err(e) => warn!(interface = %exit.interface, error = %e, "Capture worker stopped with error"),
            }
        }

        info!("Shutdown complete");
    }
}
