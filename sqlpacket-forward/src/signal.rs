//! Signal handling for graceful shutdown.
//!
//! [`ShutdownFlag`] is the stop flag shared by every capture worker.
//! [`SignalListener`] turns process signals into [`AgentSignal`]s for the
//! supervisor: SIGINT, SIGTERM and SIGQUIT request shutdown, SIGPIPE is
//! observed so it cannot kill the process, and is otherwise ignored.

use sqlpacket_core::Result;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::signal::unix::{signal, Signal, SignalKind};
use tokio::sync::mpsc;
use tracing::debug;

/// Flag that tracks whether shutdown has been requested.
#[derive(Debug, Clone, Default)]
pub struct ShutdownFlag {
    flag: Arc<AtomicBool>,
}

impl ShutdownFlag {
    /// Create a flag in the running state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request shutdown.
    pub fn trigger(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Returns true if shutdown has been requested.
    pub fn should_stop(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Process signals the agent reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentSignal {
    /// SIGINT
    Interrupt,
    /// SIGTERM
    Terminate,
    /// SIGQUIT
    Quit,
    /// SIGPIPE
    BrokenPipe,
}

impl AgentSignal {
    /// Whether this signal stops the agent
    pub fn is_termination(self) -> bool {
        !matches!(self, AgentSignal::BrokenPipe)
    }
}

impl fmt::Display for AgentSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AgentSignal::Interrupt => "SIGINT",
            AgentSignal::Terminate => "SIGTERM",
            AgentSignal::Quit => "SIGQUIT",
            AgentSignal::BrokenPipe => "SIGPIPE",
        };
        f.write_str(name)
    }
}

/// Listens for the signals in [`AgentSignal`]
///
/// Must be created inside a tokio runtime. Registering SIGPIPE replaces the
/// default disposition, so a write to a closed socket surfaces as an I/O
/// error instead of terminating the process.
pub struct SignalListener {
    interrupt: Signal,
    terminate: Signal,
    quit: Signal,
    pipe: Signal,
}

impl SignalListener {
    /// Register handlers for all four signals
    pub fn new() -> Result<Self> {
        Ok(Self {
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
            quit: signal(SignalKind::quit())?,
            pipe: signal(SignalKind::pipe())?,
        })
    }

    /// Wait for the next signal
    pub async fn recv(&mut self) -> AgentSignal {
        tokio::select! {
            _ = self.interrupt.recv() => AgentSignal::Interrupt,
            _ = self.terminate.recv() => AgentSignal::Terminate,
            _ = self.quit.recv() => AgentSignal::Quit,
            _ = self.pipe.recv() => AgentSignal::BrokenPipe,
        }
    }

    /// Forward signals into a channel from a background task
    pub fn spawn(mut self) -> mpsc::UnboundedReceiver<AgentSignal> {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(async move {
            loop {
                let sig = self.recv().await;
                debug!(signal = %sig, "Signal received");
                if tx.send(sig).is_err() {
                    // Receiver dropped, stop listening
                    break;
                }
            }
        });
        rx
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shutdown_flag_initially_false() {
        let flag = ShutdownFlag::new();
        assert!(!flag.should_stop());
    }

    #[test]
    fn test_shutdown_flag_clone_shares_state() {
        let flag1 = ShutdownFlag::new();
        let flag2 = flag1.clone();
        flag1.trigger();
        assert!(flag2.should_stop());
    }

    #[test]
    fn test_termination_signals() {
        assert!(AgentSignal::Interrupt.is_termination());
        assert!(AgentSignal::Terminate.is_termination());
        assert!(AgentSignal::Quit.is_termination());
        assert!(!AgentSignal::BrokenPipe.is_termination());
    }

    #[test]
    fn test_signal_display() {
        assert_eq!(AgentSignal::Terminate.to_string(), "SIGTERM");
        assert_eq!(AgentSignal::BrokenPipe.to_string(), "SIGPIPE");
    }

    #[tokio::test]
    async fn test_listener_registers() {
        assert!(SignalListener::new().is_ok());
    }

    #[tokio::test]
    async fn test_sigpipe_maps_to_broken_pipe() {
        let mut listener = SignalListener::new().unwrap();

        let status = std::process::Command::new("kill")
            .args(["-s", "PIPE", &std::process::id().to_string()])
            .status()
            .unwrap();
        assert!(status.success());

        let sig = tokio::time::timeout(std::time::Duration::from_secs(5), listener.recv())
            .await
            .unwrap();
        assert_eq!(sig, AgentSignal::BrokenPipe);
        assert!(!sig.is_termination());
    }
}
