//! Capture worker lifecycle state

use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;

/// Where a capture worker is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WorkerState {
    /// Capture handle not opened yet
    #[default]
    Idle,
    /// Reading packets and forwarding frames
    Capturing,
    /// A send failed and the session is reconnecting
    Reconnecting,
    /// Capture and connection closed, thread exiting
    Terminated,
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WorkerState::Idle => "idle",
            WorkerState::Capturing => "capturing",
            WorkerState::Reconnecting => "reconnecting",
            WorkerState::Terminated => "terminated",
        };
        f.write_str(name)
    }
}

/// Shared view of one worker's state
///
/// The worker and its session write it; the supervisor reads it.
#[derive(Debug, Clone, Default)]
pub struct StateHandle(Arc<RwLock<WorkerState>>);

impl StateHandle {
    /// Create a handle in the `Idle` state
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state
    pub fn get(&self) -> WorkerState {
        *self.0.read()
    }

    /// Move to `state`
    pub fn set(&self, state: WorkerState) {
        *self.0.write() = state;
    }
}
