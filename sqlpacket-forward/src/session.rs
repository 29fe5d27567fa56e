//! Connection session to the analysis server
//!
//! A session owns at most one live connection for one capture worker. Sends
//! are at-most-once: when a write fails the connection is dropped, a
//! replacement is dialed with the bounded [`retry`] policy, and the frame
//! that failed is not sent again.

use sqlpacket_core::{Error, Result};
use std::io::{self, Write};
use tracing::{debug, info, warn};

use crate::connector::Connector;
use crate::retry::{retry, RealSleeper, RetryPolicy, Sleeper};
use crate::state::{StateHandle, WorkerState};

/// What happened to a frame handed to [`Session::send`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Every byte was written
    Delivered,
    /// The write failed; the session reconnected and the frame was discarded
    Dropped,
}

/// One outbound connection plus its retry bookkeeping
pub struct Session<C: Connector, S: Sleeper = RealSleeper> {
    connector: C,
    sleeper: S,
    policy: RetryPolicy,
    conn: Option<C::Conn>,
    reconnects: u64,
    state: StateHandle,
}

impl<C: Connector> Session<C, RealSleeper> {
    /// Create a session that sleeps for real between attempts
    pub fn new(connector: C, policy: RetryPolicy) -> Self {
        Self::with_sleeper(connector, policy, RealSleeper::new())
    }
}

impl<C: Connector, S: Sleeper> Session<C, S> {
    /// Create a session with a custom sleeper
    pub fn with_sleeper(connector: C, policy: RetryPolicy, sleeper: S) -> Self {
        Self {
            connector,
            sleeper,
            policy,
            conn: None,
            reconnects: 0,
            state: StateHandle::new(),
        }
    }

    /// Report reconnects through `state`
    pub fn with_state(mut self, state: StateHandle) -> Self {
        self.state = state;
        self
    }

    /// Address of the server
    pub fn addr(&self) -> &str {
        self.connector.addr()
    }

    /// Whether a connection is currently held
    pub fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    /// Successful reconnects after a failed send
    pub fn reconnects(&self) -> u64 {
        self.reconnects
    }

    /// Retry policy in use
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Make a single connection attempt, replacing any current connection
    pub fn connect(&mut self) -> Result<()> {
        self.close();
        self.conn = Some(self.connector.connect()?);
        Ok(())
    }

    /// Establish the first connection, retrying per the policy
    pub fn open(&mut self) -> Result<()> {
        self.close();
        self.conn = Some(self.dial_with_retry()?);
        info!(server = %self.connector.addr(), "Connected to server");
        Ok(())
    }

    /// Drop the current connection and dial a new one, retrying per the policy
    pub fn reconnect(&mut self) -> Result<()> {
        self.close();
        self.state.set(WorkerState::Reconnecting);

        let conn = self.dial_with_retry()?;
        self.conn = Some(conn);
        self.reconnects += 1;
        self.state.set(WorkerState::Capturing);

        info!(
            server = %self.connector.addr(),
            reconnects = self.reconnects,
            "Reconnected to server"
        );
        Ok(())
    }

    /// Write one frame
    ///
    /// A session that was never opened connects first. On a write error the
    /// frame is dropped after a successful reconnect; an exhausted reconnect
    /// is returned as an error.
    pub fn send(&mut self, frame: &[u8]) -> Result<SendOutcome> {
        if self.conn.is_none() {
            self.open()?;
        }

        match self.write_frame(frame) {
            Ok(()) => Ok(SendOutcome::Delivered),
            Err(e) => {
                warn!(
                    server = %self.connector.addr(),
                    error = %e,
                    frame_len = frame.len(),
                    "Send failed, dropping frame and reconnecting"
                );
                self.reconnect()?;
                Ok(SendOutcome::Dropped)
            }
        }
    }

    /// Close the connection, if any
    pub fn close(&mut self) {
        if self.conn.take().is_some() {
            debug!(server = %self.connector.addr(), "Connection closed");
        }
    }

    fn write_frame(&mut self, frame: &[u8]) -> Result<()> {
        let conn = self
            .conn
            .as_mut()
            .ok_or_else(|| Error::Send(io::Error::from(io::ErrorKind::NotConnected)))?;

        // write_all keeps writing the unwritten suffix after a partial write
        let result = conn.write_all(frame).and_then(|()| conn.flush());
        if let Err(e) = result {
            self.close();
            return Err(Error::Send(e));
        }
        Ok(())
    }

    fn dial_with_retry(&mut self) -> Result<C::Conn> {
        let connector = &mut self.connector;
        retry(&self.policy, &self.sleeper, |attempt| {
            debug!(server = %connector.addr(), attempt, "Dialing server");
            connector.connect()
        })
    }
}
