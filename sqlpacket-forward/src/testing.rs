//! Test doubles for connections, capture sources and sleeping

use parking_lot::Mutex;
use sqlpacket_capture::{CaptureEvent, PacketSource};
use sqlpacket_core::{Error, Packet, Result};
use std::collections::VecDeque;
use std::io::{self, Write};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use crate::connector::Connector;
use crate::frame::decode_frame;
use crate::retry::Sleeper;

/// Sleeper that records requested durations and returns immediately
#[derive(Debug, Default, Clone)]
pub struct RecordingSleeper {
    slept: Arc<Mutex<Vec<Duration>>>,
}

impl RecordingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn slept(&self) -> Vec<Duration> {
        self.slept.lock().clone()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) {
        self.slept.lock().push(duration);
    }
}

/// Everything a mock server saw
#[derive(Debug, Default)]
pub struct Wire {
    /// Start of every dial attempt
    pub dials: Vec<Instant>,
    /// Bytes accepted, across all connections
    pub stream: Vec<u8>,
    /// Write calls made, failed ones included
    pub writes: usize,
}

impl Wire {
    /// Payloads of the complete frames in the stream
    pub fn payloads(&self) -> Vec<Vec<u8>> {
        let mut offset = 0;
        let mut payloads = Vec::new();
        while let Ok(Some((frame, used))) = decode_frame(&self.stream[offset..]) {
            payloads.push(frame.payload.to_vec());
            offset += used;
        }
        payloads
    }
}

/// Connector whose dials and writes fail on demand
#[derive(Debug, Clone, Default)]
pub struct MockConnector {
    pub wire: Arc<Mutex<Wire>>,
    /// Dial attempts (1-based) that fail
    pub failing_dials: Vec<usize>,
    /// Fail every dial
    pub refuse_all: bool,
    /// Write calls (1-based) that fail
    pub failing_writes: Vec<usize>,
    /// Accept at most this many bytes per write call
    pub max_chunk: Option<usize>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn refusing() -> Self {
        Self {
            refuse_all: true,
            ..Self::default()
        }
    }

    pub fn failing_writes(writes: &[usize]) -> Self {
        Self {
            failing_writes: writes.to_vec(),
            ..Self::default()
        }
    }

    pub fn wire(&self) -> Arc<Mutex<Wire>> {
        self.wire.clone()
    }
}

impl Connector for MockConnector {
    type Conn = MockConn;

    fn addr(&self) -> &str {
        "mock:9000"
    }

    fn connect(&mut self) -> Result<MockConn> {
        let mut wire = self.wire.lock();
        wire.dials.push(Instant::now());
        let attempt = wire.dials.len();

        if self.refuse_all || self.failing_dials.contains(&attempt) {
            return Err(Error::dial(self.addr(), "connection refused"));
        }

        Ok(MockConn {
            wire: self.wire.clone(),
            failing_writes: self.failing_writes.clone(),
            max_chunk: self.max_chunk,
        })
    }
}

#[derive(Debug)]
pub struct MockConn {
    wire: Arc<Mutex<Wire>>,
    failing_writes: Vec<usize>,
    max_chunk: Option<usize>,
}

impl Write for MockConn {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut wire = self.wire.lock();
        wire.writes += 1;
        if self.failing_writes.contains(&wire.writes) {
            return Err(io::Error::from(io::ErrorKind::BrokenPipe));
        }

        let n = self.max_chunk.map_or(buf.len(), |max| buf.len().min(max));
        wire.stream.extend_from_slice(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Capture source replaying a fixed script, then reporting `Closed`
#[derive(Debug)]
pub struct ScriptedSource {
    interface: String,
    events: VecDeque<Result<CaptureEvent>>,
}

impl ScriptedSource {
    pub fn new(interface: &str) -> Self {
        Self {
            interface: interface.to_string(),
            events: VecDeque::new(),
        }
    }

    /// Source producing one packet per payload, in order
    pub fn with_payloads(interface: &str, payloads: &[Vec<u8>]) -> Self {
        let mut source = Self::new(interface);
        for payload in payloads {
            source = source.packet(payload);
        }
        source
    }

    pub fn packet(mut self, payload: &[u8]) -> Self {
        let timestamp = UNIX_EPOCH + Duration::from_secs(1_700_000_000 + self.events.len() as u64);
        self.events.push_back(Ok(CaptureEvent::Packet(Packet::with_timestamp(
            self.interface.clone(),
            payload.to_vec(),
            timestamp,
        ))));
        self
    }

    pub fn timeout(mut self) -> Self {
        self.events.push_back(Ok(CaptureEvent::Timeout));
        self
    }

    pub fn error(mut self, msg: &str) -> Self {
        self.events.push_back(Err(Error::Capture(msg.to_string())));
        self
    }
}

impl PacketSource for ScriptedSource {
    fn interface(&self) -> &str {
        &self.interface
    }

    fn next_event(&mut self) -> Result<CaptureEvent> {
        self.events.pop_front().unwrap_or(Ok(CaptureEvent::Closed))
    }
}

/// Payloads `[i; len]` for i in 0..count
pub fn numbered_payloads(count: u8, len: usize) -> Vec<Vec<u8>> {
    (0..count).map(|i| vec![i; len]).collect()
}

/// A fixed capture time for tests that build packets directly
pub fn capture_time() -> SystemTime {
    UNIX_EPOCH + Duration::from_secs(1_700_000_000)
}
