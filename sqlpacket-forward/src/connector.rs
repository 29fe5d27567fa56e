//! Outbound connections to the analysis server

use sqlpacket_core::{AgentConfig, Error, Result};
use std::io::Write;
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;
use tracing::debug;

use crate::frame::Handshake;

/// Something that can open a fresh, ready-to-write connection
///
/// A successful `connect` means the connection is usable: dialed and, where
/// configured, past the handshake.
pub trait Connector: Send {
    /// Connection type frames are written to
    type Conn: Write + Send;

    /// Address this connector dials, for logging
    fn addr(&self) -> &str;

    /// Make one connection attempt
    fn connect(&mut self) -> Result<Self::Conn>;
}

/// TCP connector with a connect timeout and an optional handshake
#[derive(Debug, Clone)]
pub struct TcpConnector {
    addr: String,
    timeout: Duration,
    handshake: Option<Handshake>,
}

impl TcpConnector {
    /// Create a connector without a handshake
    pub fn new<A: Into<String>>(addr: A, timeout: Duration) -> Self {
        Self {
            addr: addr.into(),
            timeout,
            handshake: None,
        }
    }

    /// Send `handshake` on every new connection
    pub fn with_handshake(mut self, handshake: Handshake) -> Self {
        self.handshake = Some(handshake);
        self
    }

    /// Connector for the configured server
    pub fn from_config(config: &AgentConfig) -> Self {
        let connector = Self::new(config.server_address.clone(), config.conn_timeout);
        if config.handshake {
            connector.with_handshake(Handshake::new(
                config.protocol_class,
                config.protocol_type,
            ))
        } else {
            connector
        }
    }

    /// Handshake sent on connect, if any
    pub fn handshake(&self) -> Option<Handshake> {
        self.handshake
    }

    fn dial(&self) -> Result<TcpStream> {
        let addrs = self
            .addr
            .to_socket_addrs()
            .map_err(|e| Error::dial(self.addr.as_str(), format!("cannot resolve: {}", e)))?;

        let mut last_error = None;
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, self.timeout) {
                Ok(stream) => return Ok(stream),
                Err(e) => {
                    debug!(server = %self.addr, resolved = %addr, error = %e, "Dial failed");
                    last_error = Some(e);
                }
            }
        }

        Err(match last_error {
            Some(e) => Error::dial(self.addr.as_str(), e),
            None => Error::dial(self.addr.as_str(), "address resolved to nothing"),
        })
    }
}

impl Connector for TcpConnector {
    type Conn = TcpStream;

    fn addr(&self) -> &str {
        &self.addr
    }

    fn connect(&mut self) -> Result<TcpStream> {
        let mut stream = self.dial()?;

        if let Err(e) = stream.set_nodelay(true) {
            debug!(server = %self.addr, error = %e, "Could not disable Nagle");
        }

        if let Some(handshake) = self.handshake {
            stream.write_all(&handshake.to_bytes()).map_err(|e| {
                Error::dial(self.addr.as_str(), format!("handshake write failed: {}", e))
            })?;
        }

        debug!(server = %self.addr, handshake = self.handshake.is_some(), "Connected");
        Ok(stream)
    }
}
