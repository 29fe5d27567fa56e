//! Agent configuration
//!
//! The configuration file is YAML. It is parsed into [`ConfigFile`], which
//! mirrors the file layout, and validated into [`AgentConfig`], the
//! read-only record every component receives. Nothing here is global: the
//! record is built once in `main` and handed down explicitly.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::{Error, Result};

/// Default configuration file path
pub const DEFAULT_CONFIG_PATH: &str = "etc/config.yaml";

/// Default TCP connect timeout (seconds)
pub const DEFAULT_CONN_TIMEOUT_SECS: u64 = 2;

/// Default delay between reconnect attempts (seconds)
pub const DEFAULT_RETRY_DELAY_SECS: u64 = 5;

/// Default number of reconnect attempts before giving up
pub const DEFAULT_RETRY_COUNT: u32 = 5;

/// Default snapshot length (maximum bytes per packet)
pub const DEFAULT_SNAPLEN: i32 = 65535;

/// Default time workers get to close cleanly after a termination signal (seconds)
pub const DEFAULT_SHUTDOWN_GRACE_SECS: u64 = 5;

/// On-disk layout of the configuration file
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    /// Analysis server address (`host:port`)
    pub server: Option<String>,
    /// Comma-separated capture interfaces
    pub inf: Option<String>,
    /// TCP port to capture
    pub port: Option<u16>,
    /// Protocol class sent in the handshake
    #[serde(rename = "class")]
    pub protocol_class: Option<u16>,
    /// Protocol type sent in the handshake
    #[serde(rename = "type")]
    pub protocol_type: Option<u16>,
    /// Send the class/type handshake on every new connection
    #[serde(default = "default_handshake")]
    pub handshake: bool,
    #[serde(default)]
    pub conn_timeout_secs: Option<u64>,
    #[serde(default)]
    pub retry_delay_secs: Option<u64>,
    #[serde(default)]
    pub retry_count: Option<u32>,
    #[serde(default)]
    pub snaplen: Option<i32>,
    #[serde(default)]
    pub shutdown_grace_secs: Option<u64>,
}

fn default_handshake() -> bool {
    true
}

/// Resolved, validated agent configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentConfig {
    /// Analysis server address (`host:port`)
    pub server_address: String,
    /// Capture interfaces, in configuration order
    pub interfaces: Vec<String>,
    /// Protocol class sent in the handshake
    pub protocol_class: u16,
    /// Protocol type sent in the handshake
    pub protocol_type: u16,
    /// TCP port to capture (source or destination)
    pub target_port: u16,
    /// Send the class/type handshake on every new connection
    pub handshake: bool,
    /// TCP connect timeout
    pub conn_timeout: Duration,
    /// Delay between failed reconnect attempts
    pub retry_delay: Duration,
    /// Reconnect attempts before the session gives up
    pub retry_count: u32,
    /// Snapshot length handed to the capture subsystem
    pub snaplen: i32,
    /// How long workers get to finish after a termination signal
    pub shutdown_grace: Duration,
}

impl AgentConfig {
    /// Load and validate a configuration file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            return Err(Error::config("a configuration file path is required"));
        }

        let data = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("cannot read {}: {}", path.display(), e))
        })?;

        Self::from_yaml_str(&data)
    }

    /// Parse and validate YAML configuration text
    pub fn from_yaml_str(data: &str) -> Result<Self> {
        let file: ConfigFile = serde_yaml::from_str(data)
            .map_err(|e| Error::config(format!("invalid YAML: {}", e)))?;
        Self::try_from(file)
    }
}

impl TryFrom<ConfigFile> for AgentConfig {
    type Error = Error;

    fn try_from(file: ConfigFile) -> Result<Self> {
        let server_address = file
            .server
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| Error::config("missing required field 'server'"))?;
        validate_server_address(&server_address)?;

        let interfaces = parse_interfaces(file.inf.as_deref().unwrap_or_default());
        if interfaces.is_empty() {
            return Err(Error::config("missing required field 'inf'"));
        }

        let target_port = match file.port {
            None => return Err(Error::config("missing required field 'port'")),
            Some(0) => return Err(Error::config("'port' must be non-zero")),
            Some(port) => port,
        };

        let (protocol_class, protocol_type) = if file.handshake {
            let class = file
                .protocol_class
                .ok_or_else(|| Error::config("'class' is required when handshake is enabled"))?;
            let kind = file
                .protocol_type
                .ok_or_else(|| Error::config("'type' is required when handshake is enabled"))?;
            (class, kind)
        } else {
            (
                file.protocol_class.unwrap_or_default(),
                file.protocol_type.unwrap_or_default(),
            )
        };

        let retry_count = file.retry_count.unwrap_or(DEFAULT_RETRY_COUNT);
        if retry_count == 0 {
            return Err(Error::config("'retry_count' must be at least 1"));
        }

        let snaplen = file.snaplen.unwrap_or(DEFAULT_SNAPLEN);
        if snaplen <= 0 {
            return Err(Error::config("'snaplen' must be positive"));
        }

        let conn_timeout_secs = file.conn_timeout_secs.unwrap_or(DEFAULT_CONN_TIMEOUT_SECS);
        if conn_timeout_secs == 0 {
            return Err(Error::config("'conn_timeout_secs' must be positive"));
        }

        Ok(Self {
            server_address,
            interfaces,
            protocol_class,
            protocol_type,
            target_port,
            handshake: file.handshake,
            conn_timeout: Duration::from_secs(conn_timeout_secs),
            retry_delay: Duration::from_secs(
                file.retry_delay_secs.unwrap_or(DEFAULT_RETRY_DELAY_SECS),
            ),
            retry_count,
            snaplen,
            shutdown_grace: Duration::from_secs(
                file.shutdown_grace_secs
                    .unwrap_or(DEFAULT_SHUTDOWN_GRACE_SECS),
            ),
        })
    }
}

/// Split a comma-separated interface list, dropping blanks and duplicates
pub fn parse_interfaces(list: &str) -> Vec<String> {
    let mut interfaces: Vec<String> = Vec::new();
    for name in list.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        if !interfaces.iter().any(|existing| existing == name) {
            interfaces.push(name.to_string());
        }
    }
    interfaces
}

fn validate_server_address(addr: &str) -> Result<()> {
    let (host, port) = addr
        .rsplit_once(':')
        .ok_or_else(|| Error::config(format!("server '{}' is not host:port", addr)))?;

    if host.is_empty() || host == "[]" {
        return Err(Error::config(format!("server '{}' has no host", addr)));
    }

    match port.parse::<u16>() {
        Ok(0) | Err(_) => Err(Error::config(format!(
            "server '{}' has an invalid port",
            addr
        ))),
        Ok(_) => Ok(()),
    }
}
