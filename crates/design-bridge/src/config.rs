//! Bridge configuration

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Where the design application listens
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// TCP `host:port`
    Tcp(String),
    /// Unix domain socket path
    Unix(PathBuf),
}

impl FromStr for Endpoint {
    type Err = String;

    /// Accepts `tcp://host:port`, `unix:///path/to.sock`, or a bare `host:port`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(path) = s.strip_prefix("unix://") {
            if path.is_empty() {
                return Err("unix endpoint needs a socket path".into());
            }
            return Ok(Endpoint::Unix(PathBuf::from(path)));
        }

        let addr = s.strip_prefix("tcp://").unwrap_or(s);
        match addr.rsplit_once(':') {
            Some((host, port)) if !host.is_empty() && port.parse::<u16>().is_ok() => {
                Ok(Endpoint::Tcp(addr.to_string()))
            }
            _ => Err(format!("invalid endpoint '{}', expected host:port", s)),
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Tcp(addr) => write!(f, "tcp://{}", addr),
            Endpoint::Unix(path) => write!(f, "unix://{}", path.display()),
        }
    }
}

/// Configuration for the command bridge
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Application endpoint (default: tcp://127.0.0.1:4403)
    pub endpoint: Endpoint,
    /// Connection timeout
    pub connect_timeout: Duration,
    /// Deadline for each command unless overridden per call
    pub command_timeout: Duration,
    /// Capacity of the pushed-event broadcast channel
    pub event_capacity: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            endpoint: Endpoint::Tcp("127.0.0.1:4403".into()),
            connect_timeout: Duration::from_secs(10),
            command_timeout: Duration::from_secs(5),
            event_capacity: 64,
        }
    }
}
