//! Runtime configuration for tails, delivery and the HTTP server.

use crate::error::{Error, Result};
use std::path::PathBuf;
use std::time::Duration;

/// Size of the read region used for each positioned read.
pub const DEFAULT_READ_BUFFER_SIZE: usize = 16 * 1024;
/// Floor of the polling backoff.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);
/// Ceiling of the polling backoff.
pub const DEFAULT_MAX_POLL_INTERVAL: Duration = Duration::from_secs(30);
/// Longest partial line carried between reads.
pub const DEFAULT_MAX_LINE_LEN: usize = 1024 * 1024;
/// Period of the delivery flush timer.
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(2);

/// Settings for a single tail.
#[derive(Debug, Clone)]
pub struct TailConfig {
    pub read_buffer_size: usize,
    pub poll_interval: Duration,
    pub max_poll_interval: Duration,
    pub max_line_len: usize,
    /// Capacity of the line channel between the tail and its consumer.
    pub channel_capacity: usize,
    /// Wake up early on filesystem change notifications.
    pub watch: bool,
}

impl Default for TailConfig {
    fn default() -> Self {
        Self {
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_poll_interval: DEFAULT_MAX_POLL_INTERVAL,
            max_line_len: DEFAULT_MAX_LINE_LEN,
            channel_capacity: 1,
            watch: false,
        }
    }
}

/// Settings for the coalescing writer.
#[derive(Debug, Clone)]
pub struct DeliveryConfig {
    pub flush_interval: Duration,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            flush_interval: DEFAULT_FLUSH_INTERVAL,
        }
    }
}

/// Where the HTTP server listens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListenAddr {
    Tcp(String),
    Unix(PathBuf),
}

impl ListenAddr {
    /// Parses `host:port`, `:port` (all interfaces) or `unix:/path/to/socket`.
    pub fn parse(addr: &str) -> Result<Self> {
        let addr = addr.trim();
        if let Some(path) = addr.strip_prefix("unix:") {
            if path.is_empty() {
                return Err(Error::InvalidConfig {
                    message: "empty unix socket path".to_string(),
                });
            }
            return Ok(Self::Unix(PathBuf::from(path)));
        }
        if addr.is_empty() {
            return Err(Error::InvalidConfig {
                message: "empty listen address".to_string(),
            });
        }
        if addr.starts_with(':') {
            return Ok(Self::Tcp(format!("0.0.0.0{addr}")));
        }
        Ok(Self::Tcp(addr.to_string()))
    }
}

impl std::fmt::Display for ListenAddr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Tcp(addr) => write!(f, "{addr}"),
            Self::Unix(path) => write!(f, "unix:{}", path.display()),
        }
    }
}

/// Everything the server needs to start.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub root: PathBuf,
    pub listen: ListenAddr,
    pub tail: TailConfig,
    pub delivery: DeliveryConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tail_config_defaults() {
        let config = TailConfig::default();
        assert_eq!(config.read_buffer_size, 16384);
        assert_eq!(config.poll_interval, Duration::from_secs(1));
        assert_eq!(config.channel_capacity, 1);
        assert!(!config.watch);
    }

    #[test]
    fn test_delivery_config_defaults() {
        assert_eq!(
            DeliveryConfig::default().flush_interval,
            Duration::from_secs(2)
        );
    }

    #[test]
    fn test_listen_addr_port_only() {
        assert_eq!(
            ListenAddr::parse(":8080").unwrap(),
            ListenAddr::Tcp("0.0.0.0:8080".to_string())
        );
    }

    #[test]
    fn test_listen_addr_host_port() {
        assert_eq!(
            ListenAddr::parse("127.0.0.1:9000").unwrap(),
            ListenAddr::Tcp("127.0.0.1:9000".to_string())
        );
    }

    #[test]
    fn test_listen_addr_unix() {
        let addr = ListenAddr::parse("unix:/run/webtail.sock").unwrap();
        assert_eq!(addr, ListenAddr::Unix(PathBuf::from("/run/webtail.sock")));
        assert_eq!(addr.to_string(), "unix:/run/webtail.sock");
    }

    #[test]
    fn test_listen_addr_rejects_empty() {
        assert!(matches!(ListenAddr::parse(""), Err(Error::InvalidConfig { .. })));
        assert!(matches!(ListenAddr::parse("unix:"), Err(Error::InvalidConfig { .. })));
    }
}
