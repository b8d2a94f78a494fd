//! Command line interface.

use crate::config::{DeliveryConfig, ListenAddr, ServerConfig, TailConfig};
use crate::error::{Error, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "webtail")]
#[command(about = "Serve growing log files as live server-sent event streams")]
#[command(version)]
pub struct Cli {
    /// Directory whose files may be tailed
    #[arg(default_value = ".")]
    pub root: PathBuf,

    /// Listening address: host:port, :port or unix:/path/to/socket
    #[arg(long, default_value = ":8080", env = "WEBTAIL_LISTEN")]
    pub listen: String,

    /// Longest time a delivered line may wait in the write buffer
    #[arg(long, default_value_t = 2000)]
    pub flush_interval_ms: u64,

    /// Initial wait between reads of an idle file
    #[arg(long, default_value_t = 1000)]
    pub poll_interval_ms: u64,

    /// Upper bound of the idle wait
    #[arg(long, default_value_t = 30_000)]
    pub max_poll_interval_ms: u64,

    /// Wake idle tails on filesystem change notifications
    #[arg(long)]
    pub watch: bool,
}

impl Cli {
    /// Validates the arguments into a server configuration.
    pub fn into_config(self) -> Result<ServerConfig> {
        let root = std::path::absolute(&self.root).map_err(|e| Error::InvalidPath {
            message: format!("root {}: {}", self.root.display(), e),
        })?;
        if !root.is_dir() {
            return Err(Error::InvalidPath {
                message: format!("root {} is not a directory", root.display()),
            });
        }
        if self.flush_interval_ms == 0 || self.poll_interval_ms == 0 {
            return Err(Error::InvalidConfig {
                message: "intervals must be positive".to_string(),
            });
        }

        Ok(ServerConfig {
            root,
            listen: ListenAddr::parse(&self.listen)?,
            tail: TailConfig {
                poll_interval: Duration::from_millis(self.poll_interval_ms),
                max_poll_interval: Duration::from_millis(self.max_poll_interval_ms),
                watch: self.watch,
                ..TailConfig::default()
            },
            delivery: DeliveryConfig {
                flush_interval: Duration::from_millis(self.flush_interval_ms),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cli = Cli::try_parse_from(["webtail", dir.path().to_str().unwrap()]).unwrap();
        let config = cli.into_config().unwrap();

        assert_eq!(config.root, dir.path());
        assert_eq!(config.listen, ListenAddr::Tcp("0.0.0.0:8080".to_string()));
        assert_eq!(config.delivery.flush_interval, Duration::from_secs(2));
        assert_eq!(config.tail.poll_interval, Duration::from_secs(1));
        assert!(!config.tail.watch);
    }

    #[test]
    fn test_flags() {
        let dir = tempfile::tempdir().unwrap();
        let cli = Cli::try_parse_from([
            "webtail",
            "--listen",
            "127.0.0.1:3000",
            "--flush-interval-ms",
            "250",
            "--poll-interval-ms",
            "100",
            "--watch",
            dir.path().to_str().unwrap(),
        ])
        .unwrap();
        let config = cli.into_config().unwrap();

        assert_eq!(config.listen, ListenAddr::Tcp("127.0.0.1:3000".to_string()));
        assert_eq!(config.delivery.flush_interval, Duration::from_millis(250));
        assert_eq!(config.tail.poll_interval, Duration::from_millis(100));
        assert!(config.tail.watch);
    }

    #[test]
    fn test_missing_root_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing");
        let cli = Cli::try_parse_from(["webtail", missing.to_str().unwrap()]).unwrap();
        assert!(matches!(cli.into_config(), Err(Error::InvalidPath { .. })));
    }

    #[test]
    fn test_zero_flush_interval_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let cli = Cli::try_parse_from([
            "webtail",
            "--flush-interval-ms",
            "0",
            dir.path().to_str().unwrap(),
        ])
        .unwrap();
        assert!(matches!(cli.into_config(), Err(Error::InvalidConfig { .. })));
    }
}
