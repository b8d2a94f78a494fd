//! Error types for the tailing engine and its HTTP surface.

use thiserror::Error;

/// The main error type for webtail operations.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O errors when opening, reading or listing files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// File watching errors from the notify crate.
    #[error("File watcher error: {0}")]
    Watcher(#[from] notify::Error),

    /// Malformed path or root directory.
    #[error("Invalid file path: {message}")]
    InvalidPath { message: String },

    /// Rejected command-line or listener settings.
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// The requested file does not exist under the root.
    #[error("File not found: {path}")]
    FileNotFound { path: String },

    /// The requested path exists but cannot be tailed.
    #[error("{path:?} is not a regular file")]
    NotRegularFile { path: String },

    /// The requested path resolves outside of the served root.
    #[error("only files under {root:?} can be tailed ({path:?})")]
    OutsideRoot { path: String, root: String },

    /// The file shrank below the tail's read offset.
    #[error("File truncated: {path} is {len} bytes, read offset is {offset}")]
    Truncated { path: String, offset: u64, len: u64 },

    /// A single line grew past the configured limit without a newline.
    #[error("Line exceeds {limit} bytes")]
    LineTooLong { limit: usize },

    /// The consumer side of a stream has gone away.
    #[error("Stream closed")]
    StreamClosed,
}

/// A convenient Result type for webtail operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Error as IoError, ErrorKind};

    #[test]
    fn test_io_error_conversion() {
        let io_error = IoError::new(ErrorKind::NotFound, "File not found");
        let error: Error = io_error.into();

        match error {
            Error::Io(_) => {}
            _ => panic!("Expected Error::Io variant"),
        }

        assert!(error.to_string().contains("I/O error"));
        assert!(error.to_string().contains("File not found"));
    }

    #[test]
    fn test_watcher_error_conversion() {
        let notify_error = notify::Error::generic("Test watcher error");
        let error: Error = notify_error.into();

        assert!(matches!(error, Error::Watcher(_)));
        assert!(error.to_string().contains("Test watcher error"));
    }

    #[test]
    fn test_invalid_config_message() {
        let error = Error::InvalidConfig {
            message: "intervals must be positive".to_string(),
        };

        assert_eq!(
            error.to_string(),
            "Invalid configuration: intervals must be positive"
        );
    }

    #[test]
    fn test_outside_root_message() {
        let error = Error::OutsideRoot {
            path: "/etc/passwd".to_string(),
            root: "/logs".to_string(),
        };

        assert_eq!(
            error.to_string(),
            r#"only files under "/logs" can be tailed ("/etc/passwd")"#
        );
    }

    #[test]
    fn test_truncated_message() {
        let error = Error::Truncated {
            path: "app.log".to_string(),
            offset: 200,
            len: 10,
        };

        assert_eq!(
            error.to_string(),
            "File truncated: app.log is 10 bytes, read offset is 200"
        );
    }

    #[test]
    fn test_not_regular_file_message() {
        let error = Error::NotRegularFile {
            path: "sub".to_string(),
        };
        assert_eq!(error.to_string(), r#""sub" is not a regular file"#);
    }

    #[test]
    fn test_stream_closed_error() {
        let error = Error::StreamClosed;
        assert_eq!(error.to_string(), "Stream closed");
        assert_eq!(format!("{:?}", error), "StreamClosed");
    }

    #[test]
    fn test_error_send_sync_traits() {
        // Errors cross task boundaries through JoinHandle outputs.
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<Error>();
        assert_sync::<Error>();
    }
}
