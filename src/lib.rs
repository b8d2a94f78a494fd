//! Serve growing log files over HTTP as live server-sent event streams.
//!
//! A [`TailSource`] follows one file that another process appends to and
//! emits every complete line. [`Delivery`] turns those lines into SSE frames
//! and coalesces them into periodic flushes. The [`server`] module wires both
//! into an axum router with a sandboxed view of a root directory.
//!
//! # Example
//!
//! ```rust,no_run
//! use webtail::{TailConfig, tail_file};
//! use tokio_stream::StreamExt;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut lines = tail_file("app.log", TailConfig::default()).await?;
//!
//!     while let Some(line) = lines.next().await {
//!         println!("{}", line.to_string_lossy());
//!     }
//!
//!     Ok(())
//! }
//! ```

mod backoff;
mod config;
mod delivery;
mod error;
mod pages;
mod reader;
mod sandbox;
mod source;
mod stream;
mod watcher;

pub mod cli;
pub mod server;

#[cfg(test)]
mod test_helpers;

pub use backoff::Backoff;
pub use config::{DeliveryConfig, ListenAddr, ServerConfig, TailConfig};
pub use delivery::{ChannelSink, Delivery, DeliveryReport, FrameSink, Wrap};
pub use error::{Error, Result};
pub use reader::Line;
pub use sandbox::Sandbox;
pub use source::TailSource;
pub use stream::{EventStream, TailStream};

use std::path::Path;
use tokio_util::sync::CancellationToken;

/// Opens `path` and streams its lines from the first byte on, following
/// appends until the returned stream is dropped.
///
/// # Example
///
/// ```rust,no_run
/// use webtail::{TailConfig, tail_file};
/// use tokio_stream::StreamExt;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let mut lines = tail_file("app.log", TailConfig::default()).await?;
///     if let Some(line) = lines.next().await {
///         println!("first line: {:?}", line);
///     }
///     Ok(())
/// }
/// ```
pub async fn tail_file<P: AsRef<Path>>(path: P, config: TailConfig) -> Result<TailStream> {
    let source = TailSource::open(path, &config).await?;
    Ok(TailStream::spawn(
        source,
        config.channel_capacity,
        CancellationToken::new(),
    ))
}
