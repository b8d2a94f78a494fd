//! The tail source: turns a file that another process appends to into an
//! ordered, gap-free sequence of complete lines.
//!
//! Each source owns its file handle exclusively and runs as a single task.
//! It talks to its consumer over a bounded channel, so a slow consumer slows
//! the reader down instead of growing a buffer.

use crate::backoff::Backoff;
use crate::config::TailConfig;
use crate::error::{Error, Result};
use crate::reader::{Line, LineAssembler, detect_file_truncation, read_at};
use crate::watcher::FileWatcher;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs::File;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// State of one tail: the open handle, how far it has been consumed and the
/// unterminated fragment carried between reads.
pub struct TailSource {
    path: PathBuf,
    file: File,
    read_offset: u64,
    assembler: LineAssembler,
    backoff: Backoff,
    buf: Vec<u8>,
    max_line_len: usize,
    watcher: Option<FileWatcher>,
}

impl TailSource {
    /// Opens `path` for reading and prepares a tail from its first byte.
    pub async fn open<P: AsRef<Path>>(path: P, config: &TailConfig) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).await?;
        Ok(Self::new(file, path, config))
    }

    /// Wraps an already open handle.
    pub fn new<P: Into<PathBuf>>(file: File, path: P, config: &TailConfig) -> Self {
        let path = path.into();
        let watcher = if config.watch {
            start_watcher(&path)
        } else {
            None
        };

        Self {
            path,
            file,
            read_offset: 0,
            assembler: LineAssembler::default(),
            backoff: Backoff::new(config.poll_interval, config.max_poll_interval),
            buf: vec![0u8; config.read_buffer_size.max(1)],
            max_line_len: config.max_line_len,
            watcher,
        }
    }

    /// Replaces the backoff, e.g. with one driven by a seeded RNG.
    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn read_offset(&self) -> u64 {
        self.read_offset
    }

    /// Reads until `cancel` fires, the consumer goes away or a read fails.
    ///
    /// Cancellation and a dropped receiver both end the tail with `Ok(())`.
    /// Any other failure is returned after the file and `tx` are released;
    /// the consumer only observes the channel closing.
    pub async fn run(mut self, tx: mpsc::Sender<Line>, cancel: CancellationToken) -> Result<()> {
        info!(path = %self.path.display(), "tail started");

        let result = self.read_loop(&tx, &cancel).await;
        match &result {
            Ok(()) => info!(
                path = %self.path.display(),
                offset = self.read_offset,
                "tail finished"
            ),
            Err(e) => warn!(
                path = %self.path.display(),
                offset = self.read_offset,
                error = %e,
                "tail stopped"
            ),
        }
        result
    }

    async fn read_loop(&mut self, tx: &mpsc::Sender<Line>, cancel: &CancellationToken) -> Result<()> {
        loop {
            if cancel.is_cancelled() {
                return Ok(());
            }

            let n = read_at(&mut self.file, self.read_offset, &mut self.buf).await?;
            debug!(path = %self.path.display(), offset = self.read_offset, n, "read");

            if n == 0 {
                self.check_truncation().await?;
                let delay = self.backoff.next_delay();
                if !self.wait(delay, cancel).await {
                    return Ok(());
                }
                continue;
            }

            self.backoff.reset();
            self.read_offset += n as u64;
            let lines = self.assembler.feed(&self.buf[..n]);

            for line in lines {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Ok(()),
                    sent = tx.send(line) => {
                        if sent.is_err() {
                            debug!(path = %self.path.display(), "line consumer dropped");
                            return Ok(());
                        }
                    }
                }
            }

            if self.assembler.pending().len() > self.max_line_len {
                return Err(Error::LineTooLong {
                    limit: self.max_line_len,
                });
            }
        }
    }

    async fn check_truncation(&mut self) -> Result<()> {
        let len = self.file.metadata().await?.len();
        if detect_file_truncation(len, self.read_offset) {
            return Err(Error::Truncated {
                path: self.path.display().to_string(),
                offset: self.read_offset,
                len,
            });
        }
        Ok(())
    }

    /// Sleeps for `delay`, returning early on a change notification.
    /// Returns `false` if cancelled.
    async fn wait(&mut self, delay: Duration, cancel: &CancellationToken) -> bool {
        let sleep = tokio::time::sleep(delay);
        match self.watcher.as_mut() {
            Some(watcher) => tokio::select! {
                biased;
                _ = cancel.cancelled() => false,
                _ = sleep => true,
                _ = watcher.changed() => true,
            },
            None => tokio::select! {
                biased;
                _ = cancel.cancelled() => false,
                _ = sleep => true,
            },
        }
    }
}

fn start_watcher(path: &Path) -> Option<FileWatcher> {
    let watcher = FileWatcher::new(path).and_then(|mut w| {
        w.start_watching()?;
        Ok(w)
    });
    match watcher {
        Ok(w) => Some(w),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "change notification unavailable, polling only");
            None
        }
    }
}
