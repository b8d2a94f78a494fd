//! Stream delivery: formats lines as server-sent event frames and coalesces
//! them into periodic flushes.

use crate::error::{Error, Result};
use crate::reader::Line;
use futures::{FutureExt, Stream, StreamExt};
use std::future::Future;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Markup placed around every line.
///
/// With both sides empty lines are sent verbatim. Otherwise the line is
/// HTML-escaped so its content cannot close or alter the surrounding markup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Wrap {
    left: String,
    right: String,
}

impl Wrap {
    pub fn new(left: impl Into<String>, right: impl Into<String>) -> Self {
        Self {
            left: strip_line_breaks(left.into()),
            right: strip_line_breaks(right.into()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.left.is_empty() && self.right.is_empty()
    }

    /// Appends `data: <payload>\n\n` for `line` to `out`.
    ///
    /// A CR anywhere in the line would end the SSE field early, so none is
    /// ever copied: a trailing one is trimmed, others are dropped in raw mode
    /// and written as `&#13;` when wrapped.
    pub fn format_frame(&self, line: &Line, out: &mut String) {
        let text = line.to_string_lossy();
        let text = text.strip_suffix('\r').unwrap_or(&text);

        out.push_str("data: ");
        if self.is_empty() {
            out.extend(text.split('\r'));
        } else {
            out.push_str(&self.left);
            out.push_str(&html_escape::encode_safe(text).replace('\r', "&#13;"));
            out.push_str(&self.right);
        }
        out.push_str("\n\n");
    }
}

// A raw CR or LF inside a wrap would end the SSE frame early.
fn strip_line_breaks(mut s: String) -> String {
    s.retain(|c| c != '\r' && c != '\n');
    s
}

/// Destination of flushed frames, typically an HTTP response body.
pub trait FrameSink {
    /// Writes one coalesced chunk. An error means the client is gone.
    fn write_chunk(&mut self, chunk: String) -> impl Future<Output = Result<()>> + Send;
}

/// Sink feeding a response body through a channel.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<String>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::Sender<String>) -> Self {
        Self { tx }
    }
}

impl FrameSink for ChannelSink {
    async fn write_chunk(&mut self, chunk: String) -> Result<()> {
        self.tx.send(chunk).await.map_err(|_| Error::StreamClosed)
    }
}

/// What a finished delivery did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub lines: u64,
    pub flushes: u64,
}

/// Per-request delivery state: the wrap, the flush period and the frames
/// written since the last flush.
#[derive(Debug)]
pub struct Delivery {
    wrap: Wrap,
    flush_interval: Duration,
    pending: String,
    report: DeliveryReport,
}

impl Delivery {
    pub fn new(wrap: Wrap, flush_interval: Duration) -> Self {
        Self {
            wrap,
            flush_interval,
            pending: String::new(),
            report: DeliveryReport::default(),
        }
    }

    /// Forwards `lines` to `sink` until the source ends or `cancel` fires.
    ///
    /// Frames are buffered as they arrive and written when the flush timer
    /// ticks with something pending. When the source ends whatever is
    /// buffered is flushed before returning. Cancellation interrupts a write
    /// in progress and makes one last flush only if the sink accepts it
    /// without waiting. A failed write stops delivery with
    /// [`Error::StreamClosed`].
    pub async fn run<L, S>(
        mut self,
        mut lines: L,
        sink: &mut S,
        cancel: &CancellationToken,
    ) -> Result<DeliveryReport>
    where
        L: Stream<Item = Line> + Unpin,
        S: FrameSink,
    {
        let period = self.flush_interval.max(Duration::from_millis(1));
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    self.flush_now(sink);
                    debug!(lines = self.report.lines, flushes = self.report.flushes, "delivery cancelled");
                    return Ok(self.report);
                }
                line = lines.next() => match line {
                    Some(line) => {
                        self.wrap.format_frame(&line, &mut self.pending);
                        self.report.lines += 1;
                    }
                    None => {
                        self.flush(sink, cancel).await?;
                        debug!(lines = self.report.lines, flushes = self.report.flushes, "line source ended");
                        return Ok(self.report);
                    }
                },
                _ = ticker.tick() => {
                    self.flush(sink, cancel).await?;
                }
            }
        }
    }

    /// Writes the pending frames, giving up on them if `cancel` fires
    /// before the sink takes the chunk.
    async fn flush<S: FrameSink>(
        &mut self,
        sink: &mut S,
        cancel: &CancellationToken,
    ) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let chunk = std::mem::take(&mut self.pending);
        debug!(bytes = chunk.len(), "flush");
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("flush abandoned on cancel");
                return Ok(());
            }
            written = sink.write_chunk(chunk) => written?,
        }
        self.report.flushes += 1;
        Ok(())
    }

    // Best effort: the client may be gone or not reading.
    fn flush_now<S: FrameSink>(&mut self, sink: &mut S) {
        if self.pending.is_empty() {
            return;
        }
        let chunk = std::mem::take(&mut self.pending);
        match sink.write_chunk(chunk).now_or_never() {
            Some(Ok(())) => self.report.flushes += 1,
            Some(Err(e)) => debug!(error = %e, "final flush failed"),
            None => debug!("final flush dropped, sink not ready"),
        }
    }
}
