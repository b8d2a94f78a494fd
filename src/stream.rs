//! Stream adapters tying a tail, its delivery and their shared cancellation
//! token to the lifetime of the value that consumes them.

use crate::delivery::{ChannelSink, Delivery};
use crate::reader::Line;
use crate::source::TailSource;
use futures::Stream;
use std::convert::Infallible;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::debug;

/// Lines of a running [`TailSource`].
///
/// Dropping the stream cancels the tail.
pub struct TailStream {
    receiver: mpsc::Receiver<Line>,
    _cancel_guard: DropGuard,
    _task_handle: JoinHandle<()>,
}

impl TailStream {
    /// Runs `source` on its own task, cancelled by `cancel` or by dropping
    /// the returned stream.
    pub fn spawn(source: TailSource, capacity: usize, cancel: CancellationToken) -> Self {
        let (tx, rx) = mpsc::channel(capacity.max(1));

        let task_cancel = cancel.clone();
        let task_handle = tokio::spawn(async move {
            // Errors are logged by the source; the consumer just sees the end.
            let _ = source.run(tx, task_cancel).await;
        });

        Self {
            receiver: rx,
            _cancel_guard: cancel.drop_guard(),
            _task_handle: task_handle,
        }
    }

    #[cfg(test)]
    pub fn is_closed(&self) -> bool {
        self.receiver.is_closed()
    }
}

impl Stream for TailStream {
    type Item = Line;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx)
    }
}

/// Coalesced SSE chunks for one HTTP response body.
///
/// Owns the request's cancellation guard: when hyper drops the body after a
/// client disconnect, the delivery and the tail feeding it both stop.
pub struct EventStream {
    receiver: mpsc::Receiver<String>,
    _cancel_guard: DropGuard,
}

impl EventStream {
    /// Starts delivering `lines` through `delivery` on a background task.
    pub fn spawn<L>(lines: L, delivery: Delivery, cancel: CancellationToken) -> Self
    where
        L: Stream<Item = Line> + Unpin + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(1);

        let task_cancel = cancel.clone();
        tokio::spawn(async move {
            let mut sink = ChannelSink::new(tx);
            match delivery.run(lines, &mut sink, &task_cancel).await {
                Ok(report) => debug!(
                    lines = report.lines,
                    flushes = report.flushes,
                    "delivery finished"
                ),
                Err(e) => debug!(error = %e, "delivery stopped"),
            }
            // Stops whatever still feeds `lines`.
            task_cancel.cancel();
        });

        Self {
            receiver: rx,
            _cancel_guard: cancel.drop_guard(),
        }
    }
}

impl Stream for EventStream {
    type Item = Result<String, Infallible>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx).map(|chunk| chunk.map(Ok))
    }
}
