//! Change notifications that cut a backoff wait short.

use crate::error::Result;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tracing::debug;

/// Watches the parent directory of a tailed file.
pub(crate) struct FileWatcher {
    watcher: RecommendedWatcher,
    receiver: mpsc::UnboundedReceiver<notify::Result<Event>>,
    file_path: PathBuf,
    file_name: String,
}

impl FileWatcher {
    pub(crate) fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file_path = path.as_ref().to_path_buf();
        let file_name = file_path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default();

        let (tx, rx) = mpsc::unbounded_channel();

        let watcher = RecommendedWatcher::new(
            move |res| {
                let _ = tx.send(res);
            },
            Config::default(),
        )?;

        Ok(Self {
            watcher,
            receiver: rx,
            file_path,
            file_name,
        })
    }

    pub(crate) fn start_watching(&mut self) -> Result<()> {
        let watch_path = self
            .file_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        self.watcher.watch(watch_path, RecursiveMode::NonRecursive)?;
        Ok(())
    }

    /// Resolves once an event touching the tailed file arrives.
    ///
    /// Never resolves after the notify backend shuts down; the caller's
    /// backoff timer takes over from there.
    pub(crate) async fn changed(&mut self) {
        loop {
            match self.receiver.recv().await {
                Some(Ok(event)) => {
                    if !matches!(event.kind, EventKind::Access(_))
                        && is_event_relevant_to_file(&event, &self.file_name)
                    {
                        return;
                    }
                }
                Some(Err(e)) => {
                    debug!(path = %self.file_path.display(), error = %e, "watch error");
                }
                None => std::future::pending::<()>().await,
            }
        }
    }

    #[cfg(test)]
    pub fn file_path(&self) -> &Path {
        &self.file_path
    }
}

/// Check if a notify event is relevant to a specific file
pub(crate) fn is_event_relevant_to_file(event: &Event, target_file_name: &str) -> bool {
    event.paths.iter().any(|path| {
        path.file_name()
            .map(|name| name.to_string_lossy() == target_file_name)
            .unwrap_or(false)
    })
}
