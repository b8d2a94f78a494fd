//! HTTP surface: directory listing, the file viewer page and the SSE tail
//! endpoint, served from an explicit router.

use crate::config::{DeliveryConfig, ListenAddr, ServerConfig, TailConfig};
use crate::delivery::{Delivery, Wrap};
use crate::error::{Error, Result};
use crate::pages::{self, Entry, EntryKind};
use crate::sandbox::Sandbox;
use crate::source::TailSource;
use crate::stream::{EventStream, TailStream};
use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::{StatusCode, header};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Shared, read-only state of the server.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<Inner>,
}

struct Inner {
    sandbox: Sandbox,
    tail: TailConfig,
    delivery: DeliveryConfig,
    shutdown: CancellationToken,
}

impl AppState {
    /// Every tail started through this state stops when `shutdown` fires.
    pub fn new(config: &ServerConfig, shutdown: CancellationToken) -> Result<Self> {
        Ok(Self {
            inner: Arc::new(Inner {
                sandbox: Sandbox::new(&config.root)?,
                tail: config.tail.clone(),
                delivery: config.delivery.clone(),
                shutdown,
            }),
        })
    }

    pub fn sandbox(&self) -> &Sandbox {
        &self.inner.sandbox
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = match &self {
            Error::FileNotFound { .. } => StatusCode::NOT_FOUND,
            Error::NotRegularFile { .. } | Error::OutsideRoot { .. } | Error::InvalidPath { .. } => {
                StatusCode::BAD_REQUEST
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, self.to_string()).into_response()
    }
}

/// Builds the router for `state`.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(list_handler))
        .route("/dir", get(list_handler))
        .route("/file", get(file_handler))
        .route("/tail", get(tail_handler))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct PathQuery {
    #[serde(default)]
    path: String,
}

#[derive(Debug, Deserialize)]
struct TailQuery {
    #[serde(default)]
    file: String,
    #[serde(default)]
    left: String,
    #[serde(default)]
    right: String,
}

async fn list_handler(
    State(state): State<AppState>,
    Query(query): Query<PathQuery>,
) -> Result<Html<String>> {
    let sandbox = state.sandbox();
    let dir = match sandbox.resolve(&query.path) {
        Ok(resolved) if resolved.is_dir() => resolved,
        Ok(resolved) => resolved
            .parent()
            .filter(|parent| parent.starts_with(sandbox.root()))
            .map(Path::to_path_buf)
            .unwrap_or_else(|| sandbox.root().to_path_buf()),
        Err(e) => {
            warn!(path = %query.path, error = %e, "listing falls back to root");
            sandbox.root().to_path_buf()
        }
    };

    let entries = read_entries(&dir).await?;
    let relative = sandbox.relative(&dir);
    info!(path = %relative, entries = entries.len(), "list");
    Ok(Html(pages::render_listing(&relative, &entries)))
}

async fn read_entries(dir: &Path) -> Result<Vec<Entry>> {
    let mut read_dir = tokio::fs::read_dir(dir).await?;
    let mut entries = Vec::new();

    while let Some(entry) = read_dir.next_entry().await? {
        let file_type = match entry.file_type().await {
            Ok(file_type) => file_type,
            Err(_) => continue,
        };
        let kind = if file_type.is_dir() {
            EntryKind::Dir
        } else if file_type.is_file() {
            EntryKind::File
        } else {
            continue;
        };
        entries.push(Entry {
            name: entry.file_name().to_string_lossy().into_owned(),
            kind,
        });
    }

    entries.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(entries)
}

async fn file_handler(
    State(state): State<AppState>,
    Query(query): Query<PathQuery>,
) -> Result<Html<String>> {
    let sandbox = state.sandbox();
    let resolved = sandbox.resolve_file(&query.path).inspect_err(|e| {
        warn!(file = %query.path, error = %e, "file page rejected");
    })?;
    Ok(Html(pages::render_file_page(&sandbox.relative(&resolved))))
}

async fn tail_handler(
    State(state): State<AppState>,
    Query(query): Query<TailQuery>,
) -> Result<Response> {
    let inner = &state.inner;
    let resolved = inner.sandbox.resolve_file(&query.file).inspect_err(|e| {
        warn!(file = %query.file, error = %e, "tail rejected");
    })?;
    info!(file = %resolved.display(), "tail");

    let source = TailSource::open(&resolved, &inner.tail).await?;
    let cancel = inner.shutdown.child_token();
    let lines = TailStream::spawn(source, inner.tail.channel_capacity, cancel.clone());
    let delivery = Delivery::new(
        Wrap::new(query.left, query.right),
        inner.delivery.flush_interval,
    );
    let events = EventStream::spawn(lines, delivery, cancel);

    Ok((
        [
            (header::CONTENT_TYPE, "text/event-stream"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        Body::from_stream(events),
    )
        .into_response())
}

/// Serves `config` until `shutdown` is cancelled.
pub async fn run(config: ServerConfig, shutdown: CancellationToken) -> Result<()> {
    let state = AppState::new(&config, shutdown.clone())?;
    let app = router(state);
    let root = config.root.display().to_string();
    let stop = shutdown.clone();

    match &config.listen {
        ListenAddr::Tcp(addr) => {
            let listener = tokio::net::TcpListener::bind(addr).await?;
            info!(addr = %listener.local_addr()?, root = %root, "listen");
            axum::serve(listener, app)
                .with_graceful_shutdown(async move { stop.cancelled().await })
                .await?;
        }
        #[cfg(unix)]
        ListenAddr::Unix(path) => {
            let listener = tokio::net::UnixListener::bind(path)?;
            info!(addr = %config.listen, root = %root, "listen");
            axum::serve(listener, app)
                .with_graceful_shutdown(async move { stop.cancelled().await })
                .await?;
        }
        #[cfg(not(unix))]
        ListenAddr::Unix(path) => {
            return Err(Error::InvalidConfig {
                message: format!("unix sockets are not supported here: {}", path.display()),
            });
        }
    }

    info!("server stopped");
    Ok(())
}

/// Resolves on SIGINT or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("shutdown signal received");
}
