// src/server.rs
use crate::config::ServerConfig;
use crate::livereload::LiveReload;
use crate::notifier;
use crate::render::{HtmlTemplate, RenderPipeline};
use crate::watcher::FsWatcher;
use crate::web::{self, AppState};
use anyhow::{Context, Result};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

/// A bound server with its watcher running, ready to serve.
pub struct Server {
    config: Arc<ServerConfig>,
    state: Arc<AppState>,
    listener: TcpListener,
    watcher: Option<FsWatcher>,
}

impl Server {
    /// Starts the watcher, then binds the listener to the configured address.
    ///
    /// A watch-setup failure aborts before the address is bound.
    pub async fn bind(config: Arc<ServerConfig>) -> Result<Self> {
        let (state, watcher) = wire(&config)?;
        let addr = config.addr();
        let listener = TcpListener::bind(&addr)
            .await
            .with_context(|| format!("failed to bind {addr}"))?;
        Ok(Self {
            config,
            state,
            listener,
            watcher,
        })
    }

    /// Same as [`Server::bind`] with a listener the caller already owns.
    pub fn with_listener(config: Arc<ServerConfig>, listener: TcpListener) -> Result<Self> {
        let (state, watcher) = wire(&config)?;
        Ok(Self {
            config,
            state,
            listener,
            watcher,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Serves requests until `shutdown` resolves, then stops the watcher.
    pub async fn serve<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        info!(
            "Serving directory: {} on http://{}...",
            self.config.root_directory.display(),
            self.local_addr()?
        );

        axum::serve(self.listener, web::router(self.state))
            .with_graceful_shutdown(shutdown)
            .await
            .context("HTTP server error")?;

        drop(self.watcher);
        info!("Server stopped.");
        Ok(())
    }
}

/// Builds the shared state and, with live reload on, starts the watcher and
/// the task forwarding its writes to the reload hub.
fn wire(config: &Arc<ServerConfig>) -> Result<(Arc<AppState>, Option<FsWatcher>)> {
    let template = HtmlTemplate::new().context("failed to load page template")?;
    let pipeline = RenderPipeline::new(template, config);
    let live_reload = LiveReload::new();

    let watcher = if config.live_reload {
        let (watcher, events) =
            FsWatcher::start(&config.root_directory).context("failed to start file watcher")?;
        let hub = live_reload.clone();
        tokio::spawn(async move {
            notifier::subscribe(events, |path| hub.refresh(path)).await;
        });
        Some(watcher)
    } else {
        info!("Live reload disabled; not watching for changes.");
        None
    };

    let state = Arc::new(AppState {
        config: Arc::clone(config),
        pipeline,
        live_reload,
    });
    Ok((state, watcher))
}
