// src/web.rs
use crate::assets;
use crate::config::ServerConfig;
use crate::livereload::{self, LiveReload};
use crate::render::RenderPipeline;
use axum::{
    extract::{Request, State},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use percent_encoding::percent_decode_str;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tower::ServiceExt;
use tower_http::services::ServeFile;
use tracing::info;

const STATIC_PREFIX: &str = "/static/";
const INDEX_FILE: &str = "README.md";
const MARKDOWN_EXTENSION: &str = ".md";

/// Shared, read-only state for request handlers.
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub pipeline: RenderPipeline,
    pub live_reload: LiveReload,
}

/// Where a request path goes once the live-reload endpoints are ruled out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// An embedded asset, with the `/static/` prefix stripped.
    Static(String),
    /// A Markdown file relative to the root. Directory requests end up here
    /// with the index file appended.
    Markdown(PathBuf),
    /// Any other file relative to the root, served byte for byte.
    Raw(PathBuf),
    /// A path that would leave the root.
    Outside,
}

impl Route {
    /// Classifies a request path. First match wins: static prefix, directory,
    /// Markdown extension, anything else.
    pub fn resolve(uri_path: &str) -> Route {
        let decoded = percent_decode_str(uri_path).decode_utf8_lossy();

        if let Some(asset) = decoded.strip_prefix(STATIC_PREFIX) {
            return Route::Static(asset.to_string());
        }

        let Some(relative) = relative_path(&decoded) else {
            return Route::Outside;
        };
        if decoded.ends_with('/') {
            Route::Markdown(relative.join(INDEX_FILE))
        } else if decoded.ends_with(MARKDOWN_EXTENSION) {
            Route::Markdown(relative)
        } else {
            Route::Raw(relative)
        }
    }
}

/// Turns a URL path into a path relative to the served root, refusing `..`.
fn relative_path(uri_path: &str) -> Option<PathBuf> {
    let mut relative = PathBuf::new();
    for component in Path::new(uri_path.trim_start_matches('/')).components() {
        match component {
            Component::Normal(part) => relative.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    Some(relative)
}

/// Builds the application router.
///
/// The live-reload endpoints are exact routes; every other path goes through
/// [`Route::resolve`].
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route(livereload::SOCKET_PATH, get(livereload::websocket_handler))
        .route(livereload::SCRIPT_PATH, get(livereload::serve_script))
        .fallback(dispatch)
        .layer(middleware::from_fn(log_request))
        .with_state(state)
}

async fn dispatch(State(state): State<Arc<AppState>>, request: Request) -> Response {
    let root = &state.config.root_directory;
    let uri_path = request.uri().path().to_owned();
    match Route::resolve(&uri_path) {
        Route::Static(asset) => assets::serve(&asset),
        Route::Markdown(relative) => state.pipeline.render(&root.join(relative)).await.into_response(),
        Route::Raw(relative) => serve_raw(&state, &root.join(relative), request).await,
        Route::Outside => {
            let err = io::Error::from(io::ErrorKind::NotFound);
            state.pipeline.fallback(Path::new(&uri_path), &err).into_response()
        }
    }
}

/// Streams a file verbatim, or falls back to the 404/500 pages.
///
/// Directories are not listed; asking for one without the trailing slash is
/// an error page.
async fn serve_raw(state: &AppState, path: &Path, request: Request) -> Response {
    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.is_dir() => {
            let err = io::Error::other(format!("{} is a directory", path.display()));
            state.pipeline.fallback(path, &err).into_response()
        }
        Ok(_) => match ServeFile::new(path).oneshot(request).await {
            Ok(response) => response.into_response(),
            Err(never) => match never {},
        },
        Err(e) => state.pipeline.fallback(path, &e).into_response(),
    }
}

/// Logs one line per request once the response status is known.
async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let response = next.run(request).await;
    info!(%method, %uri, status = response.status().as_u16(), "request");
    response
}
