// src/assets.rs

//! Stylesheets compiled into the binary and served under `/static/`.

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};

#[derive(rust_embed::RustEmbed)]
#[folder = "assets/static/"]
struct StaticAssets;

/// Returns the embedded asset at `path` (relative to the static folder).
pub fn get(path: &str) -> Option<Vec<u8>> {
    StaticAssets::get(path).map(|file| file.data.into_owned())
}

/// Serves an embedded asset, or a plain 404 when there is none.
pub fn serve(path: &str) -> Response {
    match get(path) {
        Some(data) => {
            let mime = mime_guess::from_path(path).first_or_octet_stream();
            ([(header::CONTENT_TYPE, mime.to_string())], data).into_response()
        }
        None => (StatusCode::NOT_FOUND, format!("Asset not found: {path}")).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stylesheet_is_embedded() {
        let css = get("gfm.css").expect("gfm.css is bundled");
        assert!(String::from_utf8_lossy(&css).contains(".markdown-body"));
    }

    #[test]
    fn serve_sets_status_and_content_type() {
        assert_eq!(serve("missing.css").status(), StatusCode::NOT_FOUND);

        let ok = serve("gfm.css");
        assert_eq!(ok.status(), StatusCode::OK);
        assert_eq!(ok.headers()[header::CONTENT_TYPE], "text/css");
    }
}
