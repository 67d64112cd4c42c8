//! # Integration tests for mdlive
//!
//! End-to-end checks against a running server: plain HTTP over a socket,
//! live-reload delivery over WebSocket after a file write, and CLI failure
//! handling of the compiled binary.

use futures_util::{SinkExt, Stream, StreamExt};
use mdlive::config::ServerConfig;
use mdlive::server::Server;
use serde_json::Value;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::time::{timeout, Duration};
use tokio_tungstenite::tungstenite::Message;

/// Timeout for any single network step.
const SHORT_TIMEOUT: Duration = Duration::from_secs(5);

/// Starts a server on an ephemeral port serving `root`.
async fn start_server(root: &Path, live_reload: bool) -> (SocketAddr, oneshot::Sender<()>) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let addr = listener.local_addr().unwrap();
    let config = Arc::new(ServerConfig {
        host: addr.ip().to_string(),
        port: addr.port(),
        root_directory: root.to_path_buf(),
        log_level: "debug".to_string(),
        live_reload,
    });

    let server = Server::with_listener(config, listener).expect("Failed to start server");
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    tokio::spawn(async move {
        let shutdown = async {
            let _ = shutdown_rx.await;
        };
        if let Err(e) = server.serve(shutdown).await {
            eprintln!("[Test Server] Error: {e:#}");
        }
    });
    (addr, shutdown_tx)
}

/// Minimal HTTP/1.1 GET returning the raw response text.
async fn http_get(addr: SocketAddr, path: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.expect("connect failed");
    let request = format!("GET {path} HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n\r\n");
    stream.write_all(request.as_bytes()).await.unwrap();
    let mut response = Vec::new();
    timeout(SHORT_TIMEOUT, stream.read_to_end(&mut response))
        .await
        .expect("response timed out")
        .unwrap();
    String::from_utf8_lossy(&response).into_owned()
}

async fn next_json<S>(ws: &mut S) -> Value
where
    S: Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    loop {
        let msg = timeout(SHORT_TIMEOUT, ws.next())
            .await
            .expect("timed out waiting for a WebSocket message")
            .expect("WebSocket closed")
            .expect("WebSocket error");
        if let Message::Text(text) = msg {
            return serde_json::from_str(&text).expect("server sent invalid JSON");
        }
    }
}

#[tokio::test]
async fn test_serves_readme_and_404_over_http() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    fs::write(dir.path().join("README.md"), "# Hello").unwrap();
    let (addr, shutdown) = start_server(dir.path(), false).await;

    let index = http_get(addr, "/").await;
    assert!(index.starts_with("HTTP/1.1 200"), "{index}");
    assert!(index.contains("<h1>Hello</h1>"));
    assert!(!index.contains("livereload.js"));

    let missing = http_get(addr, "/missing.md").await;
    assert!(missing.starts_with("HTTP/1.1 404"), "{missing}");

    let _ = shutdown.send(());
}

#[tokio::test]
async fn test_websocket_receives_reload_after_write() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let readme = dir.path().join("README.md");
    fs::write(&readme, "# Hello").unwrap();
    let (addr, shutdown) = start_server(dir.path(), true).await;

    let page = http_get(addr, "/").await;
    assert!(page.contains(&format!("/livereload.js?port={}", addr.port())));

    let ws_url = format!("ws://{addr}/livereload");
    let (mut ws, _) = timeout(SHORT_TIMEOUT, tokio_tungstenite::connect_async(&ws_url))
        .await
        .expect("WebSocket connect timed out")
        .expect("WebSocket connect failed");

    ws.send(Message::Text(
        r#"{"command":"hello","protocols":["http://livereload.com/protocols/official-7"]}"#
            .to_string(),
    ))
    .await
    .unwrap();
    let hello = next_json(&mut ws).await;
    assert_eq!(hello["command"], "hello");
    assert_eq!(hello["serverName"], "mdlive");

    fs::write(&readme, "# Hello, again").unwrap();
    let reload = next_json(&mut ws).await;
    assert_eq!(reload["command"], "reload");
    assert!(
        reload["path"].as_str().unwrap().ends_with("README.md"),
        "{reload}"
    );

    let _ = shutdown.send(());
}

/// Runs the compiled binary against a directory that does not exist.
#[test]
fn test_cli_fails_with_missing_directory() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let missing = dir.path().join("no-such-dir");

    let output = std::process::Command::new(env!("CARGO_BIN_EXE_mdlive"))
        .arg(&missing)
        .output()
        .expect("Failed to run mdlive binary");

    assert!(
        !output.status.success(),
        "Expected non-zero exit code for a missing directory"
    );
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("directory not found"),
        "Expected error message not found. Output: {stderr}"
    );
}

/// `-h` is the host flag, so it must take a value instead of printing help.
#[test]
fn test_cli_short_h_is_host() {
    let output = std::process::Command::new(env!("CARGO_BIN_EXE_mdlive"))
        .arg("-h")
        .output()
        .expect("Failed to run mdlive binary");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("--host"), "Output: {stderr}");
}
