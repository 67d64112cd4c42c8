// src/livereload.rs
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    http::header,
    response::{IntoResponse, Response},
};
use futures_util::{
    sink::SinkExt,
    stream::{SplitSink, SplitStream, StreamExt},
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, error, info, warn};

use crate::web::AppState;

/// Path of the WebSocket endpoint.
pub const SOCKET_PATH: &str = "/livereload";
/// Path of the client script.
pub const SCRIPT_PATH: &str = "/livereload.js";

const CLIENT_SCRIPT: &str = include_str!("../assets/livereload.js");
const PROTOCOL: &str = "http://livereload.com/protocols/official-7";
const SERVER_NAME: &str = "mdlive";
const CHANNEL_CAPACITY: usize = 100;

/// Messages of the LiveReload protocol that this server understands.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "command", rename_all = "lowercase")]
pub enum Command {
    Hello {
        #[serde(default)]
        protocols: Vec<String>,
        #[serde(rename = "serverName", default, skip_serializing_if = "Option::is_none")]
        server_name: Option<String>,
    },
    Reload {
        path: String,
        #[serde(rename = "liveCSS")]
        live_css: bool,
    },
    #[serde(other)]
    Unknown,
}

impl Command {
    fn server_hello() -> Self {
        Command::Hello {
            protocols: vec![PROTOCOL.to_string()],
            server_name: Some(SERVER_NAME.to_string()),
        }
    }
}

/// Fan-out of reload signals to every connected browser.
#[derive(Clone)]
pub struct LiveReload {
    tx: broadcast::Sender<Command>,
}

impl LiveReload {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    /// Tells connected clients to reload. Never blocks; having no clients is
    /// not an error.
    pub fn refresh(&self, path: &Path) {
        let command = Command::Reload {
            path: path.display().to_string(),
            live_css: true,
        };
        match self.tx.send(command) {
            Ok(clients) => debug!("Reload sent to {} client(s).", clients),
            Err(_) => debug!("No live-reload clients, reload not sent."),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Command> {
        self.tx.subscribe()
    }
}

/// Serves the browser side of live reload.
pub async fn serve_script() -> impl IntoResponse {
    (
        [
            (header::CONTENT_TYPE, "application/javascript"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        CLIENT_SCRIPT,
    )
}

/// Handles incoming WebSocket upgrade requests.
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> Response {
    info!("New live-reload connection request.");
    let rx = state.live_reload.subscribe();
    ws.on_upgrade(move |socket| handle_socket(socket, rx))
}

async fn send(sender: &mut SplitSink<WebSocket, Message>, command: &Command) -> bool {
    match serde_json::to_string(command) {
        Ok(json) => sender.send(Message::Text(json)).await.is_ok(),
        Err(e) => {
            error!("Failed to serialize live-reload command: {}", e);
            true
        }
    }
}

/// Answers the client's hello and pushes reload commands until either side
/// goes away.
async fn handle_socket(socket: WebSocket, mut rx: broadcast::Receiver<Command>) {
    info!("Live-reload client connected.");
    let (mut sender, mut receiver): (SplitSink<WebSocket, Message>, SplitStream<WebSocket>) =
        socket.split();

    loop {
        tokio::select! {
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    match serde_json::from_str::<Command>(&text) {
                        Ok(Command::Hello { .. }) => {
                            if !send(&mut sender, &Command::server_hello()).await {
                                break;
                            }
                        }
                        Ok(other) => debug!("Ignoring live-reload client command: {:?}", other),
                        Err(e) => debug!("Unparseable live-reload message {:?}: {}", text, e),
                    }
                }
                Some(Ok(Message::Close(_))) | None => {
                    debug!("Live-reload client closed the connection.");
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!("Live-reload socket error: {}", e);
                    break;
                }
            },
            outgoing = rx.recv() => match outgoing {
                Ok(command) => {
                    if !send(&mut sender, &command).await {
                        warn!("Failed to send reload to client, client disconnected?");
                        break;
                    }
                }
                Err(RecvError::Lagged(missed)) => {
                    warn!("Live-reload client lagged behind, missed {} reloads.", missed);
                }
                Err(RecvError::Closed) => break,
            },
        }
    }
    info!("Live-reload client disconnected.");
}
