use crate::visibility::BrowserVisibility;
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::protocol::Message;
use tracing::{debug, info, warn};

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum VisibilityState {
    Visible,
    Hidden,
}

/// Messages a browser extension sends to the daemon.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum HostMessage {
    Visibility { state: VisibilityState },
}

#[derive(Debug, Serialize)]
pub struct WebSocketResponse {
    pub success: bool,
    pub message: Option<String>,
}

pub async fn start_websocket_server(
    addr: SocketAddr,
    visibility: Arc<BrowserVisibility>,
) -> std::io::Result<()> {
    let listener = TcpListener::bind(&addr).await?;
    info!(%addr, "WebSocket server listening");

    while let Ok((stream, peer_addr)) = listener.accept().await {
        debug!(%peer_addr, "new WebSocket connection");
        tokio::spawn(handle_connection(stream, peer_addr, visibility.clone()));
    }

    Ok(())
}

/// Applies one text frame and builds the reply for it.
pub fn handle_text(
    text: &str,
    peer_addr: SocketAddr,
    visibility: &BrowserVisibility,
) -> WebSocketResponse {
    match serde_json::from_str::<HostMessage>(text) {
        Ok(HostMessage::Visibility { state }) => {
            visibility.set_client(peer_addr, state == VisibilityState::Visible);
            WebSocketResponse {
                success: true,
                message: Some("Message received".to_string()),
            }
        }
        Err(e) => {
            warn!(%peer_addr, error = %e, "failed to parse message");
            WebSocketResponse {
                success: false,
                message: Some(format!("Parse error: {}", e)),
            }
        }
    }
}

async fn handle_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    visibility: Arc<BrowserVisibility>,
) {
    let ws_stream = match tokio_tungstenite::accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            warn!(%peer_addr, error = %e, "WebSocket handshake failed");
            return;
        }
    };

    info!(%peer_addr, "browser connected");

    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    while let Some(msg) = ws_receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                let response = handle_text(&text, peer_addr, &visibility);
                if let Ok(response_json) = serde_json::to_string(&response) {
                    if let Err(e) = ws_sender.send(Message::Text(response_json)).await {
                        warn!(%peer_addr, error = %e, "failed to send WebSocket response");
                        break;
                    }
                }
            }
            Ok(Message::Close(_)) => {
                debug!(%peer_addr, "WebSocket connection closed by client");
                break;
            }
            Ok(Message::Ping(data)) => {
                if let Err(e) = ws_sender.send(Message::Pong(data)).await {
                    warn!(%peer_addr, error = %e, "failed to send pong");
                    break;
                }
            }
            Ok(_) => {}
            Err(e) => {
                warn!(%peer_addr, error = %e, "WebSocket error");
                break;
            }
        }
    }

    visibility.remove_client(peer_addr);
    info!(%peer_addr, "browser disconnected");
}
