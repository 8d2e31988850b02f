//! WebSocket server loop.
//!
//! One task per connection reads frames and dispatches them to the
//! controller; a paired writer task drains that connection's envelope
//! queue back onto the socket. A closed socket runs the disconnect
//! cascade before the tasks wind down.

use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::protocol::{Envelope, RawRequest};

use super::controller::{Controller, SharedController};

/// Run the quiz session server.
pub async fn run(port: u16) -> Result<(), std::io::Error> {
    let controller = Controller::shared();

    let addr = format!("0.0.0.0:{port}");
    let listener = TcpListener::bind(&addr).await?;
    info!(%addr, "listening");

    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                let controller = Arc::clone(&controller);
                tokio::spawn(handle_connection(stream, peer, controller));
            }
            Err(e) => {
                error!(error = %e, "failed to accept connection");
            }
        }
    }
}

/// Handle a single WebSocket connection.
async fn handle_connection(stream: TcpStream, peer: SocketAddr, controller: SharedController) {
    let ws_stream = match tokio_tungstenite::accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            warn!(%peer, error = %e, "websocket handshake failed");
            return;
        }
    };
    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    let (tx, mut rx) = mpsc::unbounded_channel::<Envelope>();
    let id = Uuid::new_v4();
    controller.lock().await.transport_mut().register(id, tx);
    debug!(connection = %id, %peer, "connected");

    // Forward queued envelopes to the socket.
    let send_task = tokio::spawn(async move {
        while let Some(envelope) = rx.recv().await {
            let json = match serde_json::to_string(&envelope) {
                Ok(json) => json,
                Err(e) => {
                    error!(error = %e, "failed to encode envelope");
                    continue;
                }
            };
            if ws_sender.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    // Process incoming frames until the peer goes away.
    while let Some(message) = ws_receiver.next().await {
        let text = match message {
            Ok(Message::Text(text)) => text.to_string(),
            Ok(Message::Close(_)) => break,
            Err(_) => break,
            _ => continue,
        };

        let request: RawRequest = match serde_json::from_str(&text) {
            Ok(request) => request,
            Err(_) => {
                debug!(connection = %id, "discarding undecodable frame");
                continue;
            }
        };

        Controller::dispatch(&controller, id, request).await;
    }

    debug!(connection = %id, "disconnected");
    Controller::handle_disconnect(&controller, id).await;
    send_task.abort();
}
