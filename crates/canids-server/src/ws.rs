//! WebSocket transport for stream sessions

use anyhow::{Context, Result};
use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket};
use canids_lib::models::ServerMessage;
use canids_lib::session::{Inbound, Transport};
use tracing::debug;

/// Adapts an upgraded axum socket to the session [`Transport`]
pub struct WebSocketTransport {
    socket: WebSocket,
    closed: bool,
}

impl WebSocketTransport {
    pub fn new(socket: WebSocket) -> Self {
        Self {
            socket,
            closed: false,
        }
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn recv(&mut self) -> Inbound {
        if self.closed {
            return Inbound::Closed;
        }

        loop {
            match self.socket.recv().await {
                Some(Ok(Message::Text(text))) => return Inbound::Text(text),
                Some(Ok(Message::Binary(data))) => return Inbound::Binary(data),
                // Control frames are answered by the protocol layer
                Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => continue,
                Some(Ok(Message::Close(_))) | None => {
                    self.closed = true;
                    return Inbound::Closed;
                }
                Some(Err(e)) => {
                    debug!(error = %e, "WebSocket receive failed");
                    self.closed = true;
                    return Inbound::Closed;
                }
            }
        }
    }

    async fn send(&mut self, message: &ServerMessage) -> Result<()> {
        let text = serde_json::to_string(message).context("Failed to encode server message")?;
        self.socket
            .send(Message::Text(text))
            .await
            .context("Failed to send WebSocket message")?;
        Ok(())
    }

    async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if let Err(e) = self.socket.send(Message::Close(None)).await {
            debug!(error = %e, "WebSocket already closed");
        }
    }
}
