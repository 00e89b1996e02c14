//! Client for the stream server's HTTP and WebSocket endpoints

use anyhow::{Context, Result};
use futures_util::{SinkExt, StreamExt};
use reqwest::{Client, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::HashMap;
use tokio::net::TcpStream;
use tokio_tungstenite::{
    connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream,
};
use url::Url;

/// API client for the stream server
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(base_url).context("Invalid server URL")?;

        Ok(Self { client, base_url })
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let (status, body) = self.get_with_status(path).await?;
        if !status.is_success() {
            anyhow::bail!("API error ({})", status);
        }
        Ok(body)
    }

    /// GET that also decodes a 503 body, which health endpoints use to
    /// describe what is wrong
    pub async fn get_with_status<T: DeserializeOwned>(&self, path: &str) -> Result<(StatusCode, T)> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send request")?;

        let status = response.status();
        if !status.is_success() && status != StatusCode::SERVICE_UNAVAILABLE {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("API error ({}): {}", status, body);
        }

        let body = response.json().await.context("Failed to parse response")?;
        Ok((status, body))
    }

    /// WebSocket URL for a path on the same server
    pub fn ws_url(&self, path: &str) -> Result<Url> {
        let mut url = self.base_url.join(path).context("Invalid path")?;
        let scheme = match url.scheme() {
            "http" | "ws" => "ws",
            "https" | "wss" => "wss",
            other => anyhow::bail!("Unsupported URL scheme: {}", other),
        };
        url.set_scheme(scheme)
            .map_err(|_| anyhow::anyhow!("Cannot switch {} to {}", url, scheme))?;
        Ok(url)
    }

    /// Open a session and send the category selection
    pub async fn open_stream(&self, attack: &str) -> Result<PredictionStream> {
        let url = self.ws_url("ws")?;
        let (mut socket, _) = connect_async(url.as_str())
            .await
            .with_context(|| format!("Failed to connect to {}", url))?;

        let selection = serde_json::to_string(&SelectionRequest {
            attack: attack.to_string(),
        })?;
        socket
            .send(Message::Text(selection))
            .await
            .context("Failed to send selection")?;

        Ok(PredictionStream { socket })
    }
}

/// Server messages of one open session
pub struct PredictionStream {
    socket: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl PredictionStream {
    /// Next server message, or `None` once the server closes
    pub async fn next_message(&mut self) -> Result<Option<ServerMessage>> {
        while let Some(frame) = self.socket.next().await {
            match frame.context("WebSocket receive failed")? {
                Message::Text(text) => {
                    let message = serde_json::from_str(&text)
                        .with_context(|| format!("Unexpected server message: {}", text))?;
                    return Ok(Some(message));
                }
                Message::Close(_) => return Ok(None),
                _ => continue,
            }
        }
        Ok(None)
    }
}

// API types

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionRequest {
    pub attack: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ServerMessage {
    Prediction {
        prediction: Option<i64>,
        #[serde(rename = "final")]
        is_final: bool,
    },
    Error {
        error: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryInfo {
    pub key: String,
    pub available: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub last_check_timestamp: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub components: HashMap<String, ComponentHealth>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}
