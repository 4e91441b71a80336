//! WebSocket connection to the relay.
//!
//! The token authenticates the handshake via the URL query, matching what a
//! browser client can do. A 401 on the upgrade surfaces as
//! [`ClientError::Api`] so callers re-authenticate instead of reconnecting.

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::{
    connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream,
};

use crate::error::ClientResult;
use wire_schema::{ClientEvent, ServerEvent};

pub struct WsConnection {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl WsConnection {
    /// Open and authenticate a connection. `ws_base_url` is e.g.
    /// `ws://localhost:4000`.
    pub async fn connect(ws_base_url: &str, token: &str) -> ClientResult<Self> {
        let url = format!(
            "{}/api/ws?token={token}",
            ws_base_url.trim_end_matches('/')
        );
        let (stream, _response) = connect_async(url).await?;
        Ok(Self { stream })
    }

    /// Send one event. Fire-and-forget: the relay does not acknowledge.
    pub async fn send(&mut self, event: &ClientEvent) -> ClientResult<()> {
        let json = serde_json::to_string(event)
            .map_err(|e| crate::error::ClientError::Transport(e.to_string()))?;
        self.stream.send(Message::Text(json.into())).await?;
        Ok(())
    }

    /// Next server event; `None` once the connection has closed. Non-text
    /// frames and unknown payloads are skipped.
    pub async fn next_event(&mut self) -> ClientResult<Option<ServerEvent>> {
        while let Some(frame) = self.stream.next().await {
            match frame? {
                Message::Text(txt) => {
                    if let Ok(event) = serde_json::from_str::<ServerEvent>(txt.as_str()) {
                        return Ok(Some(event));
                    }
                    tracing::debug!("ignoring unknown frame payload");
                }
                Message::Close(_) => return Ok(None),
                _ => {}
            }
        }
        Ok(None)
    }

    pub async fn close(mut self) -> ClientResult<()> {
        self.stream.close(None).await?;
        Ok(())
    }
}
