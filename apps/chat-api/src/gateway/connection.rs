//! Outbound half of a participant's transport.

use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::SplitSink;
use futures_util::SinkExt;

#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("connection closed")]
    Closed,
    #[error("websocket send failed: {0}")]
    Transport(#[from] axum::Error),
}

/// Handle the hub writes to. Only the hub's control loop ever touches it.
#[async_trait]
pub trait Connection: Send + Sync {
    /// Send one text frame.
    async fn send(&mut self, frame: &str) -> Result<(), ConnectionError>;

    /// Close the transport. Errors are ignored; the peer may already be gone.
    async fn close(&mut self);
}

/// The write half of an upgraded axum WebSocket.
pub struct WsConnection {
    sink: SplitSink<WebSocket, Message>,
}

impl WsConnection {
    pub fn new(sink: SplitSink<WebSocket, Message>) -> Self {
        Self { sink }
    }
}

#[async_trait]
impl Connection for WsConnection {
    async fn send(&mut self, frame: &str) -> Result<(), ConnectionError> {
        self.sink.send(Message::Text(frame.to_owned().into())).await?;
        Ok(())
    }

    async fn close(&mut self) {
        let _ = self.sink.send(Message::Close(None)).await;
        let _ = self.sink.close().await;
    }
}
