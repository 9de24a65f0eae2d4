//! WebSocket binding over `tokio-tungstenite`

use super::{Channel, Connector, TransportError};
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Default time allowed for the WebSocket handshake
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

/// Opens one WebSocket per session
#[derive(Debug, Clone)]
pub struct WsConnector {
    connect_timeout: Duration,
}

impl WsConnector {
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }
}

impl Default for WsConnector {
    fn default() -> Self {
        Self::new(DEFAULT_CONNECT_TIMEOUT)
    }
}

#[async_trait]
impl Connector for WsConnector {
    type Channel = WsChannel;

    async fn open(&self, endpoint: &str) -> Result<WsChannel, TransportError> {
        let (stream, _response) =
            tokio::time::timeout(self.connect_timeout, connect_async(endpoint))
                .await
                .map_err(|_| TransportError::Timeout)?
                .map_err(|e| TransportError::Connect(e.to_string()))?;

        tracing::debug!(endpoint, "WebSocket connected");
        Ok(WsChannel {
            stream: Some(stream),
        })
    }
}

/// An open WebSocket. Dropping the stream on close makes every later call a no-op.
pub struct WsChannel {
    stream: Option<WsStream>,
}

#[async_trait]
impl Channel for WsChannel {
    async fn send_text(&mut self, text: String) -> Result<(), TransportError> {
        let stream = self.stream.as_mut().ok_or(TransportError::NotOpen)?;
        stream
            .send(Message::Text(text))
            .await
            .map_err(|e| TransportError::Send(e.to_string()))
    }

    async fn next_frame(&mut self) -> Option<Result<String, TransportError>> {
        loop {
            let stream = self.stream.as_mut()?;
            match stream.next().await {
                Some(Ok(Message::Text(text))) => return Some(Ok(text)),
                Some(Ok(Message::Binary(bytes))) => match String::from_utf8(bytes) {
                    Ok(text) => return Some(Ok(text)),
                    Err(_) => {
                        tracing::warn!("Dropping non-UTF-8 binary frame");
                    }
                },
                Some(Ok(Message::Close(frame))) => {
                    tracing::debug!(?frame, "Server closed WebSocket");
                    return None;
                }
                // ping/pong are answered by tungstenite
                Some(Ok(_)) => {}
                Some(Err(e)) => return Some(Err(TransportError::Receive(e.to_string()))),
                None => return None,
            }
        }
    }

    async fn close(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            if let Err(e) = stream.close(None).await {
                tracing::debug!(error = %e, "WebSocket close handshake failed");
            }
        }
    }

    fn is_open(&self) -> bool {
        self.stream.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{Request, StrategyParams};
    use axum::extract::ws::{Message as ServerMessage, WebSocket, WebSocketUpgrade};
    use axum::routing::get;
    use axum::Router;
    use tokio::net::TcpListener;
    use tokio::sync::mpsc;

    async fn play_script(
        mut socket: WebSocket,
        frames: Vec<String>,
        received: mpsc::UnboundedSender<String>,
    ) {
        if let Some(Ok(ServerMessage::Text(request))) = socket.recv().await {
            let _ = received.send(request);
        }
        for frame in frames {
            if socket.send(ServerMessage::Text(frame)).await.is_err() {
                return;
            }
        }
        let _ = socket.send(ServerMessage::Close(None)).await;
    }

    /// Serve one scripted exchange; returns the ws URL and the requests received
    async fn scripted_server(frames: Vec<String>) -> (String, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let app = Router::new().route(
            "/ws/generate_strategy",
            get(move |ws: WebSocketUpgrade| {
                let frames = frames.clone();
                let tx = tx.clone();
                async move { ws.on_upgrade(move |socket| play_script(socket, frames, tx)) }
            }),
        );
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        (format!("ws://{addr}/ws/generate_strategy"), rx)
    }

    #[tokio::test]
    async fn test_sends_request_and_reads_frames_until_close() {
        let frames = vec![
            r#"{"type":"step","step":"start","message":"Starting"}"#.to_string(),
            r#"{"type":"complete","thread_id":"t1","iteration_count":1,"is_satisfactory":true,"has_strategy":false}"#.to_string(),
        ];
        let (url, mut received) = scripted_server(frames.clone()).await;

        let mut channel = WsConnector::default().open(&url).await.unwrap();
        assert!(channel.is_open());

        let request = Request::from_params(StrategyParams::new("ma cross"), None, false);
        channel.send_request(&request).await.unwrap();

        assert_eq!(channel.next_frame().await, Some(Ok(frames[0].clone())));
        assert_eq!(channel.next_frame().await, Some(Ok(frames[1].clone())));
        assert_eq!(channel.next_frame().await, None);

        let sent: Request = serde_json::from_str(&received.recv().await.unwrap()).unwrap();
        assert_eq!(sent, request);

        channel.close().await;
    }

    #[tokio::test]
    async fn test_close_is_idempotent_and_blocks_further_sends() {
        let (url, _received) = scripted_server(vec![]).await;
        let mut channel = WsConnector::default().open(&url).await.unwrap();

        channel.close().await;
        channel.close().await;

        assert!(!channel.is_open());
        assert_eq!(channel.next_frame().await, None);
        let request = Request::from_params(StrategyParams::new("x"), None, false);
        assert_eq!(
            channel.send_request(&request).await,
            Err(TransportError::NotOpen)
        );
    }

    #[tokio::test]
    async fn test_refused_connection_is_a_connect_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let result = WsConnector::default()
            .open(&format!("ws://{addr}/ws/generate_strategy"))
            .await;
        assert!(matches!(result, Err(TransportError::Connect(_))));
    }
}
