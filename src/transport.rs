//! Duplex channel abstraction
//!
//! The session runtime only talks to these traits; the WebSocket binding is
//! one implementation and the scripted channel in `testing` is another.

mod error;
pub mod websocket;

#[cfg(test)]
pub mod testing;

pub use error::TransportError;
pub use websocket::{WsChannel, WsConnector};

use crate::protocol::Request;
use async_trait::async_trait;
use std::sync::Arc;

/// Opens channels. One physical connection per `open`, never retried.
#[async_trait]
pub trait Connector: Send + Sync {
    type Channel: Channel;

    async fn open(&self, endpoint: &str) -> Result<Self::Channel, TransportError>;
}

/// An open duplex channel carrying text frames
#[async_trait]
pub trait Channel: Send {
    /// Send one text frame
    async fn send_text(&mut self, text: String) -> Result<(), TransportError>;

    /// Next inbound text frame, in arrival order.
    /// `None` once the peer has closed the channel.
    async fn next_frame(&mut self) -> Option<Result<String, TransportError>>;

    /// Close the channel. Safe to call any number of times.
    async fn close(&mut self);

    fn is_open(&self) -> bool;

    /// Serialize and send the session's request frame
    async fn send_request(&mut self, request: &Request) -> Result<(), TransportError> {
        if !self.is_open() {
            return Err(TransportError::NotOpen);
        }
        let payload =
            serde_json::to_string(request).map_err(|e| TransportError::Encode(e.to_string()))?;
        self.send_text(payload).await
    }
}

// ============================================================================
// Arc implementation so a connector can be shared with its observers
// ============================================================================

#[async_trait]
impl<T: Connector> Connector for Arc<T> {
    type Channel = T::Channel;

    async fn open(&self, endpoint: &str) -> Result<Self::Channel, TransportError> {
        (**self).open(endpoint).await
    }
}
