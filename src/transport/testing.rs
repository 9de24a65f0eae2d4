//! Scripted in-memory transport for testing
//!
//! Each queued session is a list of steps the channel plays back in order;
//! running off the end of the list looks like the server closing.

use super::{Channel, Connector, TransportError};
use crate::protocol::Request;
use async_trait::async_trait;
use serde_json::json;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// One thing the scripted server does
#[derive(Debug, Clone)]
pub enum Script {
    /// Deliver a text frame
    Frame(String),
    /// Fail the receive with a transport error
    Fail(TransportError),
    /// Never deliver anything again (until the channel is closed)
    Hang,
}

pub fn step(kind: &str, message: &str) -> Script {
    Script::Frame(json!({ "type": "step", "step": kind, "message": message }).to_string())
}

pub fn complete(thread_id: &str) -> Script {
    Script::Frame(
        json!({
            "type": "complete",
            "thread_id": thread_id,
            "iteration_count": 1,
            "is_satisfactory": true,
            "has_strategy": false
        })
        .to_string(),
    )
}

pub fn error(message: &str) -> Script {
    Script::Frame(json!({ "type": "error", "message": message }).to_string())
}

pub fn raw(frame: &str) -> Script {
    Script::Frame(frame.to_string())
}

#[derive(Default)]
struct Shared {
    sent: Mutex<Vec<String>>,
    closes: AtomicUsize,
}

/// Connector that hands out pre-scripted channels, one per `open`
#[derive(Default)]
pub struct ScriptedConnector {
    sessions: Mutex<VecDeque<Result<Vec<Script>, TransportError>>>,
    endpoints: Mutex<Vec<String>>,
    shared: Arc<Shared>,
}

impl ScriptedConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the frames the next opened channel will deliver
    pub fn queue_session(&self, script: Vec<Script>) {
        self.sessions.lock().unwrap().push_back(Ok(script));
    }

    /// Make the next `open` fail
    pub fn queue_refusal(&self, error: TransportError) {
        self.sessions.lock().unwrap().push_back(Err(error));
    }

    pub fn opened_endpoints(&self) -> Vec<String> {
        self.endpoints.lock().unwrap().clone()
    }

    pub fn sent_frames(&self) -> Vec<String> {
        self.shared.sent.lock().unwrap().clone()
    }

    pub fn sent_requests(&self) -> Vec<Request> {
        self.sent_frames()
            .iter()
            .map(|frame| serde_json::from_str(frame).unwrap())
            .collect()
    }

    /// Number of channels actually closed (repeat closes don't count)
    pub fn closed_channels(&self) -> usize {
        self.shared.closes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for ScriptedConnector {
    type Channel = ScriptedChannel;

    async fn open(&self, endpoint: &str) -> Result<ScriptedChannel, TransportError> {
        self.endpoints.lock().unwrap().push(endpoint.to_string());
        let script = self
            .sessions
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::Connect("no scripted session".to_string())))?;
        Ok(ScriptedChannel {
            script: script.into(),
            shared: Arc::clone(&self.shared),
            open: true,
        })
    }
}

pub struct ScriptedChannel {
    script: VecDeque<Script>,
    shared: Arc<Shared>,
    open: bool,
}

#[async_trait]
impl Channel for ScriptedChannel {
    async fn send_text(&mut self, text: String) -> Result<(), TransportError> {
        if !self.open {
            return Err(TransportError::NotOpen);
        }
        self.shared.sent.lock().unwrap().push(text);
        Ok(())
    }

    async fn next_frame(&mut self) -> Option<Result<String, TransportError>> {
        if !self.open {
            return None;
        }
        match self.script.pop_front()? {
            Script::Frame(text) => Some(Ok(text)),
            Script::Fail(error) => Some(Err(error)),
            Script::Hang => std::future::pending().await,
        }
    }

    async fn close(&mut self) {
        if self.open {
            self.open = false;
            self.shared.closes.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn is_open(&self) -> bool {
        self.open
    }
}
