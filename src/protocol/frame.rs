//! Inbound frames and the event classifier

use super::step::StepKind;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;

/// One progress report from the server. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepEvent {
    #[serde(rename = "step", default)]
    pub kind: StepKind,
    #[serde(default, deserialize_with = "null_as_default")]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iteration: Option<u32>,
}

impl StepEvent {
    pub fn new(kind: StepKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            node: None,
            iteration: None,
        }
    }

    pub fn with_node(mut self, node: impl Into<String>) -> Self {
        self.node = Some(node.into());
        self
    }

    pub fn with_iteration(mut self, iteration: u32) -> Self {
        self.iteration = Some(iteration);
        self
    }

    /// Empty node labels and a zero iteration carry no information
    fn normalized(mut self) -> Self {
        self.node = self.node.filter(|node| !node.is_empty());
        self.iteration = self.iteration.filter(|n| *n > 0);
        self
    }
}

/// Whether a successful run refined an earlier strategy or wrote a new one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Generated,
    Optimized,
}

/// Payload of a `complete` frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeSuccess {
    /// Empty when the server didn't assign one
    #[serde(default, deserialize_with = "null_as_default")]
    pub thread_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub iteration_count: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_satisfactory: bool,
    #[serde(rename = "has_strategy", default, deserialize_with = "null_as_default")]
    pub has_prior_strategy: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy_report: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backtest_results: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_logs: Option<Vec<String>>,
}

impl OutcomeSuccess {
    pub fn action(&self) -> Action {
        if self.has_prior_strategy {
            Action::Optimized
        } else {
            Action::Generated
        }
    }
}

/// Where a failure came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The server sent an `error` frame or an HTTP error body
    ServerReported,
    /// The channel failed or closed before a terminal frame
    Transport,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutcomeFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl OutcomeFailure {
    pub fn server(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::ServerReported,
            message: message.into(),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Transport,
            message: message.into(),
        }
    }
}

/// Settled result of one session
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Success(OutcomeSuccess),
    Failure(OutcomeFailure),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }
}

/// A frame routed to its lane
#[derive(Debug, Clone, PartialEq)]
pub enum Classified {
    Progress(StepEvent),
    Complete(OutcomeSuccess),
    Failed(OutcomeFailure),
}

impl Classified {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Classified::Progress(_))
    }
}

/// A frame that couldn't be routed; skipped without failing the session
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Malformed frame: {reason}")]
pub struct MalformedFrame {
    pub reason: String,
}

impl MalformedFrame {
    fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Terminal frames must settle even when the server sends `null` fields
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Deserialize)]
struct ErrorFrame {
    #[serde(default)]
    message: Option<String>,
}

impl ErrorFrame {
    /// Missing, null and empty messages all read as "Unknown error"
    fn into_failure(self) -> OutcomeFailure {
        let message = self
            .message
            .filter(|message| !message.is_empty())
            .unwrap_or_else(|| "Unknown error".to_string());
        OutcomeFailure::server(message)
    }
}

/// Route a text frame by its `type` discriminant
pub fn classify(frame: &str) -> Result<Classified, MalformedFrame> {
    let value: Value = serde_json::from_str(frame)
        .map_err(|e| MalformedFrame::new(format!("invalid JSON: {e}")))?;

    let discriminant = value
        .get("type")
        .and_then(Value::as_str)
        .map(str::to_owned)
        .ok_or_else(|| MalformedFrame::new("missing `type` discriminant"))?;

    match discriminant.as_str() {
        "step" => serde_json::from_value::<StepEvent>(value)
            .map(|step| Classified::Progress(step.normalized()))
            .map_err(|e| MalformedFrame::new(format!("invalid step frame: {e}"))),
        "complete" => serde_json::from_value::<OutcomeSuccess>(value)
            .map(Classified::Complete)
            .map_err(|e| MalformedFrame::new(format!("invalid complete frame: {e}"))),
        "error" => serde_json::from_value::<ErrorFrame>(value)
            .map(|frame| Classified::Failed(frame.into_failure()))
            .map_err(|e| MalformedFrame::new(format!("invalid error frame: {e}"))),
        other => Err(MalformedFrame::new(format!(
            "unknown frame type {other:?}"
        ))),
    }
}
