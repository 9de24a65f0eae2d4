//! Strategy Agent client
//!
//! Streams a natural-language strategy request to the strategy agent service
//! and turns its progress frames into a single settled outcome, with
//! multi-turn continuity through a server-assigned thread id.

#![allow(clippy::missing_errors_doc, clippy::must_use_candidate, clippy::module_name_repetitions)]

pub mod client;
pub mod config;
pub mod fallback;
pub mod progress;
pub mod protocol;
pub mod runtime;
pub mod state_machine;
pub mod transport;

pub use client::{BusyFlag, ClientError, ConversationThread, StrategyClient};
pub use config::ClientConfig;
pub use progress::{ProgressLog, ProgressSummary};
pub use protocol::{
    classify, Action, Classified, FailureKind, MalformedFrame, Outcome, OutcomeFailure,
    OutcomeSuccess, Request, RequestError, StepEvent, StepKind, StrategyParams, TimeRange,
    Timeframe,
};
pub use runtime::{SessionHandle, SessionObserver, SessionReport, SessionRuntime};
pub use transport::{Channel, Connector, TransportError, WsConnector};
