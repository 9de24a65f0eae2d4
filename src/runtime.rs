//! Runtime for executing one streaming session
//!
//! The executor owns the channel and the progress log; observers only ever
//! see copies pushed to them.

mod executor;

pub use executor::SessionRuntime;

use crate::progress::{ProgressLog, ProgressSummary};
use crate::protocol::{Outcome, OutcomeFailure, OutcomeSuccess};
use tokio_util::sync::CancellationToken;

/// Receives progress and the final outcome of a submission.
///
/// `on_progress` may fire any number of times; exactly one of `on_done` and
/// `on_fail` fires after it, once per accepted submission.
pub trait SessionObserver: Send {
    fn on_progress(&mut self, _summary: &ProgressSummary) {}

    fn on_done(&mut self, _result: &OutcomeSuccess) {}

    fn on_fail(&mut self, _failure: &OutcomeFailure) {}
}

/// Observer that ignores everything
impl SessionObserver for () {}

/// What a settled session leaves behind
#[derive(Debug, Clone)]
pub struct SessionReport {
    pub session_id: String,
    pub outcome: Outcome,
    /// Frozen at settlement
    pub progress: ProgressLog,
}

/// Lets a caller force-close an in-flight session
#[derive(Debug, Clone, Default)]
pub struct SessionHandle {
    cancel: CancellationToken,
}

impl SessionHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Close the channel; the session settles as a transport failure
    pub fn abort(&self) {
        self.cancel.cancel();
    }

    pub fn is_aborted(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub(crate) fn token(&self) -> CancellationToken {
        self.cancel.clone()
    }
}
