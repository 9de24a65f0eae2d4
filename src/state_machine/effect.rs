//! Effects produced by state transitions

use crate::protocol::{MalformedFrame, Outcome, OutcomeFailure, OutcomeSuccess, StepEvent};

/// Effects to be executed after state transition
#[derive(Debug, Clone)]
pub enum Effect {
    /// Open the duplex channel
    OpenChannel,

    /// Send the request frame on the open channel
    SendRequest,

    /// Append a step to the progress log
    AppendProgress { step: StepEvent },

    /// Push the recomputed summary to the observer
    NotifyProgress,

    /// Log and skip a frame that couldn't be classified
    LogMalformed { frame: MalformedFrame },

    /// Close the channel (idempotent)
    CloseChannel,

    /// Resolve the session with its one outcome
    Settle { outcome: Outcome },
}

impl Effect {
    pub fn settle_success(success: OutcomeSuccess) -> Self {
        Effect::Settle {
            outcome: Outcome::Success(success),
        }
    }

    pub fn settle_failure(failure: OutcomeFailure) -> Self {
        Effect::Settle {
            outcome: Outcome::Failure(failure),
        }
    }
}
