//! Session state types

/// How a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settlement {
    /// Server sent a `complete` frame
    Success,
    /// Server sent an `error` frame
    Failure,
    /// Channel failed, was closed, or timed out before a terminal frame
    TransportError,
}

/// Session lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// Created, nothing opened yet
    #[default]
    Idle,

    /// Channel open in progress
    Connecting,

    /// Request sent; reading progress frames until a terminal frame
    AwaitingOutcome { steps_received: usize },

    /// Terminal. No further frames are processed.
    Settled { settlement: Settlement },
}

impl SessionState {
    pub fn is_settled(&self) -> bool {
        matches!(self, SessionState::Settled { .. })
    }

    /// Connecting or awaiting an outcome
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            SessionState::Connecting | SessionState::AwaitingOutcome { .. }
        )
    }

    pub fn settlement(&self) -> Option<Settlement> {
        match self {
            SessionState::Settled { settlement } => Some(*settlement),
            _ => None,
        }
    }
}
