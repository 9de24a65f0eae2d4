//! Pure state transition function
//!
//! Given the same state and event this always produces the same result, with
//! no I/O. Every transition into `Settled` closes the channel before settling.

use super::{Effect, Event, SessionState, Settlement};
use crate::protocol::{Classified, OutcomeFailure};
use thiserror::Error;

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: SessionState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: SessionState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    pub fn with_effects(mut self, effects: impl IntoIterator<Item = Effect>) -> Self {
        self.effects.extend(effects);
        self
    }
}

/// Errors that can occur during transition
#[derive(Debug, Error)]
pub enum TransitionError {
    /// A second terminal frame (or anything else) after settlement
    #[error("Session already settled ({settlement:?}); ignoring {event}")]
    AlreadySettled {
        settlement: Settlement,
        event: &'static str,
    },
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
}

fn settled(settlement: Settlement) -> SessionState {
    SessionState::Settled { settlement }
}

/// Pure transition function
pub fn transition(
    state: &SessionState,
    event: Event,
) -> Result<TransitionResult, TransitionError> {
    match (state, event) {
        // Terminal states are final
        (SessionState::Settled { settlement }, event) => Err(TransitionError::AlreadySettled {
            settlement: *settlement,
            event: event.name(),
        }),

        // ============================================================
        // Opening
        // ============================================================

        (SessionState::Idle, Event::Start) => {
            Ok(TransitionResult::new(SessionState::Connecting).with_effect(Effect::OpenChannel))
        }

        (SessionState::Connecting, Event::ChannelOpened) => Ok(TransitionResult::new(
            SessionState::AwaitingOutcome { steps_received: 0 },
        )
        .with_effect(Effect::SendRequest)),

        // ============================================================
        // Frames
        // ============================================================

        (
            SessionState::AwaitingOutcome { steps_received },
            Event::Frame(Classified::Progress(step)),
        ) => Ok(TransitionResult::new(SessionState::AwaitingOutcome {
            steps_received: steps_received + 1,
        })
        .with_effects([Effect::AppendProgress { step }, Effect::NotifyProgress])),

        // Malformed frames never fail the session
        (SessionState::AwaitingOutcome { .. }, Event::Malformed(frame)) => {
            Ok(TransitionResult::new(*state).with_effect(Effect::LogMalformed { frame }))
        }

        (SessionState::AwaitingOutcome { .. }, Event::Frame(Classified::Complete(success))) => {
            Ok(TransitionResult::new(settled(Settlement::Success))
                .with_effect(Effect::CloseChannel)
                .with_effect(Effect::settle_success(success)))
        }

        (SessionState::AwaitingOutcome { .. }, Event::Frame(Classified::Failed(failure))) => {
            Ok(TransitionResult::new(settled(Settlement::Failure))
                .with_effect(Effect::CloseChannel)
                .with_effect(Effect::settle_failure(failure)))
        }

        // ============================================================
        // Transport failure from any live state
        // ============================================================

        (
            SessionState::Idle | SessionState::Connecting | SessionState::AwaitingOutcome { .. },
            Event::TransportFailed { error },
        ) => Ok(TransitionResult::new(settled(Settlement::TransportError))
            .with_effect(Effect::CloseChannel)
            .with_effect(Effect::settle_failure(OutcomeFailure::transport(
                error.to_string(),
            )))),

        (state, event) => Err(TransitionError::InvalidTransition(format!(
            "{} in state {state:?}",
            event.name()
        ))),
    }
}
