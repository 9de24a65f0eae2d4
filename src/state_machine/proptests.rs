//! Property-based tests for the session state machine
//!
//! These tests verify key invariants hold across all possible event orders.

use super::*;
use crate::protocol::{
    Classified, MalformedFrame, Outcome, OutcomeFailure, OutcomeSuccess, StepEvent, StepKind,
};
use crate::transport::TransportError;
use proptest::prelude::*;

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_step_kind() -> impl Strategy<Value = StepKind> {
    prop_oneof![
        Just(StepKind::Start),
        Just(StepKind::DownloadingData),
        Just(StepKind::SyntaxChecked),
        Just(StepKind::BacktestRunning),
        Just(StepKind::WebSearching),
        Just(StepKind::Other),
    ]
}

fn arb_progress_event() -> impl Strategy<Value = Event> {
    (arb_step_kind(), "[a-zA-Z ]{0,20}").prop_map(|(kind, message)| {
        Event::Frame(Classified::Progress(StepEvent::new(kind, message)))
    })
}

fn arb_complete_event() -> impl Strategy<Value = Event> {
    ("[a-z0-9]{1,8}", 0u32..5, any::<bool>(), any::<bool>()).prop_map(
        |(thread_id, iteration_count, is_satisfactory, has_prior_strategy)| {
            Event::Frame(Classified::Complete(OutcomeSuccess {
                thread_id,
                iteration_count,
                is_satisfactory,
                has_prior_strategy,
                final_code: None,
                strategy_report: None,
                backtest_results: None,
                error_logs: None,
            }))
        },
    )
}

fn arb_failed_event() -> impl Strategy<Value = Event> {
    "[a-zA-Z ]{1,20}"
        .prop_map(|message| Event::Frame(Classified::Failed(OutcomeFailure::server(message))))
}

fn arb_transport_failure() -> impl Strategy<Value = Event> {
    prop_oneof![
        Just(TransportError::ClosedBeforeOutcome),
        Just(TransportError::ClosedByCaller),
        Just(TransportError::Timeout),
        "[a-z ]{1,10}".prop_map(TransportError::Receive),
    ]
    .prop_map(|error| Event::TransportFailed { error })
}

fn arb_malformed_event() -> impl Strategy<Value = Event> {
    "[a-z ]{1,20}".prop_map(|reason| Event::Malformed(MalformedFrame { reason }))
}

fn arb_event() -> impl Strategy<Value = Event> {
    prop_oneof![
        4 => arb_progress_event(),
        1 => arb_complete_event(),
        1 => arb_failed_event(),
        1 => arb_transport_failure(),
        1 => arb_malformed_event(),
        1 => Just(Event::Start),
        1 => Just(Event::ChannelOpened),
    ]
}

/// Drive a session through open, then apply `events`, collecting all effects
fn run(events: Vec<Event>) -> (SessionState, Vec<Effect>) {
    let mut state = SessionState::Idle;
    let mut effects = Vec::new();

    for event in [Event::Start, Event::ChannelOpened].into_iter().chain(events) {
        if let Ok(result) = transition(&state, event) {
            state = result.new_state;
            effects.extend(result.effects);
        }
    }
    (state, effects)
}

fn settle_count(effects: &[Effect]) -> usize {
    effects
        .iter()
        .filter(|e| matches!(e, Effect::Settle { .. }))
        .count()
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    // Invariant 1: at most one settlement, and exactly one once settled
    #[test]
    fn prop_settles_at_most_once(events in proptest::collection::vec(arb_event(), 0..30)) {
        let (state, effects) = run(events);
        let settles = settle_count(&effects);

        prop_assert!(settles <= 1, "settled {} times", settles);
        prop_assert_eq!(settles == 1, state.is_settled());
    }

    // Invariant 2: nothing is emitted after the settle effect
    #[test]
    fn prop_no_effects_after_settlement(events in proptest::collection::vec(arb_event(), 0..30)) {
        let (_, effects) = run(events);
        if let Some(pos) = effects.iter().position(|e| matches!(e, Effect::Settle { .. })) {
            prop_assert_eq!(pos, effects.len() - 1, "effects after settle: {:?}", &effects[pos..]);
        }
    }

    // Invariant 3: the channel is closed immediately before settling
    #[test]
    fn prop_close_precedes_settle(events in proptest::collection::vec(arb_event(), 0..30)) {
        let (_, effects) = run(events);
        for (i, effect) in effects.iter().enumerate() {
            if matches!(effect, Effect::Settle { .. }) {
                prop_assert!(i > 0 && matches!(effects[i - 1], Effect::CloseChannel));
            }
        }
    }

    // Invariant 4: progress appended equals progress frames seen before settlement
    #[test]
    fn prop_progress_counted_until_settlement(
        events in proptest::collection::vec(arb_event(), 0..30)
    ) {
        let mut expected = 0usize;
        for event in &events {
            match event {
                Event::Frame(Classified::Progress(_)) => expected += 1,
                Event::Frame(_) | Event::TransportFailed { .. } => break,
                _ => {}
            }
        }

        let (state, effects) = run(events);
        let appended = effects
            .iter()
            .filter(|e| matches!(e, Effect::AppendProgress { .. }))
            .count();
        prop_assert_eq!(appended, expected);
        if let SessionState::AwaitingOutcome { steps_received } = state {
            prop_assert_eq!(steps_received, expected);
        }
    }

    // Invariant 5: a settled session rejects every event
    #[test]
    fn prop_settled_is_terminal(event in arb_event(), settlement in prop_oneof![
        Just(Settlement::Success),
        Just(Settlement::Failure),
        Just(Settlement::TransportError),
    ]) {
        let state = SessionState::Settled { settlement };
        let is_already_settled = matches!(
            transition(&state, event),
            Err(TransitionError::AlreadySettled { .. })
        );
        prop_assert!(is_already_settled);
    }

    // Invariant 6: the settlement matches the first terminal event
    #[test]
    fn prop_first_terminal_event_wins(events in proptest::collection::vec(arb_event(), 0..30)) {
        let first_terminal = events.iter().find_map(|event| match event {
            Event::Frame(Classified::Complete(_)) => Some(Settlement::Success),
            Event::Frame(Classified::Failed(_)) => Some(Settlement::Failure),
            Event::TransportFailed { .. } => Some(Settlement::TransportError),
            _ => None,
        });

        let (state, effects) = run(events);
        prop_assert_eq!(state.settlement(), first_terminal);
        if let Some(Effect::Settle { outcome }) = effects.last() {
            prop_assert_eq!(outcome.is_success(), first_terminal == Some(Settlement::Success));
            if let Outcome::Failure(_) = outcome {
                prop_assert!(first_terminal != Some(Settlement::Success));
            }
        }
    }
}
