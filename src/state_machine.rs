//! Streaming session state machine
//!
//! Implements the Elm Architecture pattern with pure state transitions; the
//! runtime executes the effects and feeds the results back in as events.

mod effect;
pub mod event;
pub mod state;
pub(crate) mod transition;

#[cfg(test)]
mod proptests;

pub use effect::Effect;
pub use event::Event;
pub use state::{SessionState, Settlement};
pub use transition::{transition, TransitionError, TransitionResult};
