//! Wire protocol for the strategy agent service
//!
//! One request frame goes out per session; the server answers with zero or
//! more `step` frames followed by exactly one `complete` or `error` frame.

mod frame;
mod request;
mod step;

pub use frame::{
    classify, Action, Classified, FailureKind, MalformedFrame, Outcome, OutcomeFailure,
    OutcomeSuccess, StepEvent,
};
pub use request::{Request, RequestError, StrategyParams, TimeRange, Timeframe};
pub use step::StepKind;
