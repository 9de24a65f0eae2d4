//! Events that drive a session

use crate::protocol::{Classified, MalformedFrame};
use crate::transport::TransportError;

/// Events that trigger state transitions
#[derive(Debug, Clone)]
pub enum Event {
    /// Caller invoked the session
    Start,

    // Channel events
    ChannelOpened,
    TransportFailed { error: TransportError },

    // Frame events
    Frame(Classified),
    Malformed(MalformedFrame),
}

impl Event {
    /// Short name for logs and transition errors
    pub fn name(&self) -> &'static str {
        match self {
            Event::Start => "start",
            Event::ChannelOpened => "channel_opened",
            Event::TransportFailed { .. } => "transport_failed",
            Event::Frame(Classified::Progress(_)) => "step",
            Event::Frame(Classified::Complete(_)) => "complete",
            Event::Frame(Classified::Failed(_)) => "error",
            Event::Malformed(_) => "malformed",
        }
    }
}
