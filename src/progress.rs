//! Progress accumulation for the in-flight request
//!
//! The log is append-only; the summary is rebuilt from the whole log on every
//! call so it can never drift from what was received.

use crate::protocol::{StepEvent, StepKind};
use std::fmt;

/// Ordered record of the step events received for one request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgressLog {
    events: Vec<StepEvent>,
}

impl ProgressLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, event: StepEvent) {
        self.events.push(event);
    }

    pub fn events(&self) -> &[StepEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    pub fn summary(&self) -> ProgressSummary {
        ProgressSummary {
            entries: self.events.iter().map(SummaryEntry::from).collect(),
        }
    }
}

/// One rendered line of the summary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryEntry {
    pub kind: StepKind,
    pub label: &'static str,
    pub message: String,
    pub node: Option<String>,
    pub iteration: Option<u32>,
}

impl From<&StepEvent> for SummaryEntry {
    fn from(event: &StepEvent) -> Self {
        Self {
            kind: event.kind,
            label: event.kind.label(),
            message: event.message.clone(),
            node: event.node.clone(),
            iteration: event.iteration,
        }
    }
}

impl fmt::Display for SummaryEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.label, self.message)?;
        if let Some(node) = &self.node {
            write!(f, " ({node})")?;
        }
        if let Some(iteration) = self.iteration {
            write!(f, " [iteration {iteration}]")?;
        }
        Ok(())
    }
}

/// Derived view of a [`ProgressLog`], one entry per event in arrival order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgressSummary {
    entries: Vec<SummaryEntry>,
}

impl ProgressSummary {
    pub fn entries(&self) -> &[SummaryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn latest(&self) -> Option<&SummaryEntry> {
        self.entries.last()
    }
}

impl fmt::Display for ProgressSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entry in &self.entries {
            writeln!(f, "{entry}")?;
        }
        Ok(())
    }
}
