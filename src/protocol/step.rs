//! Progress step kinds and their display labels

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Kind tag carried by a `step` frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StepKind {
    Start,
    DownloadingData,
    DataDownloaded,
    DataSkipped,
    CodeGenerated,
    SyntaxChecked,
    BacktestRunning,
    Evaluation,
    ReportGenerated,
    WebSearching,
    /// Anything the server sends that we don't have a name for
    #[default]
    Other,
}

/// Wire name and display label per kind. `Other` must stay last.
const STEP_TABLE: [(StepKind, &str, &str); 11] = [
    (StepKind::Start, "start", "🚀"),
    (StepKind::DownloadingData, "downloading_data", "📥"),
    (StepKind::DataDownloaded, "data_downloaded", "✅"),
    (StepKind::DataSkipped, "data_skipped", "⏭️"),
    (StepKind::CodeGenerated, "code_generated", "💻"),
    (StepKind::SyntaxChecked, "syntax_checked", "🔍"),
    (StepKind::BacktestRunning, "backtest_running", "📊"),
    (StepKind::Evaluation, "evaluation", "📈"),
    (StepKind::ReportGenerated, "report_generated", "📝"),
    (StepKind::WebSearching, "web_searching", "🔎"),
    (StepKind::Other, "other", "⚙️"),
];

const OTHER_ENTRY: (StepKind, &str, &str) = STEP_TABLE[STEP_TABLE.len() - 1];

impl StepKind {
    fn entry(self) -> (StepKind, &'static str, &'static str) {
        STEP_TABLE
            .iter()
            .copied()
            .find(|(kind, _, _)| *kind == self)
            .unwrap_or(OTHER_ENTRY)
    }

    /// Parse a wire name; unknown names map to `Other`
    pub fn from_wire(name: &str) -> Self {
        STEP_TABLE
            .iter()
            .find(|(_, wire, _)| *wire == name)
            .map_or(StepKind::Other, |(kind, _, _)| *kind)
    }

    pub fn as_str(self) -> &'static str {
        self.entry().1
    }

    /// Display label for progress rendering
    pub fn label(self) -> &'static str {
        self.entry().2
    }
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for StepKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for StepKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(Self::from_wire(&name))
    }
}
