//! Outbound request frame and its parameter types

use chrono::NaiveDate;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

const DATE_FORMAT: &str = "%Y%m%d";

/// Reasons a request is rejected before any channel is opened
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    #[error("Strategy idea must not be empty")]
    EmptyIdea,
    #[error("max_iterations must be at least 1")]
    NoIterations,
    #[error("At least one trading pair is required")]
    NoPairs,
    #[error("Time range start {start} is after end {end}")]
    InvertedRange { start: NaiveDate, end: NaiveDate },
    #[error("Unsupported timeframe: {0}")]
    UnknownTimeframe(String),
    #[error("Malformed time range {0:?} (expected YYYYMMDD-YYYYMMDD)")]
    MalformedRange(String),
    #[error("A new conversation cannot carry an existing thread id")]
    ConflictingContinuity,
}

// ============================================================================
// Timeframe
// ============================================================================

/// Supported backtest bar intervals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Timeframe {
    #[serde(rename = "1m")]
    OneMinute,
    #[default]
    #[serde(rename = "5m")]
    FiveMinutes,
    #[serde(rename = "15m")]
    FifteenMinutes,
    #[serde(rename = "30m")]
    ThirtyMinutes,
    #[serde(rename = "1h")]
    OneHour,
    #[serde(rename = "4h")]
    FourHours,
    #[serde(rename = "1d")]
    OneDay,
}

impl Timeframe {
    pub const ALL: [Timeframe; 7] = [
        Timeframe::OneMinute,
        Timeframe::FiveMinutes,
        Timeframe::FifteenMinutes,
        Timeframe::ThirtyMinutes,
        Timeframe::OneHour,
        Timeframe::FourHours,
        Timeframe::OneDay,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Timeframe::OneMinute => "1m",
            Timeframe::FiveMinutes => "5m",
            Timeframe::FifteenMinutes => "15m",
            Timeframe::ThirtyMinutes => "30m",
            Timeframe::OneHour => "1h",
            Timeframe::FourHours => "4h",
            Timeframe::OneDay => "1d",
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Timeframe {
    type Err = RequestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|tf| tf.as_str() == s)
            .ok_or_else(|| RequestError::UnknownTimeframe(s.to_string()))
    }
}

// ============================================================================
// Time range
// ============================================================================

/// Inclusive backtest window, `YYYYMMDD-YYYYMMDD` on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimeRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl TimeRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, RequestError> {
        if start > end {
            return Err(RequestError::InvertedRange { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }
}

impl Default for TimeRange {
    /// Calendar year 2023
    fn default() -> Self {
        Self {
            start: NaiveDate::from_ymd_opt(2023, 1, 1).unwrap_or_default(),
            end: NaiveDate::from_ymd_opt(2023, 12, 31).unwrap_or_default(),
        }
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}",
            self.start.format(DATE_FORMAT),
            self.end.format(DATE_FORMAT)
        )
    }
}

impl FromStr for TimeRange {
    type Err = RequestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || RequestError::MalformedRange(s.to_string());
        let (start, end) = s.split_once('-').ok_or_else(malformed)?;
        let start = NaiveDate::parse_from_str(start.trim(), DATE_FORMAT).map_err(|_| malformed())?;
        let end = NaiveDate::parse_from_str(end.trim(), DATE_FORMAT).map_err(|_| malformed())?;
        Self::new(start, end)
    }
}

impl Serialize for TimeRange {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TimeRange {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

// ============================================================================
// Strategy parameters
// ============================================================================

/// What the caller asks for, before conversation continuity is attached
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrategyParams {
    pub idea: String,
    pub max_iterations: u32,
    pub pairs: Vec<String>,
    pub timeframe: Timeframe,
    pub time_range: TimeRange,
}

pub const DEFAULT_MAX_ITERATIONS: u32 = 3;
pub const DEFAULT_PAIRS: [&str; 2] = ["BTC/USDT", "ETH/USDT"];

impl StrategyParams {
    pub fn new(idea: impl Into<String>) -> Self {
        Self {
            idea: idea.into(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
            pairs: DEFAULT_PAIRS.iter().map(ToString::to_string).collect(),
            timeframe: Timeframe::default(),
            time_range: TimeRange::default(),
        }
    }

    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_pairs<I, S>(mut self, pairs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.pairs = pairs.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_timeframe(mut self, timeframe: Timeframe) -> Self {
        self.timeframe = timeframe;
        self
    }

    pub fn with_time_range(mut self, time_range: TimeRange) -> Self {
        self.time_range = time_range;
        self
    }
}

// ============================================================================
// Request frame
// ============================================================================

/// The one frame a session sends, immediately after the channel opens
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    #[serde(rename = "strategy_idea")]
    pub idea: String,
    pub max_iterations: u32,
    pub pairs: Vec<String>,
    pub timeframe: Timeframe,
    #[serde(rename = "timerange")]
    pub time_range: TimeRange,
    pub thread_id: Option<String>,
    pub is_new_conversation: bool,
}

impl Request {
    pub fn from_params(
        params: StrategyParams,
        thread_id: Option<String>,
        is_new_conversation: bool,
    ) -> Self {
        Self {
            idea: params.idea,
            max_iterations: params.max_iterations,
            pairs: params.pairs,
            timeframe: params.timeframe,
            time_range: params.time_range,
            thread_id,
            is_new_conversation,
        }
    }

    pub fn validate(&self) -> Result<(), RequestError> {
        if self.idea.trim().is_empty() {
            return Err(RequestError::EmptyIdea);
        }
        if self.max_iterations == 0 {
            return Err(RequestError::NoIterations);
        }
        if self.pairs.is_empty() {
            return Err(RequestError::NoPairs);
        }
        if self.is_new_conversation && self.thread_id.is_some() {
            return Err(RequestError::ConflictingContinuity);
        }
        Ok(())
    }
}
