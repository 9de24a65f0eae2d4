//! Client configuration

use crate::transport::websocket::DEFAULT_CONNECT_TIMEOUT;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";
pub const STREAM_PATH: &str = "/ws/generate_strategy";
pub const GENERATE_PATH: &str = "/generate_strategy";

/// Backtests are slow; the blocking endpoint can take minutes
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 600;

/// Where the strategy agent lives and how long to wait for it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: String,
    /// Explicit streaming endpoint; derived from `base_url` when unset
    pub ws_url: Option<String>,
    pub connect_timeout: Duration,
    /// Force-close a streaming session that hasn't settled by then
    pub session_timeout: Option<Duration>,
    pub http_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            ws_url: None,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            session_timeout: None,
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Unparseable numbers fall back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let secs = |key: &str| {
            let raw = lookup(key)?;
            match raw.trim().parse::<u64>() {
                Ok(secs) => Some(Duration::from_secs(secs)),
                Err(e) => {
                    tracing::warn!(key, value = %raw, error = %e, "Ignoring invalid timeout");
                    None
                }
            }
        };

        Self {
            base_url: lookup("STRATEGY_AGENT_URL")
                .filter(|url| !url.trim().is_empty())
                .unwrap_or(defaults.base_url),
            ws_url: lookup("STRATEGY_AGENT_WS_URL").filter(|url| !url.trim().is_empty()),
            connect_timeout: secs("STRATEGY_AGENT_CONNECT_TIMEOUT_SECS")
                .unwrap_or(defaults.connect_timeout),
            session_timeout: secs("STRATEGY_AGENT_SESSION_TIMEOUT_SECS"),
            http_timeout: secs("STRATEGY_AGENT_HTTP_TIMEOUT_SECS").unwrap_or(defaults.http_timeout),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn trimmed_base(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    /// Streaming endpoint: `ws_url` if set, otherwise the base URL with its
    /// scheme switched to `ws`/`wss`
    pub fn ws_endpoint(&self) -> String {
        if let Some(url) = &self.ws_url {
            return url.clone();
        }

        let base = self.trimmed_base();
        let switched = if let Some(rest) = base.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = base.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            base.to_string()
        };
        format!("{switched}{STREAM_PATH}")
    }

    /// Blocking fallback endpoint
    pub fn http_endpoint(&self) -> String {
        format!("{}{GENERATE_PATH}", self.trimmed_base())
    }
}
