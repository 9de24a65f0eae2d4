//! Non-streaming fallback: one blocking POST, one result object

use crate::protocol::{Outcome, OutcomeFailure, OutcomeSuccess, Request};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FallbackError {
    #[error("Failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Body of a successful `POST /generate_strategy`
#[derive(Debug, Deserialize)]
struct FallbackResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    final_code: Option<String>,
    #[serde(default)]
    is_satisfactory: Option<bool>,
    #[serde(default)]
    iteration_count: Option<u32>,
    #[serde(default)]
    backtest_results: Option<Value>,
    #[serde(default)]
    error_logs: Option<Vec<String>>,
    #[serde(default)]
    thread_id: Option<String>,
    #[serde(default)]
    has_strategy: Option<bool>,
    #[serde(default)]
    strategy_report: Option<String>,
}

impl From<FallbackResponse> for OutcomeSuccess {
    fn from(response: FallbackResponse) -> Self {
        Self {
            // Absent thread id leaves the conversation untouched
            thread_id: response.thread_id.unwrap_or_default(),
            iteration_count: response.iteration_count.unwrap_or_default(),
            is_satisfactory: response.is_satisfactory.unwrap_or_default(),
            has_prior_strategy: response.has_strategy.unwrap_or_default(),
            final_code: response.final_code,
            strategy_report: response.strategy_report,
            backtest_results: response.backtest_results,
            error_logs: response.error_logs,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: Value,
}

pub struct FallbackClient {
    client: Client,
    endpoint: String,
}

impl FallbackClient {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, FallbackError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Send `request` and wait for the whole run. Never retries.
    pub async fn generate(&self, request: &Request) -> Outcome {
        tracing::info!(endpoint = %self.endpoint, "Sending blocking strategy request");

        let response = match self.client.post(&self.endpoint).json(request).send().await {
            Ok(response) => response,
            Err(e) => {
                let message = if e.is_timeout() {
                    format!("Request timeout: {e}")
                } else if e.is_connect() {
                    format!("Connection failed: {e}")
                } else {
                    format!("Request failed: {e}")
                };
                tracing::warn!(error = %message, "Blocking request failed");
                return Outcome::Failure(OutcomeFailure::transport(message));
            }
        };

        let status = response.status();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                return Outcome::Failure(OutcomeFailure::transport(format!(
                    "Failed to read response: {e}"
                )))
            }
        };

        if !status.is_success() {
            let failure = classify_error(status, &body);
            tracing::warn!(%status, error = %failure.message, "Server rejected blocking request");
            return Outcome::Failure(failure);
        }

        match serde_json::from_str::<FallbackResponse>(&body) {
            Ok(parsed) => {
                tracing::debug!(status = ?parsed.status, "Blocking request completed");
                Outcome::Success(parsed.into())
            }
            Err(e) => Outcome::Failure(OutcomeFailure::server(format!(
                "Failed to parse response: {e}"
            ))),
        }
    }
}

/// Prefer the server's `detail`; fall back to the raw body
fn classify_error(status: StatusCode, body: &str) -> OutcomeFailure {
    let detail = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .map(|parsed| match parsed.detail {
            Value::String(text) => text,
            other => other.to_string(),
        });

    match detail {
        Some(detail) => OutcomeFailure::server(detail),
        None if body.trim().is_empty() => OutcomeFailure::server(format!("HTTP {status}")),
        None => OutcomeFailure::server(format!("HTTP {status}: {body}")),
    }
}
