//! Upstream payload types and error definitions.

use std::collections::HashMap;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

/// Errors that can occur while fetching a quote from the upstream API.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// The fetch deadline passed before a full response arrived.
    #[error("upstream timeout after {0:?}")]
    Timeout(Duration),

    /// Connection or protocol failure other than a timeout.
    #[error("upstream transport error: {0}")]
    Transport(String),

    /// Non-2xx response.
    #[error("upstream returned status {0}")]
    BadStatus(u16),

    /// Body is not JSON or lacks the expected pair/field.
    #[error("upstream payload invalid: {0}")]
    Parse(String),

    /// The bid field is present but empty.
    #[error("upstream bid field is empty")]
    EmptyField,
}

impl UpstreamError {
    /// Short label used for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            UpstreamError::Timeout(_) => "timeout",
            UpstreamError::Transport(_) => "transport",
            UpstreamError::BadStatus(_) => "bad_status",
            UpstreamError::Parse(_) => "parse",
            UpstreamError::EmptyField => "empty_field",
        }
    }
}

/// Result type for upstream operations.
pub type UpstreamResult<T> = Result<T, UpstreamError>;

/// One currency pair entry of the upstream response.
///
/// Only `bid` is required; the rest is informational.
#[derive(Debug, Clone, Deserialize)]
pub struct PairQuote {
    pub bid: String,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub codein: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub high: Option<String>,
    #[serde(default)]
    pub low: Option<String>,
    #[serde(default)]
    pub ask: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub create_date: Option<String>,
}

/// Pull the pair entry named `pair_key` out of a raw response body.
pub fn extract_pair(body: &[u8], pair_key: &str) -> UpstreamResult<PairQuote> {
    let mut pairs: HashMap<String, serde_json::Value> =
        serde_json::from_slice(body).map_err(|e| UpstreamError::Parse(e.to_string()))?;

    let entry = pairs
        .remove(pair_key)
        .ok_or_else(|| UpstreamError::Parse(format!("missing pair '{pair_key}'")))?;

    let pair: PairQuote =
        serde_json::from_value(entry).map_err(|e| UpstreamError::Parse(e.to_string()))?;

    if pair.bid.is_empty() {
        return Err(UpstreamError::EmptyField);
    }
    Ok(pair)
}
