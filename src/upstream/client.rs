//! Upstream quote client with deadline and error handling.
//!
//! # Responsibilities
//! - Issue one GET to the third-party quote API
//! - Bound the whole exchange (connect, headers, body) by a deadline
//! - Classify failures: timeout, status, payload

use std::time::Duration;

use chrono::Utc;

use crate::config::UpstreamConfig;
use crate::quoting::types::Quote;
use crate::resilience::Deadline;
use crate::upstream::types::{extract_pair, UpstreamError, UpstreamResult};

/// Fetches the latest bid for one currency pair.
#[derive(Clone)]
pub struct QuoteFetcher {
    http: reqwest::Client,
    url: String,
    pair_key: String,
}

impl QuoteFetcher {
    /// Create a fetcher over an existing HTTP client.
    pub fn new(http: reqwest::Client, config: &UpstreamConfig) -> Self {
        Self {
            http,
            url: config.url.clone(),
            pair_key: config.pair_key.clone(),
        }
    }

    /// Fetch the bid, giving up once `deadline` passes. No retries.
    pub async fn fetch_bid(&self, deadline: Deadline) -> UpstreamResult<Quote> {
        let body = deadline
            .run(self.get_body())
            .await
            .map_err(|e| UpstreamError::Timeout(e.budget))?
            .map_err(|e| match e {
                UpstreamError::Timeout(_) => UpstreamError::Timeout(deadline.budget()),
                other => other,
            })?;

        let pair = extract_pair(&body, &self.pair_key)?;

        tracing::debug!(
            pair = %self.pair_key,
            bid = %pair.bid,
            ask = pair.ask.as_deref().unwrap_or("-"),
            upstream_timestamp = pair.timestamp.as_deref().unwrap_or("-"),
            "Upstream quote received"
        );

        Ok(Quote::new(pair.bid, Utc::now()))
    }

    async fn get_body(&self) -> UpstreamResult<Vec<u8>> {
        let response = self
            .http
            .get(&self.url)
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::BadStatus(status.as_u16()));
        }

        let body = response.bytes().await.map_err(classify)?;
        Ok(body.to_vec())
    }
}

// The budget is filled in by the caller, which owns the deadline.
fn classify(err: reqwest::Error) -> UpstreamError {
    if err.is_timeout() {
        UpstreamError::Timeout(Duration::ZERO)
    } else {
        UpstreamError::Transport(err.to_string())
    }
}
