//! Outbound client for the quote endpoint.
//!
//! One GET under a single budget that covers connect, headers and body. The
//! budget is deliberately tight, so a server that spends its own full
//! budgets makes this side time out first; that is reported, not hidden.

use std::path::Path;

use reqwest::header::HeaderValue;
use thiserror::Error;

use crate::config::ClientConfig;
use crate::http::X_REQUEST_TIMEOUT_MS;
use crate::quoting::BidResponse;
use crate::resilience::Deadline;

/// Errors that end the client run.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("failed to build request: {0}")]
    Request(String),

    #[error("server call timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("server call failed: {0}")]
    Transport(String),

    #[error("server returned status {0}")]
    BadStatus(u16),

    #[error("failed to decode response: {0}")]
    Decode(String),

    #[error("empty bid in response")]
    EmptyBid,

    #[error("failed to write {path}: {source}")]
    Output {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Client for `GET /cotacao`.
pub struct QuoteClient {
    http: reqwest::Client,
    config: ClientConfig,
}

impl QuoteClient {
    pub fn new(http: reqwest::Client, config: ClientConfig) -> Self {
        Self { http, config }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Fetch the bid from the server within the configured budget.
    pub async fn fetch_bid(&self) -> Result<String, ClientError> {
        let deadline = Deadline::after(self.config.timeout());

        let mut request = self
            .http
            .get(&self.config.server_url)
            .build()
            .map_err(|e| ClientError::Request(e.to_string()))?;

        if self.config.propagate_deadline {
            let remaining = deadline.remaining().as_millis().max(1).to_string();
            let value =
                HeaderValue::from_str(&remaining).map_err(|e| ClientError::Request(e.to_string()))?;
            request.headers_mut().insert(X_REQUEST_TIMEOUT_MS, value);
        }

        let exchange = async {
            let response = self.http.execute(request).await.map_err(transport)?;
            let status = response.status();
            if status != reqwest::StatusCode::OK {
                return Err(ClientError::BadStatus(status.as_u16()));
            }
            let body = response.bytes().await.map_err(transport)?;
            serde_json::from_slice::<BidResponse>(&body)
                .map_err(|e| ClientError::Decode(e.to_string()))
        };

        let decoded = deadline
            .run(exchange)
            .await
            .map_err(|e| ClientError::Timeout(e.budget))?
            .map_err(|e| match e {
                ClientError::Timeout(_) => ClientError::Timeout(deadline.budget()),
                other => other,
            })?;

        if decoded.bid.is_empty() {
            return Err(ClientError::EmptyBid);
        }
        Ok(decoded.bid)
    }

    /// Fetch the bid and record it to the configured output file.
    pub async fn fetch_and_record(&self) -> Result<String, ClientError> {
        let bid = self.fetch_bid().await?;
        write_artifact(Path::new(&self.config.output_path), &self.config.label, &bid).await?;
        Ok(bid)
    }
}

fn transport(err: reqwest::Error) -> ClientError {
    if err.is_timeout() {
        ClientError::Timeout(std::time::Duration::ZERO)
    } else {
        ClientError::Transport(err.to_string())
    }
}

/// Write `"<label>: <bid>\n"` to `path`, replacing any previous content.
pub async fn write_artifact(path: &Path, label: &str, bid: &str) -> Result<(), ClientError> {
    tokio::fs::write(path, format!("{label}: {bid}\n"))
        .await
        .map_err(|source| ClientError::Output {
            path: path.display().to_string(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_artifact_overwrites_previous_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cotacao.txt");
        std::fs::write(&path, "old line\nanother old line\n").unwrap();

        write_artifact(&path, "Dolar", "5.25").await.unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "Dolar: 5.25\n");
    }

    #[tokio::test]
    async fn test_artifact_write_error() {
        let err = write_artifact(Path::new("/nonexistent-dir/cotacao.txt"), "Dolar", "5.25")
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Output { .. }));
    }

    #[tokio::test]
    async fn test_invalid_url_is_request_error() {
        let config = ClientConfig {
            server_url: "not a url".into(),
            ..ClientConfig::default()
        };
        let client = QuoteClient::new(reqwest::Client::new(), config);

        let err = client.fetch_bid().await.unwrap_err();
        assert!(matches!(err, ClientError::Request(_)));
    }
}
