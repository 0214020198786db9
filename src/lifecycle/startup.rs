//! Startup orchestration.
//!
//! # Responsibilities
//! - Open storage and build the outbound HTTP client
//! - Assemble the quote engine and HTTP server
//! - Bind the listener last, once everything else is ready
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Subsystems initialize in order, not concurrently

use thiserror::Error;
use tokio::net::TcpListener;

use crate::config::ServerConfig;
use crate::http::HttpServer;
use crate::quoting::{Budgets, QuoteEngine};
use crate::storage::{QuoteStore, StorageError};
use crate::upstream::QuoteFetcher;

/// Errors that abort server startup.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("storage: {0}")]
    Storage(#[from] StorageError),

    #[error("http client: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },
}

/// Build every subsystem from `config` and bind the listener.
pub async fn bootstrap(config: ServerConfig) -> Result<(HttpServer, TcpListener), StartupError> {
    let store = QuoteStore::open(&config.storage.path)?;
    tracing::info!(path = %config.storage.path, "Quote store ready");

    let http = reqwest::Client::builder()
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()?;
    let fetcher = QuoteFetcher::new(http, &config.upstream);
    let engine = QuoteEngine::new(fetcher, store, Budgets::from(&config.timeouts));

    let listener = TcpListener::bind(&config.listener.bind_address)
        .await
        .map_err(|source| StartupError::Bind {
            address: config.listener.bind_address.clone(),
            source,
        })?;

    Ok((HttpServer::new(config, engine), listener))
}
