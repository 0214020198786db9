//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the quote and health handlers
//! - Wire up middleware (tracing, request ID, outer request timeout)
//! - Bind server to listener
//! - Stop on Ctrl-C or an explicit shutdown broadcast

use std::time::Duration;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    routing::get,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::{DefaultOnResponse, TraceLayer},
    LatencyUnit,
};
use tracing::Level;

use crate::config::ServerConfig;
use crate::http::quote::{get_quote, health};
use crate::http::request::{request_id, MakeRequestUuid, X_REQUEST_ID};
use crate::lifecycle::signals::wait_for_signal;
use crate::quoting::QuoteEngine;

// Slack the outer timeout leaves above the request budget, so the handler's
// own deadlines always answer first.
const BACKSTOP_MARGIN: Duration = Duration::from_millis(500);

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub engine: QuoteEngine,
    pub request_budget: Duration,
}

/// HTTP server for the quote endpoint.
pub struct HttpServer {
    router: Router,
    config: ServerConfig,
}

impl HttpServer {
    /// Create a new HTTP server around an engine.
    pub fn new(config: ServerConfig, engine: QuoteEngine) -> Self {
        let state = AppState {
            engine,
            request_budget: config.timeouts.request(),
        };
        let router = Self::build_router(&config, state);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &ServerConfig, state: AppState) -> Router {
        let backstop = config.timeouts.request() + BACKSTOP_MARGIN;
        Router::new()
            .route("/cotacao", get(get_quote))
            .route("/health", get(health))
            .with_state(state)
            .layer(TimeoutLayer::with_status_code(
                StatusCode::GATEWAY_TIMEOUT,
                backstop,
            ))
            .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
            .layer(
                TraceLayer::new_for_http()
                    .make_span_with(|request: &Request<Body>| {
                        tracing::info_span!(
                            "request",
                            method = %request.method(),
                            path = %request.uri().path(),
                            request_id = %request_id(request.headers()),
                        )
                    })
                    .on_response(
                        DefaultOnResponse::new()
                            .level(Level::INFO)
                            .latency_unit(LatencyUnit::Millis),
                    ),
            )
            .layer(SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuid))
    }

    /// Router with state and middleware, for in-process testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            fetch_ms = self.config.timeouts.fetch_ms,
            persist_ms = self.config.timeouts.persist_ms,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                tokio::select! {
                    _ = wait_for_signal() => {}
                    _ = shutdown.recv() => {}
                }
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
