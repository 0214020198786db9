use std::time::Instant;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};

use crate::http::request::{inbound_deadline, request_id};
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::quoting::{BidResponse, Persisted};

/// `GET /cotacao`: fetch the current bid, persist it best-effort, return it.
pub async fn get_quote(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let start = Instant::now();
    let request_id = request_id(&headers);
    let parent = inbound_deadline(&headers, state.request_budget);

    match state.engine.quote(parent).await {
        Ok(served) => {
            if let Persisted::Failed(e) = &served.persisted {
                metrics::record_persist_failure(e.kind());
            }
            tracing::info!(
                request_id = %request_id,
                bid = %served.quote.bid,
                persisted = served.persisted.is_stored(),
                "Quote served"
            );
            metrics::record_request(200, start);
            (StatusCode::OK, Json(BidResponse::from(&served.quote))).into_response()
        }
        Err(e) => {
            tracing::warn!(request_id = %request_id, error = %e, "Failed to obtain quote");
            metrics::record_upstream_failure(e.kind());
            metrics::record_request(504, start);
            (StatusCode::GATEWAY_TIMEOUT, "failed to obtain quote").into_response()
        }
    }
}

/// `GET /health`
pub async fn health() -> &'static str {
    "ok"
}
