//! Request metadata: request IDs and caller deadlines.
//!
//! # Responsibilities
//! - Generate a UUID request ID when the caller sent none
//! - Read the caller's remaining budget from `x-request-timeout-ms`
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - A caller budget can only shorten the server's own request budget

use std::time::Duration;

use axum::http::{HeaderMap, HeaderName, HeaderValue, Request};
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

use crate::resilience::Deadline;

/// Header carrying the request correlation ID.
pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Header carrying the caller's remaining budget in milliseconds.
pub const X_REQUEST_TIMEOUT_MS: HeaderName = HeaderName::from_static("x-request-timeout-ms");

/// Generates UUID v4 request IDs.
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeRequestUuid;

impl MakeRequestId for MakeRequestUuid {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let id = Uuid::new_v4().to_string();
        HeaderValue::from_str(&id).ok().map(RequestId::new)
    }
}

/// Request ID of a request, or `"unknown"`.
pub fn request_id(headers: &HeaderMap) -> &str {
    headers
        .get(&X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
}

/// Budget the caller propagated, if present and well formed.
pub fn caller_budget(headers: &HeaderMap) -> Option<Duration> {
    let raw = headers.get(&X_REQUEST_TIMEOUT_MS)?;
    match raw.to_str().ok().and_then(|s| s.trim().parse::<u64>().ok()) {
        Some(ms) if ms > 0 => Some(Duration::from_millis(ms)),
        _ => {
            tracing::warn!(value = ?raw, "Ignoring invalid caller deadline header");
            None
        }
    }
}

/// Root deadline for an inbound request.
pub fn inbound_deadline(headers: &HeaderMap, request_budget: Duration) -> Deadline {
    let budget = match caller_budget(headers) {
        Some(caller) => caller.min(request_budget),
        None => request_budget,
    };
    Deadline::after(budget)
}
