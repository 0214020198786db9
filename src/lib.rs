//! Deadline-propagating currency quote relay.
//!
//! ```text
//!  quote-client ──GET /cotacao──▶ http ──▶ quoting engine ──▶ upstream API
//!   (300ms)       x-request-timeout-ms        │  (fetch: min(200ms, parent))
//!                                             ▼
//!                                          storage
//!                                   (persist: min(10ms, parent), best-effort)
//! ```

pub mod client;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod quoting;
pub mod resilience;
pub mod storage;
pub mod upstream;

pub use config::{ClientConfig, ServerConfig};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use quoting::QuoteEngine;
