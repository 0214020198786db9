//! Third-party quote API integration.
//!
//! # Data Flow
//! ```text
//! fetch deadline (child of request deadline)
//!     → client.rs (GET, status check, body read under deadline)
//!     → types.rs (decode pair object, extract bid)
//!     → Quote { bid, obtained_at }
//! ```

pub mod client;
pub mod types;

pub use client::QuoteFetcher;
pub use types::{PairQuote, UpstreamError, UpstreamResult};
