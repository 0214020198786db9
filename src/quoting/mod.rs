//! Quote request orchestration.
//!
//! # State Machine
//! ```text
//! Start → Fetching → Fetched    → Persisting → Responding → Done
//!                  → FetchFailed ────────────→ Responding (504) → Done
//! ```
//! Persisting always moves on to Responding, whatever the write outcome.

pub mod engine;
pub mod types;

pub use engine::{Budgets, Persisted, QuoteEngine, Served};
pub use types::{BidResponse, Quote, StoredQuote};
