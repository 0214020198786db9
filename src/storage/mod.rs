//! Quote persistence.
//!
//! # Data Flow
//! ```text
//! persist deadline (child of request deadline) + Quote
//!     → store.rs (transaction on the blocking pool, commit claim vs timer)
//!     → one row in `quotes`, or none
//! ```
//!
//! # Design Decisions
//! - Persistence is best-effort: callers log failures and carry on
//! - Single-statement insert inside a transaction; never a partial row

pub mod error;
pub mod store;

pub use error::{StorageError, StorageResult};
pub use store::QuoteStore;
