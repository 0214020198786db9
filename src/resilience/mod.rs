//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound request:
//!     → timeouts.rs (root deadline from request budget / caller header)
//!     → child deadline for the upstream fetch
//!     → child deadline for the storage write
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every external call has a deadline
//! - No retries: the first failure of a call is terminal for that call

pub mod timeouts;

pub use timeouts::{Deadline, Elapsed};
