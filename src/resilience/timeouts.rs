//! Deadline enforcement.
//!
//! # Responsibilities
//! - Turn a time budget into a point in time at each hop
//! - Derive sub-deadlines that never outlive their parent
//! - Cancel operations cleanly once their own deadline passes
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities (`timeout_at`)
//! - A child deadline is `min(now + budget, parent)`; siblings are independent
//! - Timeout errors are distinct from other errors
//! - Timed-out upstream calls return 504 Gateway Timeout

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;

/// The deadline passed before the wrapped operation completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("deadline of {budget:?} elapsed")]
pub struct Elapsed {
    /// Budget that was granted to the operation.
    pub budget: Duration,
}

/// A point in time after which pending work is abandoned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    at: Instant,
    budget: Duration,
}

impl Deadline {
    /// Root deadline `budget` from now.
    pub fn after(budget: Duration) -> Self {
        Self {
            at: Instant::now() + budget,
            budget,
        }
    }

    /// Derive a sub-deadline for an inner operation.
    ///
    /// The child gets `budget` or whatever is left on `self`, whichever is
    /// shorter.
    pub fn child(&self, budget: Duration) -> Self {
        let now = Instant::now();
        let at = (now + budget).min(self.at);
        Self {
            at,
            budget: at.saturating_duration_since(now),
        }
    }

    /// Instant at which this deadline expires.
    pub fn at(&self) -> Instant {
        self.at
    }

    /// Time granted when the deadline was created.
    pub fn budget(&self) -> Duration {
        self.budget
    }

    /// Time left before expiry, zero once expired.
    pub fn remaining(&self) -> Duration {
        self.at.saturating_duration_since(Instant::now())
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.at
    }

    /// Drive `fut` until it completes or this deadline passes.
    ///
    /// On expiry the future is dropped, which cancels any I/O it owns.
    pub async fn run<F>(&self, fut: F) -> Result<F::Output, Elapsed>
    where
        F: Future,
    {
        tokio::time::timeout_at(self.at, fut)
            .await
            .map_err(|_| Elapsed { budget: self.budget })
    }
}
