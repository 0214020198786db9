//! Orchestration of one quote request: fetch, then best-effort persist.

use std::time::Duration;

use crate::config::TimeoutConfig;
use crate::quoting::types::Quote;
use crate::resilience::Deadline;
use crate::storage::{QuoteStore, StorageError};
use crate::upstream::{QuoteFetcher, UpstreamError};

/// Budgets for the two inner operations of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Budgets {
    pub fetch: Duration,
    pub persist: Duration,
}

impl From<&TimeoutConfig> for Budgets {
    fn from(config: &TimeoutConfig) -> Self {
        Self {
            fetch: config.fetch(),
            persist: config.persist(),
        }
    }
}

/// What happened to the storage write of a served quote.
#[derive(Debug)]
pub enum Persisted {
    Stored { id: i64 },
    Failed(StorageError),
}

impl Persisted {
    pub fn is_stored(&self) -> bool {
        matches!(self, Persisted::Stored { .. })
    }
}

/// A quote ready to be returned to the caller.
#[derive(Debug)]
pub struct Served {
    pub quote: Quote,
    pub persisted: Persisted,
}

/// Fetches quotes and records them.
///
/// Holds only immutable handles; safe to share across request tasks.
#[derive(Clone)]
pub struct QuoteEngine {
    fetcher: QuoteFetcher,
    store: QuoteStore,
    budgets: Budgets,
}

impl QuoteEngine {
    pub fn new(fetcher: QuoteFetcher, store: QuoteStore, budgets: Budgets) -> Self {
        Self {
            fetcher,
            store,
            budgets,
        }
    }

    /// Run one request under `parent`.
    ///
    /// A fetch failure ends the request before any write is attempted. A
    /// write failure is logged and reported in [`Served::persisted`] but
    /// never turns the request into an error.
    pub async fn quote(&self, parent: Deadline) -> Result<Served, UpstreamError> {
        let fetch_deadline = parent.child(self.budgets.fetch);
        tracing::debug!(
            budget_ms = fetch_deadline.budget().as_millis() as u64,
            parent_remaining_ms = parent.remaining().as_millis() as u64,
            "Fetching quote"
        );

        let quote = self.fetcher.fetch_bid(fetch_deadline).await?;

        // Derived after the fetch, from what is left of the parent.
        let persist_deadline = parent.child(self.budgets.persist);
        let persisted = match self.store.insert(persist_deadline, &quote).await {
            Ok(id) => {
                tracing::debug!(id, bid = %quote.bid, "Quote persisted");
                Persisted::Stored { id }
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    budget_ms = persist_deadline.budget().as_millis() as u64,
                    "Failed to persist quote"
                );
                Persisted::Failed(e)
            }
        };

        Ok(Served { quote, persisted })
    }
}
