//! Quote types shared by the fetcher, the store and the endpoint.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A bid fetched from the upstream API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quote {
    /// Exchange rate as the numeric string the upstream returned.
    pub bid: String,
    /// When the quote was obtained (UTC).
    pub obtained_at: DateTime<Utc>,
}

impl Quote {
    pub fn new(bid: impl Into<String>, obtained_at: DateTime<Utc>) -> Self {
        Self {
            bid: bid.into(),
            obtained_at,
        }
    }
}

/// A quote row read back from storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredQuote {
    pub id: i64,
    pub bid: String,
    pub obtained_at: DateTime<Utc>,
}

/// Body of a successful `/cotacao` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BidResponse {
    pub bid: String,
}

impl From<&Quote> for BidResponse {
    fn from(quote: &Quote) -> Self {
        Self {
            bid: quote.bid.clone(),
        }
    }
}
