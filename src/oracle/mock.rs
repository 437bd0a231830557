//! Mock price feed for testing without network calls.

use super::{OracleError, PriceOracle, PriceQuote};
use crate::domain::{OracleHandle, Timestamp};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Mock feed returning configurable quotes.
///
/// Clones share state, so a test can keep a handle and move prices while the
/// ledger holds another clone.
#[derive(Debug, Clone, Default)]
pub struct MockPriceOracle {
    quotes: Arc<RwLock<HashMap<OracleHandle, PriceQuote>>>,
}

impl MockPriceOracle {
    /// Create a new mock feed with no prices.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a quote to the mock feed.
    pub fn with_price(self, handle: OracleHandle, price: u128, scale: u32, observed_at: Timestamp) -> Self {
        self.set_price(handle, price, scale, observed_at);
        self
    }

    /// Replace the quote for a handle.
    pub fn set_price(&self, handle: OracleHandle, price: u128, scale: u32, observed_at: Timestamp) {
        self.quotes
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(handle, PriceQuote::new(price, scale, observed_at));
    }

    /// Drop the quote for a handle; later lookups fail with `UnknownFeed`.
    pub fn remove_price(&self, handle: &OracleHandle) {
        self.quotes
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(handle);
    }
}

#[async_trait]
impl PriceOracle for MockPriceOracle {
    async fn latest_price(&self, handle: &OracleHandle) -> Result<PriceQuote, OracleError> {
        self.quotes
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(handle)
            .copied()
            .ok_or_else(|| OracleError::UnknownFeed(handle.clone()))
    }
}
