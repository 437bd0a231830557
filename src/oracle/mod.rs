//! Price oracle abstraction for valuing deposits in USD.

use crate::domain::{OracleHandle, Timestamp};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

pub mod http;
pub mod mock;

pub use http::HttpPriceOracle;
pub use mock::MockPriceOracle;

/// A USD unit price expressed as `price / 10^scale`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceQuote {
    pub price: u128,
    pub scale: u32,
    pub observed_at: Timestamp,
}

impl PriceQuote {
    pub fn new(price: u128, scale: u32, observed_at: Timestamp) -> Self {
        Self {
            price,
            scale,
            observed_at,
        }
    }
}

/// Price feed trait.
///
/// Implementations report the latest observation as-is; freshness is judged by
/// [`OracleAdapter`]. Implementations must not retry internally.
#[async_trait]
pub trait PriceOracle: Send + Sync + fmt::Debug {
    /// Latest observation for a feed.
    ///
    /// # Arguments
    /// * `handle` - Feed identifier registered on the asset
    async fn latest_price(&self, handle: &OracleHandle) -> Result<PriceQuote, OracleError>;
}

/// Error type for oracle operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OracleError {
    /// Network error (e.g., connection timeout, DNS failure)
    NetworkError(String),
    /// HTTP error returned by the feed
    HttpError { status: u16, message: String },
    /// Invalid JSON or malformed response
    ParseError(String),
    /// The feed has no entry for this handle
    UnknownFeed(OracleHandle),
    /// The feed reported a zero price
    InvalidPrice(OracleHandle),
    /// The latest observation is older than the staleness threshold
    Stale {
        handle: OracleHandle,
        age_secs: u64,
        max_staleness_secs: u64,
    },
}

impl fmt::Display for OracleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OracleError::NetworkError(msg) => write!(f, "Network error: {}", msg),
            OracleError::HttpError { status, message } => {
                write!(f, "HTTP error {}: {}", status, message)
            }
            OracleError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            OracleError::UnknownFeed(handle) => write!(f, "Unknown price feed: {}", handle),
            OracleError::InvalidPrice(handle) => write!(f, "Zero price reported by {}", handle),
            OracleError::Stale {
                handle,
                age_secs,
                max_staleness_secs,
            } => write!(
                f,
                "Stale price from {}: {}s old (max {}s)",
                handle, age_secs, max_staleness_secs
            ),
        }
    }
}

impl std::error::Error for OracleError {}

/// Wraps a feed with the staleness rule.
///
/// Every call goes to the feed; quotes are never cached across calls.
#[derive(Debug, Clone)]
pub struct OracleAdapter {
    feed: Arc<dyn PriceOracle>,
    max_staleness_secs: u64,
}

impl OracleAdapter {
    pub fn new(feed: Arc<dyn PriceOracle>, max_staleness_secs: u64) -> Self {
        Self {
            feed,
            max_staleness_secs,
        }
    }

    pub fn max_staleness_secs(&self) -> u64 {
        self.max_staleness_secs
    }

    /// Fresh price for `handle` as of `now`.
    ///
    /// # Errors
    /// Fails on any feed error, a zero price, or an observation older than
    /// the staleness threshold.
    pub async fn price_of(
        &self,
        handle: &OracleHandle,
        now: Timestamp,
    ) -> Result<PriceQuote, OracleError> {
        let quote = self.feed.latest_price(handle).await?;
        if quote.price == 0 {
            return Err(OracleError::InvalidPrice(handle.clone()));
        }
        let age_secs = now.seconds_since(quote.observed_at);
        if age_secs > self.max_staleness_secs {
            return Err(OracleError::Stale {
                handle: handle.clone(),
                age_secs,
                max_staleness_secs: self.max_staleness_secs,
            });
        }
        Ok(quote)
    }
}
