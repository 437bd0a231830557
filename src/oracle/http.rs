//! HTTP price feed client.

use super::{OracleError, PriceOracle, PriceQuote};
use crate::domain::{OracleHandle, Timestamp};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

/// Per-request ceiling; a slow feed fails the operation instead of stalling it.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Price feed served over HTTP.
///
/// `GET {base_url}/prices/{handle}` must answer
/// `{"price": "<integer>", "scale": <u32>, "observedAt": <unix seconds>}`;
/// `price` may also be a JSON integer.
#[derive(Debug, Clone)]
pub struct HttpPriceOracle {
    client: Client,
    base_url: String,
}

impl HttpPriceOracle {
    /// Create a new HTTP price feed client.
    pub fn new(base_url: String) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl PriceOracle for HttpPriceOracle {
    async fn latest_price(&self, handle: &OracleHandle) -> Result<PriceQuote, OracleError> {
        let url = format!("{}/prices/{}", self.base_url, handle.as_str());
        debug!("Fetching price for handle={} from {}", handle, url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| OracleError::NetworkError(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(OracleError::UnknownFeed(handle.clone()));
        }
        if !status.is_success() {
            return Err(OracleError::HttpError {
                status: status.as_u16(),
                message: status
                    .canonical_reason()
                    .unwrap_or("Unexpected status")
                    .to_string(),
            });
        }

        let body = response
            .json::<serde_json::Value>()
            .await
            .map_err(|e| OracleError::ParseError(e.to_string()))?;

        parse_quote(&body)
    }
}

fn parse_quote(json: &serde_json::Value) -> Result<PriceQuote, OracleError> {
    let price = match json.get("price") {
        Some(serde_json::Value::String(s)) => s
            .parse::<u128>()
            .map_err(|_| OracleError::ParseError(format!("invalid price: {}", s)))?,
        Some(serde_json::Value::Number(n)) => n
            .as_u64()
            .map(u128::from)
            .ok_or_else(|| OracleError::ParseError(format!("invalid price: {}", n)))?,
        _ => return Err(OracleError::ParseError("missing price".to_string())),
    };

    let scale = json
        .get("scale")
        .and_then(|v| v.as_u64())
        .and_then(|v| u32::try_from(v).ok())
        .ok_or_else(|| OracleError::ParseError("missing or invalid scale".to_string()))?;

    let observed_at = json
        .get("observedAt")
        .and_then(|v| v.as_i64())
        .ok_or_else(|| OracleError::ParseError("missing or invalid observedAt".to_string()))?;

    Ok(PriceQuote::new(price, scale, Timestamp::new(observed_at)))
}
