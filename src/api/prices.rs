use crate::api::{parse_asset, AppState};
use crate::domain::format_scaled;
use crate::error::AppError;
use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceResponse {
    pub asset: String,
    pub price: String,
    pub scale: u32,
    pub price_display: String,
    pub observed_at: i64,
}

pub async fn get_price(
    Path(asset_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<PriceResponse>, AppError> {
    let asset = parse_asset(&asset_id)?;
    let quote = state
        .ledger
        .get_token_price(&asset, state.clock.now())
        .await?;
    Ok(Json(PriceResponse {
        asset: asset.to_string(),
        price: quote.price.to_string(),
        scale: quote.scale,
        price_display: format_scaled(quote.price, quote.scale),
        observed_at: quote.observed_at.as_secs(),
    }))
}
