use crate::api::{parse_address, parse_asset, AppState};
use crate::domain::{format_scaled, Position};
use crate::error::AppError;
use crate::ledger::PositionView;
use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionQuery {
    pub user: String,
    pub asset: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPositionsQuery {
    pub user: String,
}

/// Stored position fields. Amounts are raw integer strings with a
/// human-readable `*Display` twin.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionDto {
    pub user: String,
    pub asset: String,
    pub status: String,
    pub principal: String,
    pub principal_display: String,
    pub decimals: u8,
    pub price: String,
    pub price_scale: u32,
    pub price_display: String,
    pub opened_at: i64,
    pub last_accrual_at: i64,
    pub accrued_reward: String,
    pub accrued_reward_display: String,
}

impl PositionDto {
    pub fn from_position(position: &Position, reward_decimals: u32) -> Self {
        PositionDto {
            user: position.owner.to_string(),
            asset: position.asset_id.to_string(),
            status: if position.is_open() { "open" } else { "closed" }.to_string(),
            principal: position.principal.to_string(),
            principal_display: format_scaled(position.principal, position.decimals as u32),
            decimals: position.decimals,
            price: position.valuation.price.to_string(),
            price_scale: position.valuation.scale,
            price_display: format_scaled(position.valuation.price, position.valuation.scale),
            opened_at: position.opened_at.as_secs(),
            last_accrual_at: position.last_accrual_at.as_secs(),
            accrued_reward: position.accrued_reward.to_string(),
            accrued_reward_display: format_scaled(position.accrued_reward, reward_decimals),
        }
    }
}

/// Position projected to the request time.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionViewDto {
    #[serde(flatten)]
    pub position: PositionDto,
    pub reward: String,
    pub reward_display: String,
    pub usd_value: String,
    pub days_staked: u64,
    pub reward_rate: String,
    pub as_of: i64,
}

impl PositionViewDto {
    pub fn from_view(view: &PositionView, reward_decimals: u32) -> Self {
        PositionViewDto {
            position: PositionDto::from_position(&view.position, reward_decimals),
            reward: view.reward.to_string(),
            reward_display: format_scaled(view.reward, reward_decimals),
            usd_value: format_scaled(view.usd_value, view.position.valuation.scale),
            days_staked: view.days_staked,
            reward_rate: view.reward_rate.to_canonical_string(),
            as_of: view.as_of.as_secs(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPositionsResponse {
    pub positions: Vec<PositionViewDto>,
}

pub async fn get_position(
    Query(params): Query<PositionQuery>,
    State(state): State<AppState>,
) -> Result<Json<PositionViewDto>, AppError> {
    let user = parse_address(&params.user, "user")?;
    let asset = parse_asset(&params.asset)?;
    let view = state
        .ledger
        .get_position(&user, &asset, state.clock.now())
        .await?;
    Ok(Json(PositionViewDto::from_view(
        &view,
        state.ledger.settings().reward_decimals,
    )))
}

pub async fn get_user_positions(
    Query(params): Query<UserPositionsQuery>,
    State(state): State<AppState>,
) -> Result<Json<UserPositionsResponse>, AppError> {
    let user = parse_address(&params.user, "user")?;
    let views = state
        .ledger
        .get_user_positions(&user, state.clock.now())
        .await?;
    Ok(Json(UserPositionsResponse {
        positions: views
            .iter()
            .map(|v| PositionViewDto::from_view(v, state.ledger.settings().reward_decimals))
            .collect(),
    }))
}
