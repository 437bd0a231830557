use crate::api::{parse_address, parse_asset, AppState};
use crate::domain::format_scaled;
use crate::error::AppError;
use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardQuery {
    pub user: String,
    pub asset: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettledQuery {
    pub user: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardResponse {
    pub user: String,
    pub asset: String,
    pub reward: String,
    pub reward_display: String,
    pub as_of: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettledEntryDto {
    pub asset: String,
    pub total_settled: String,
    pub last_settled_at: i64,
    pub settlement_count: i64,
    pub pending_payout: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettledResponse {
    pub user: String,
    pub total_settled: String,
    pub total_settled_display: String,
    pub global_settled: String,
    pub balance: String,
    pub entries: Vec<SettledEntryDto>,
}

/// Reward a claim would settle right now.
pub async fn get_reward(
    Query(params): Query<RewardQuery>,
    State(state): State<AppState>,
) -> Result<Json<RewardResponse>, AppError> {
    let user = parse_address(&params.user, "user")?;
    let asset = parse_asset(&params.asset)?;
    let now = state.clock.now();

    let reward = state.ledger.get_updated_reward(&user, &asset, now).await?;
    Ok(Json(RewardResponse {
        user: user.to_string(),
        asset: asset.to_string(),
        reward: reward.to_string(),
        reward_display: format_scaled(reward, state.ledger.settings().reward_decimals),
        as_of: now.as_secs(),
    }))
}

pub async fn get_settled(
    Query(params): Query<SettledQuery>,
    State(state): State<AppState>,
) -> Result<Json<SettledResponse>, AppError> {
    let user = parse_address(&params.user, "user")?;

    let (states, total) = state.ledger.settled_rewards(&user).await?;
    let global = state.ledger.global_settled_total().await?;
    let balance = state
        .ledger
        .settlement()
        .balance_of(&user)
        .await
        .map_err(|e| AppError::Internal(format!("Reward balance query failed: {}", e)))?;

    Ok(Json(SettledResponse {
        user: user.to_string(),
        total_settled: total.to_string(),
        total_settled_display: format_scaled(total, state.ledger.settings().reward_decimals),
        global_settled: global.to_string(),
        balance: balance.to_string(),
        entries: states
            .into_iter()
            .map(|s| SettledEntryDto {
                asset: s.key.asset_id.to_string(),
                total_settled: s.total_settled.to_string(),
                last_settled_at: s.last_settled_at.as_secs(),
                settlement_count: s.settlement_count,
                pending_payout: s.pending_payout.to_string(),
            })
            .collect(),
    }))
}
