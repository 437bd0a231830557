use crate::api::positions::PositionDto;
use crate::api::{parse_address, parse_asset, parse_units, AppState};
use crate::domain::format_scaled;
use crate::error::AppError;
use crate::ledger::LedgerReceipt;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StakeRequest {
    pub caller: String,
    pub asset: String,
    /// Raw asset units as a decimal integer string.
    pub amount: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimRequest {
    pub caller: String,
    pub asset: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRewardRequest {
    pub caller: String,
    /// Position owner; defaults to the caller.
    pub user: Option<String>,
    pub asset: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptDto {
    pub seq: i64,
    pub amount: String,
    pub amount_display: String,
    pub position: PositionDto,
}

impl ReceiptDto {
    /// `amount_scale` is the asset's decimals for principal moves and the
    /// reward decimals for claims.
    fn new(receipt: &LedgerReceipt, amount_scale: u32, reward_decimals: u32) -> Self {
        ReceiptDto {
            seq: receipt.seq,
            amount: receipt.amount.to_string(),
            amount_display: format_scaled(receipt.amount, amount_scale),
            position: PositionDto::from_position(&receipt.position, reward_decimals),
        }
    }
}

pub async fn deposit(
    State(state): State<AppState>,
    Json(body): Json<StakeRequest>,
) -> Result<Json<ReceiptDto>, AppError> {
    let ctx = state.call_context(&body.caller)?;
    let asset = parse_asset(&body.asset)?;
    let amount = parse_units(&body.amount, "amount")?;

    let receipt = state.ledger.deposit(&ctx, &asset, amount).await?;
    let reward_decimals = state.ledger.settings().reward_decimals;
    Ok(Json(ReceiptDto::new(
        &receipt,
        receipt.position.decimals as u32,
        reward_decimals,
    )))
}

pub async fn withdraw(
    State(state): State<AppState>,
    Json(body): Json<StakeRequest>,
) -> Result<Json<ReceiptDto>, AppError> {
    let ctx = state.call_context(&body.caller)?;
    let asset = parse_asset(&body.asset)?;
    let amount = parse_units(&body.amount, "amount")?;

    let receipt = state.ledger.withdraw(&ctx, &asset, amount).await?;
    let reward_decimals = state.ledger.settings().reward_decimals;
    Ok(Json(ReceiptDto::new(
        &receipt,
        receipt.position.decimals as u32,
        reward_decimals,
    )))
}

pub async fn claim(
    State(state): State<AppState>,
    Json(body): Json<ClaimRequest>,
) -> Result<Json<ReceiptDto>, AppError> {
    let ctx = state.call_context(&body.caller)?;
    let asset = parse_asset(&body.asset)?;

    let receipt = state.ledger.claim_reward(&ctx, &asset).await?;
    let reward_decimals = state.ledger.settings().reward_decimals;
    Ok(Json(ReceiptDto::new(&receipt, reward_decimals, reward_decimals)))
}

pub async fn update_reward(
    State(state): State<AppState>,
    Json(body): Json<UpdateRewardRequest>,
) -> Result<Json<PositionDto>, AppError> {
    let ctx = state.call_context(&body.caller)?;
    let owner = match body.user.as_deref() {
        Some(raw) => parse_address(raw, "user")?,
        None => ctx.caller.clone(),
    };
    let asset = parse_asset(&body.asset)?;

    let position = state.ledger.update_reward(&ctx, &owner, &asset).await?;
    Ok(Json(PositionDto::from_position(
        &position,
        state.ledger.settings().reward_decimals,
    )))
}
