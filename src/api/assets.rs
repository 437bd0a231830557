use crate::api::{parse_asset, AppState};
use crate::domain::{AssetDescriptor, AssetKind, OracleHandle, RewardRate};
use crate::error::AppError;
use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetDto {
    pub asset_id: String,
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    pub decimals: u8,
    pub symbol: String,
    pub oracle: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reward_rate: Option<String>,
    pub disabled: bool,
    pub registered_at: i64,
}

impl From<AssetDescriptor> for AssetDto {
    fn from(d: AssetDescriptor) -> Self {
        let token = match &d.kind {
            AssetKind::Native => None,
            AssetKind::Fungible(addr) => Some(addr.to_string()),
        };
        AssetDto {
            asset_id: d.asset_id.to_string(),
            kind: d.kind.label().to_string(),
            token,
            decimals: d.decimals,
            symbol: d.symbol,
            oracle: d.oracle.to_string(),
            reward_rate: d.reward_rate.map(|r| r.to_canonical_string()),
            disabled: d.disabled,
            registered_at: d.registered_at.as_secs(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetsResponse {
    pub assets: Vec<AssetDto>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterAssetRequest {
    pub caller: String,
    pub asset_id: String,
    pub decimals: u8,
    pub symbol: String,
    pub oracle: String,
    pub reward_rate: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RebindOracleRequest {
    pub caller: String,
    pub oracle: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetDisabledRequest {
    pub caller: String,
    pub disabled: bool,
}

pub async fn list_assets(State(state): State<AppState>) -> Result<Json<AssetsResponse>, AppError> {
    let assets = state.registry.list().await?;
    Ok(Json(AssetsResponse {
        assets: assets.into_iter().map(AssetDto::from).collect(),
    }))
}

pub async fn get_asset(
    Path(asset_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<AssetDto>, AppError> {
    let asset_id = parse_asset(&asset_id)?;
    Ok(Json(state.registry.resolve(&asset_id).await?.into()))
}

pub async fn register_asset(
    State(state): State<AppState>,
    Json(body): Json<RegisterAssetRequest>,
) -> Result<Json<AssetDto>, AppError> {
    let ctx = state.call_context(&body.caller)?;
    let asset_id = parse_asset(&body.asset_id)?;

    let mut descriptor = AssetDescriptor::new(
        asset_id,
        body.decimals,
        body.symbol,
        OracleHandle::new(body.oracle),
        ctx.now,
    );
    if let Some(raw) = body.reward_rate.as_deref() {
        let rate = RewardRate::parse(raw)
            .ok_or_else(|| AppError::BadRequest("Invalid rewardRate".into()))?;
        descriptor = descriptor.with_reward_rate(rate);
    }

    let stored = state.registry.register(&ctx, descriptor).await?;
    Ok(Json(stored.into()))
}

pub async fn rebind_oracle(
    Path(asset_id): Path<String>,
    State(state): State<AppState>,
    Json(body): Json<RebindOracleRequest>,
) -> Result<Json<AssetDto>, AppError> {
    let ctx = state.call_context(&body.caller)?;
    let asset_id = parse_asset(&asset_id)?;
    let updated = state
        .registry
        .rebind_oracle(&ctx, &asset_id, OracleHandle::new(body.oracle))
        .await?;
    Ok(Json(updated.into()))
}

pub async fn set_disabled(
    Path(asset_id): Path<String>,
    State(state): State<AppState>,
    Json(body): Json<SetDisabledRequest>,
) -> Result<Json<AssetDto>, AppError> {
    let ctx = state.call_context(&body.caller)?;
    let asset_id = parse_asset(&asset_id)?;
    let updated = state
        .registry
        .set_disabled(&ctx, &asset_id, body.disabled)
        .await?;
    Ok(Json(updated.into()))
}
