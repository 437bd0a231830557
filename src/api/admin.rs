use crate::api::{parse_address, AppState};
use crate::error::AppError;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminRequest {
    pub caller: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferOwnershipRequest {
    pub caller: String,
    pub new_owner: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminStatus {
    pub owner: String,
    pub paused: bool,
}

fn status(state: &AppState) -> AdminStatus {
    AdminStatus {
        owner: state.admin.owner().to_string(),
        paused: state.admin.is_paused(),
    }
}

pub async fn get_status(State(state): State<AppState>) -> Json<AdminStatus> {
    Json(status(&state))
}

pub async fn pause(
    State(state): State<AppState>,
    Json(body): Json<AdminRequest>,
) -> Result<Json<AdminStatus>, AppError> {
    let ctx = state.call_context(&body.caller)?;
    state.admin.pause(&ctx)?;
    Ok(Json(status(&state)))
}

pub async fn unpause(
    State(state): State<AppState>,
    Json(body): Json<AdminRequest>,
) -> Result<Json<AdminStatus>, AppError> {
    let ctx = state.call_context(&body.caller)?;
    state.admin.unpause(&ctx)?;
    Ok(Json(status(&state)))
}

pub async fn transfer_ownership(
    State(state): State<AppState>,
    Json(body): Json<TransferOwnershipRequest>,
) -> Result<Json<AdminStatus>, AppError> {
    let ctx = state.call_context(&body.caller)?;
    let new_owner = parse_address(&body.new_owner, "newOwner")?;
    state.admin.transfer_ownership(&ctx, new_owner)?;
    Ok(Json(status(&state)))
}
