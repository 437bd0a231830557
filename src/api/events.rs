use crate::api::{parse_address, AppState};
use crate::domain::LedgerEvent;
use crate::error::AppError;
use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventsQuery {
    pub user: String,
    pub from_seq: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDto {
    pub id: String,
    pub seq: i64,
    pub kind: String,
    pub asset: String,
    pub amount: String,
    pub principal_after: String,
    pub price: String,
    pub price_scale: u32,
    pub reward_after: String,
    pub at: i64,
}

impl From<LedgerEvent> for EventDto {
    fn from(e: LedgerEvent) -> Self {
        EventDto {
            id: e.id.to_string(),
            seq: e.seq,
            kind: e.kind.as_str().to_string(),
            asset: e.asset_id.to_string(),
            amount: e.amount.to_string(),
            principal_after: e.principal_after.to_string(),
            price: e.valuation.price.to_string(),
            price_scale: e.valuation.scale,
            reward_after: e.reward_after.to_string(),
            at: e.at.as_secs(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventsResponse {
    pub user: String,
    pub events: Vec<EventDto>,
}

pub async fn get_events(
    Query(params): Query<EventsQuery>,
    State(state): State<AppState>,
) -> Result<Json<EventsResponse>, AppError> {
    let user = parse_address(&params.user, "user")?;
    if matches!(params.from_seq, Some(seq) if seq < 0) {
        return Err(AppError::BadRequest("fromSeq must be >= 0".into()));
    }

    let events = state.ledger.events(&user, params.from_seq).await?;
    Ok(Json(EventsResponse {
        user: user.to_string(),
        events: events.into_iter().map(EventDto::from).collect(),
    }))
}
