pub mod admin;
pub mod assets;
pub mod events;
pub mod health;
pub mod positions;
pub mod prices;
pub mod rewards;
pub mod staking;

use crate::config::Config;
use crate::domain::{Address, AssetId, Timestamp};
use crate::error::AppError;
use crate::ledger::{AdminGate, AssetRegistry, CallContext, PositionLedger};
use axum::{
    routing::{get, post},
    Router,
};
use std::str::FromStr;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

/// Source of "now" for request handling.
///
/// `manual` clocks only move when advanced, for deterministic tests.
#[derive(Debug, Clone, Default)]
pub struct Clock(Option<Arc<AtomicI64>>);

impl Clock {
    pub fn system() -> Self {
        Clock(None)
    }

    pub fn manual(start: Timestamp) -> Self {
        Clock(Some(Arc::new(AtomicI64::new(start.as_secs()))))
    }

    pub fn now(&self) -> Timestamp {
        match &self.0 {
            Some(secs) => Timestamp::new(secs.load(Ordering::SeqCst)),
            None => Timestamp::now(),
        }
    }

    /// Move a manual clock forward. No-op on the system clock.
    pub fn advance(&self, secs: i64) {
        if let Some(current) = &self.0 {
            current.fetch_add(secs, Ordering::SeqCst);
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<PositionLedger>,
    pub registry: Arc<AssetRegistry>,
    pub admin: Arc<AdminGate>,
    pub config: Config,
    pub clock: Clock,
}

impl AppState {
    pub fn new(
        ledger: Arc<PositionLedger>,
        registry: Arc<AssetRegistry>,
        admin: Arc<AdminGate>,
        config: Config,
    ) -> Self {
        Self {
            ledger,
            registry,
            admin,
            config,
            clock: Clock::system(),
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    fn call_context(&self, caller: &str) -> Result<CallContext, AppError> {
        Ok(CallContext::new(parse_address(caller, "caller")?, self.clock.now()))
    }
}

pub(crate) fn parse_address(raw: &str, field: &str) -> Result<Address, AppError> {
    Address::from_str(raw).map_err(|_| AppError::BadRequest(format!("Invalid {} address", field)))
}

pub(crate) fn parse_asset(raw: &str) -> Result<AssetId, AppError> {
    AssetId::from_str(raw).map_err(|_| AppError::BadRequest("Invalid asset id".into()))
}

/// Integer amounts travel as decimal strings of raw units.
pub(crate) fn parse_units(raw: &str, field: &str) -> Result<u128, AppError> {
    raw.trim()
        .parse::<u128>()
        .map_err(|_| AppError::BadRequest(format!("{} must be a non-negative integer string", field)))
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .route("/v1/assets", get(assets::list_assets))
        .route("/v1/assets/:asset_id", get(assets::get_asset))
        .route("/v1/prices/:asset_id", get(prices::get_price))
        .route("/v1/admin", get(admin::get_status))
        .route("/v1/admin/assets", post(assets::register_asset))
        .route("/v1/admin/assets/:asset_id/oracle", post(assets::rebind_oracle))
        .route("/v1/admin/assets/:asset_id/disabled", post(assets::set_disabled))
        .route("/v1/admin/pause", post(admin::pause))
        .route("/v1/admin/unpause", post(admin::unpause))
        .route("/v1/admin/owner", post(admin::transfer_ownership))
        .route("/v1/deposit", post(staking::deposit))
        .route("/v1/withdraw", post(staking::withdraw))
        .route("/v1/claim", post(staking::claim))
        .route("/v1/rewards/update", post(staking::update_reward))
        .route("/v1/positions", get(positions::get_position))
        .route("/v1/positions/all", get(positions::get_user_positions))
        .route("/v1/rewards", get(rewards::get_reward))
        .route("/v1/rewards/settled", get(rewards::get_settled))
        .route("/v1/events", get(events::get_events))
        .layer(cors)
        .with_state(state)
}
