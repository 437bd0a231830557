pub mod api;
pub mod config;
pub mod db;
pub mod domain;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod oracle;
pub mod rewards;
pub mod transfer;

pub use config::Config;
pub use db::{init_db, Repository};
pub use domain::{
    Address, AssetDescriptor, AssetId, AssetKind, Decimal, OracleHandle, Position, PositionKey,
    RewardRate, Timestamp,
};
pub use error::AppError;
pub use ledger::{AdminGate, AssetRegistry, CallContext, LedgerError, PositionLedger};
pub use oracle::{HttpPriceOracle, MockPriceOracle, OracleAdapter, PriceOracle};
pub use rewards::{InMemoryRewardToken, RewardSettlement, RewardTokenLedger, SettlementStrategy};
pub use transfer::{AssetTransfer, InMemoryCustody};
