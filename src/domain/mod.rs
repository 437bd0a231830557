//! Domain types for the staking ledger.
//!
//! This module provides:
//! - Domain primitives: Timestamp, Address, AssetId, OracleHandle
//! - Asset metadata and fixed-point reward rates
//! - Position records and ledger events
//! - Decimal conversion at the human-facing edge

pub mod asset;
pub mod decimal;
pub mod event;
pub mod position;
pub mod primitives;

pub use asset::{AssetDescriptor, AssetKind, RewardRate, MAX_ASSET_DECIMALS};
pub use decimal::{format_scaled, Decimal};
pub use event::{EventKind, LedgerEvent};
pub use position::{Position, PositionKey, PositionStatus, Valuation};
pub use primitives::{
    Address, AddressParseError, AssetId, OracleHandle, Timestamp, SECONDS_PER_DAY,
};
