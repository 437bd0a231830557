//! Staking ledger services.
//!
//! This module provides:
//! - `AdminGate`: owner checks, pause switch, ownership transfer
//! - `AssetRegistry`: registered asset metadata
//! - `PositionLedger`: deposits, withdrawals, reward accrual and claims

pub mod admin;
pub mod position_ledger;
pub mod registry;

pub use admin::AdminGate;
pub use position_ledger::{LedgerReceipt, LedgerSettings, PositionLedger, PositionView};
pub use registry::AssetRegistry;

use crate::domain::{Address, AssetId, Timestamp};
use crate::engine::AccrualError;
use crate::oracle::OracleError;
use crate::rewards::SettlementError;
use crate::transfer::TransferError;
use thiserror::Error;

/// Who is calling and when. Passed to every mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallContext {
    pub caller: Address,
    pub now: Timestamp,
}

impl CallContext {
    pub fn new(caller: Address, now: Timestamp) -> Self {
        Self { caller, now }
    }

    /// Context stamped with the wall clock.
    pub fn at_now(caller: Address) -> Self {
        Self::new(caller, Timestamp::now())
    }
}

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("unknown asset: {0}")]
    UnknownAsset(AssetId),
    #[error("asset already registered: {0}")]
    AlreadyRegistered(AssetId),
    #[error("caller {0} is not the ledger owner")]
    NotAuthorized(Address),
    #[error("insufficient position: requested {requested}, staked {available}")]
    InsufficientPosition { requested: u128, available: u128 },
    #[error("price oracle unavailable: {0}")]
    OracleUnavailable(#[from] OracleError),
    #[error("nothing to claim")]
    NothingToClaim,
    #[error("reward settlement failed: {0}")]
    SettlementFailed(String),
    #[error("amount must be greater than zero")]
    InvalidAmount,
    #[error("invalid asset: {0}")]
    InvalidAsset(String),
    #[error("invalid address: {0}")]
    InvalidAddress(String),
    #[error("deposits are disabled for asset {0}")]
    AssetDisabled(AssetId),
    #[error("ledger is paused")]
    Paused,
    #[error("asset transfer failed: {0}")]
    TransferFailed(#[from] TransferError),
    #[error("arithmetic overflow")]
    Overflow,
    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),
}

impl LedgerError {
    /// Stable machine-readable tag for the error.
    pub fn kind(&self) -> &'static str {
        match self {
            LedgerError::UnknownAsset(_) => "unknown_asset",
            LedgerError::AlreadyRegistered(_) => "already_registered",
            LedgerError::NotAuthorized(_) => "not_authorized",
            LedgerError::InsufficientPosition { .. } => "insufficient_position",
            LedgerError::OracleUnavailable(_) => "oracle_unavailable",
            LedgerError::NothingToClaim => "nothing_to_claim",
            LedgerError::SettlementFailed(_) => "settlement_failed",
            LedgerError::InvalidAmount => "invalid_amount",
            LedgerError::InvalidAsset(_) => "invalid_asset",
            LedgerError::InvalidAddress(_) => "invalid_address",
            LedgerError::AssetDisabled(_) => "asset_disabled",
            LedgerError::Paused => "paused",
            LedgerError::TransferFailed(_) => "transfer_failed",
            LedgerError::Overflow => "overflow",
            LedgerError::Storage(_) => "storage",
        }
    }
}

impl From<AccrualError> for LedgerError {
    fn from(_: AccrualError) -> Self {
        LedgerError::Overflow
    }
}

impl From<SettlementError> for LedgerError {
    fn from(err: SettlementError) -> Self {
        match err {
            SettlementError::Storage(e) => LedgerError::Storage(e),
            SettlementError::Overflow => LedgerError::Overflow,
            other => LedgerError::SettlementFailed(other.to_string()),
        }
    }
}
