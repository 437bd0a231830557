//! Reward token ledger boundary and reward settlement.

use crate::domain::Address;
use async_trait::async_trait;
use std::fmt;
use thiserror::Error;

pub mod memory;
pub mod settlement;

pub use memory::InMemoryRewardToken;
pub use settlement::{Reservation, RewardSettlement, RewardState, SettlementError, SettlementStrategy};

/// Balance/mint/transfer primitive of the reward token.
///
/// Consumed by [`RewardSettlement`] only.
#[async_trait]
pub trait RewardTokenLedger: Send + Sync + fmt::Debug {
    /// Create `amount` new units for `to`.
    async fn mint(&self, to: &Address, amount: u128) -> Result<(), RewardLedgerError>;

    /// Move `amount` existing units from `from` to `to`.
    async fn transfer(&self, from: &Address, to: &Address, amount: u128) -> Result<(), RewardLedgerError>;

    async fn balance_of(&self, who: &Address) -> Result<u128, RewardLedgerError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RewardLedgerError {
    #[error("insufficient reward balance for {account}: have {available}, need {requested}")]
    InsufficientBalance {
        account: String,
        available: u128,
        requested: u128,
    },
    #[error("reward supply overflow")]
    SupplyOverflow,
    #[error("reward token rejected the call: {0}")]
    Rejected(String),
}
