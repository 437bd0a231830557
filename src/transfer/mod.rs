//! Asset transfer collaborator: moves principal between users and the pool.

use crate::domain::{Address, AssetKind};
use async_trait::async_trait;
use std::fmt;
use thiserror::Error;

pub mod memory;

pub use memory::InMemoryCustody;

/// Moves native coin or fungible tokens in and out of pool custody.
///
/// The ledger hands over the [`AssetKind`] resolved from the registry; this is
/// the only place the native/fungible distinction is acted on.
#[async_trait]
pub trait AssetTransfer: Send + Sync + fmt::Debug {
    /// Move `amount` from `from` into pool custody.
    async fn pull(&self, from: &Address, asset: &AssetKind, amount: u128) -> Result<(), TransferError>;

    /// Move `amount` from pool custody to `to`.
    async fn push(&self, to: &Address, asset: &AssetKind, amount: u128) -> Result<(), TransferError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransferError {
    #[error("insufficient {asset} balance for {account}: have {available}, need {requested}")]
    InsufficientFunds {
        account: String,
        asset: &'static str,
        available: u128,
        requested: u128,
    },
    #[error("transfer rejected: {0}")]
    Rejected(String),
}
