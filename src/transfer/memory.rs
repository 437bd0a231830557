//! In-process custody bookkeeping for local runs and tests.

use super::{AssetTransfer, TransferError};
use crate::domain::{Address, AssetKind};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Debug, Default)]
struct Balances {
    wallets: HashMap<(Address, AssetKind), u128>,
    custody: HashMap<AssetKind, u128>,
}

/// Custody ledger kept in memory.
///
/// In strict mode a pull needs a funded wallet; in open mode wallets are
/// treated as bottomless, which suits a local node without real balances.
/// Clones share state.
#[derive(Debug, Clone)]
pub struct InMemoryCustody {
    balances: Arc<Mutex<Balances>>,
    strict: bool,
    failing: Arc<AtomicBool>,
}

impl InMemoryCustody {
    /// Strict custody: pulls are limited by funded wallet balances.
    pub fn new() -> Self {
        Self {
            balances: Arc::new(Mutex::new(Balances::default())),
            strict: true,
            failing: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Open custody: pulls always succeed.
    pub fn open() -> Self {
        Self {
            strict: false,
            ..Self::new()
        }
    }

    /// Credit a user's wallet.
    pub fn fund(&self, owner: &Address, asset: &AssetKind, amount: u128) {
        let mut balances = self.balances.lock().unwrap_or_else(|e| e.into_inner());
        let entry = balances
            .wallets
            .entry((owner.clone(), asset.clone()))
            .or_insert(0);
        *entry = entry.saturating_add(amount);
    }

    /// Make every transfer fail until switched back.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn wallet_balance(&self, owner: &Address, asset: &AssetKind) -> u128 {
        let balances = self.balances.lock().unwrap_or_else(|e| e.into_inner());
        balances
            .wallets
            .get(&(owner.clone(), asset.clone()))
            .copied()
            .unwrap_or(0)
    }

    pub fn custody_balance(&self, asset: &AssetKind) -> u128 {
        let balances = self.balances.lock().unwrap_or_else(|e| e.into_inner());
        balances.custody.get(asset).copied().unwrap_or(0)
    }

    fn check_failing(&self) -> Result<(), TransferError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(TransferError::Rejected("transfers disabled".to_string()));
        }
        Ok(())
    }
}

impl Default for InMemoryCustody {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AssetTransfer for InMemoryCustody {
    async fn pull(&self, from: &Address, asset: &AssetKind, amount: u128) -> Result<(), TransferError> {
        self.check_failing()?;
        let mut balances = self.balances.lock().unwrap_or_else(|e| e.into_inner());

        if self.strict {
            let wallet = balances
                .wallets
                .entry((from.clone(), asset.clone()))
                .or_insert(0);
            if *wallet < amount {
                return Err(TransferError::InsufficientFunds {
                    account: from.to_string(),
                    asset: asset.label(),
                    available: *wallet,
                    requested: amount,
                });
            }
            *wallet -= amount;
        }

        let custody = balances.custody.entry(asset.clone()).or_insert(0);
        *custody = custody.saturating_add(amount);
        Ok(())
    }

    async fn push(&self, to: &Address, asset: &AssetKind, amount: u128) -> Result<(), TransferError> {
        self.check_failing()?;
        let mut balances = self.balances.lock().unwrap_or_else(|e| e.into_inner());

        let custody = balances.custody.entry(asset.clone()).or_insert(0);
        if *custody < amount {
            return Err(TransferError::InsufficientFunds {
                account: "pool".to_string(),
                asset: asset.label(),
                available: *custody,
                requested: amount,
            });
        }
        *custody -= amount;

        let wallet = balances
            .wallets
            .entry((to.clone(), asset.clone()))
            .or_insert(0);
        *wallet = wallet.saturating_add(amount);
        Ok(())
    }
}
