//! In-process reward token for local runs and tests.

use super::{RewardLedgerError, RewardTokenLedger};
use crate::domain::Address;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Debug, Default)]
struct TokenBook {
    balances: HashMap<Address, u128>,
    total_supply: u128,
}

/// Fungible reward token kept in memory. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRewardToken {
    book: Arc<Mutex<TokenBook>>,
    failing: Arc<AtomicBool>,
}

impl InMemoryRewardToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-fund an account (e.g. a treasury) outside of settlement.
    pub fn fund(&self, who: &Address, amount: u128) {
        let mut book = self.book.lock().unwrap_or_else(|e| e.into_inner());
        let entry = book.balances.entry(who.clone()).or_insert(0);
        *entry = entry.saturating_add(amount);
        book.total_supply = book.total_supply.saturating_add(amount);
    }

    /// Make every mint/transfer fail until switched back.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn total_supply(&self) -> u128 {
        self.book.lock().unwrap_or_else(|e| e.into_inner()).total_supply
    }

    fn check_failing(&self) -> Result<(), RewardLedgerError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(RewardLedgerError::Rejected("token paused".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl RewardTokenLedger for InMemoryRewardToken {
    async fn mint(&self, to: &Address, amount: u128) -> Result<(), RewardLedgerError> {
        self.check_failing()?;
        let mut book = self.book.lock().unwrap_or_else(|e| e.into_inner());
        let supply = book
            .total_supply
            .checked_add(amount)
            .ok_or(RewardLedgerError::SupplyOverflow)?;
        book.total_supply = supply;
        let entry = book.balances.entry(to.clone()).or_insert(0);
        *entry += amount;
        Ok(())
    }

    async fn transfer(&self, from: &Address, to: &Address, amount: u128) -> Result<(), RewardLedgerError> {
        self.check_failing()?;
        let mut book = self.book.lock().unwrap_or_else(|e| e.into_inner());
        let available = book.balances.get(from).copied().unwrap_or(0);
        if available < amount {
            return Err(RewardLedgerError::InsufficientBalance {
                account: from.to_string(),
                available,
                requested: amount,
            });
        }
        book.balances.insert(from.clone(), available - amount);
        let entry = book.balances.entry(to.clone()).or_insert(0);
        *entry = entry.saturating_add(amount);
        Ok(())
    }

    async fn balance_of(&self, who: &Address) -> Result<u128, RewardLedgerError> {
        let book = self.book.lock().unwrap_or_else(|e| e.into_inner());
        Ok(book.balances.get(who).copied().unwrap_or(0))
    }
}
