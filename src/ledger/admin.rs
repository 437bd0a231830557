//! Owner-restricted controls.

use super::{CallContext, LedgerError};
use crate::domain::Address;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;
use tracing::info;

#[derive(Debug)]
pub struct AdminGate {
    owner: RwLock<Address>,
    paused: AtomicBool,
}

impl AdminGate {
    pub fn new(owner: Address) -> Self {
        Self {
            owner: RwLock::new(owner),
            paused: AtomicBool::new(false),
        }
    }

    pub fn owner(&self) -> Address {
        self.owner.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    /// # Errors
    /// `NotAuthorized` unless `caller` is the current owner.
    pub fn require_admin(&self, caller: &Address) -> Result<(), LedgerError> {
        if *caller != self.owner() {
            return Err(LedgerError::NotAuthorized(caller.clone()));
        }
        Ok(())
    }

    /// Stop accepting deposits. Withdrawals and claims are unaffected.
    pub fn pause(&self, ctx: &CallContext) -> Result<(), LedgerError> {
        self.require_admin(&ctx.caller)?;
        self.paused.store(true, Ordering::SeqCst);
        info!(by = %ctx.caller, "Ledger paused");
        Ok(())
    }

    pub fn unpause(&self, ctx: &CallContext) -> Result<(), LedgerError> {
        self.require_admin(&ctx.caller)?;
        self.paused.store(false, Ordering::SeqCst);
        info!(by = %ctx.caller, "Ledger unpaused");
        Ok(())
    }

    pub fn transfer_ownership(&self, ctx: &CallContext, new_owner: Address) -> Result<(), LedgerError> {
        if new_owner.is_zero() {
            return Err(LedgerError::InvalidAddress(
                "new owner cannot be the zero address".to_string(),
            ));
        }
        let mut owner = self.owner.write().unwrap_or_else(|e| e.into_inner());
        if ctx.caller != *owner {
            return Err(LedgerError::NotAuthorized(ctx.caller.clone()));
        }
        info!(from = %owner, to = %new_owner, "Ownership transferred");
        *owner = new_owner;
        Ok(())
    }
}
