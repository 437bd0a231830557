//! Converts accrued reward into reward-token units, at most once per window.

use super::{RewardLedgerError, RewardTokenLedger};
use crate::db::{LedgerTx, Repository};
use crate::domain::{Address, PositionKey, Timestamp};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

/// Running tally of rewards already paid out for one position key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardState {
    pub key: PositionKey,
    pub total_settled: u128,
    /// End of the latest reserved accrual window.
    pub last_settled_at: Timestamp,
    pub settlement_count: i64,
    /// Units reserved for a payout whose outcome has not been recorded yet.
    pub pending_payout: u128,
}

impl RewardState {
    fn fresh(key: &PositionKey) -> Self {
        Self {
            key: key.clone(),
            total_settled: 0,
            last_settled_at: Timestamp::new(0),
            settlement_count: 0,
            pending_payout: 0,
        }
    }

    /// Count the pending payout as paid.
    fn absorb_pending(&mut self) -> Result<u128, SettlementError> {
        let pending = self.pending_payout;
        if pending > 0 {
            self.total_settled = self
                .total_settled
                .checked_add(pending)
                .ok_or(SettlementError::Overflow)?;
            self.settlement_count += 1;
            self.pending_payout = 0;
        }
        Ok(pending)
    }
}

/// Where settled rewards come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettlementStrategy {
    /// Mint new reward units to the claimant.
    Mint,
    /// Transfer from a pre-funded treasury account.
    Treasury(Address),
}

impl SettlementStrategy {
    pub fn label(&self) -> &'static str {
        match self {
            SettlementStrategy::Mint => "mint",
            SettlementStrategy::Treasury(_) => "treasury",
        }
    }
}

#[derive(Debug, Error)]
pub enum SettlementError {
    #[error("settlement window ending {window_end} does not advance past {last_settled_at} for {key}")]
    WindowNotAdvanced {
        key: PositionKey,
        window_end: Timestamp,
        last_settled_at: Timestamp,
    },
    #[error("reward ledger rejected settlement: {0}")]
    Ledger(#[from] RewardLedgerError),
    #[error("settled total overflow")]
    Overflow,
    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),
}

/// A payout recorded as pending in storage, not yet handed to the token ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reservation {
    pub key: PositionKey,
    pub amount: u128,
    pub window_end: Timestamp,
    /// Payout left pending by an earlier interrupted claim, now counted as paid.
    pub recovered: u128,
    /// Tally to put back if the payout is rejected.
    prior: Option<RewardState>,
}

/// Pays accrued reward out of the reward token ledger.
///
/// A payout runs in three steps so that a failed commit can never lead to a
/// second payout for the same window:
/// 1. [`reserve`](Self::reserve) advances the window guard and records the
///    amount as pending inside the caller's transaction, which then commits.
/// 2. [`pay`](Self::pay) mints or transfers.
/// 3. [`finalize`](Self::finalize) moves the pending amount into the tally,
///    or [`release`](Self::release) puts the prior tally back if the token
///    ledger rejected the payout.
///
/// A pending amount still present at the next reservation is counted as paid.
#[derive(Debug, Clone)]
pub struct RewardSettlement {
    token: Arc<dyn RewardTokenLedger>,
    strategy: SettlementStrategy,
}

impl RewardSettlement {
    pub fn new(token: Arc<dyn RewardTokenLedger>, strategy: SettlementStrategy) -> Self {
        Self { token, strategy }
    }

    pub fn strategy(&self) -> &SettlementStrategy {
        &self.strategy
    }

    /// Reserve `amount` reward units for the owner of `key` for the window
    /// ending at `window_end`.
    ///
    /// # Errors
    /// Fails if the window does not advance past the last reserved one.
    pub async fn reserve(
        &self,
        tx: &mut LedgerTx,
        key: &PositionKey,
        amount: u128,
        window_end: Timestamp,
    ) -> Result<Reservation, SettlementError> {
        let loaded = tx.load_reward_state(key).await?;
        let (mut state, prior, recovered) = match loaded {
            Some(mut state) => {
                if window_end <= state.last_settled_at {
                    return Err(SettlementError::WindowNotAdvanced {
                        key: key.clone(),
                        window_end,
                        last_settled_at: state.last_settled_at,
                    });
                }
                let recovered = state.absorb_pending()?;
                if recovered > 0 {
                    warn!(key = %key, recovered, "Counting interrupted payout as settled");
                }
                (state.clone(), Some(state), recovered)
            }
            None => (RewardState::fresh(key), None, 0),
        };

        state.last_settled_at = window_end;
        state.pending_payout = amount;
        tx.save_reward_state(&state).await?;

        Ok(Reservation {
            key: key.clone(),
            amount,
            window_end,
            recovered,
            prior,
        })
    }

    /// Hand a committed reservation to the reward token ledger.
    ///
    /// # Errors
    /// Fails if the token ledger rejects the mint or transfer.
    pub async fn pay(&self, reservation: &Reservation) -> Result<(), SettlementError> {
        let owner = &reservation.key.owner;
        let paid = match &self.strategy {
            SettlementStrategy::Mint => self.token.mint(owner, reservation.amount).await,
            SettlementStrategy::Treasury(treasury) => {
                self.token.transfer(treasury, owner, reservation.amount).await
            }
        };
        if let Err(e) = paid {
            warn!(
                key = %reservation.key,
                amount = reservation.amount,
                strategy = self.strategy.label(),
                error = %e,
                "Reward payout rejected"
            );
            return Err(e.into());
        }
        Ok(())
    }

    /// Record a paid reservation in the settled tally.
    pub async fn finalize(
        &self,
        tx: &mut LedgerTx,
        reservation: &Reservation,
    ) -> Result<RewardState, SettlementError> {
        let mut state = tx
            .load_reward_state(&reservation.key)
            .await?
            .ok_or(sqlx::Error::RowNotFound)?;
        state.absorb_pending()?;
        tx.save_reward_state(&state).await?;

        info!(
            key = %reservation.key,
            amount = reservation.amount,
            total_settled = state.total_settled,
            strategy = self.strategy.label(),
            "Settled reward"
        );
        Ok(state)
    }

    /// Undo a reservation whose payout was rejected.
    pub async fn release(&self, tx: &mut LedgerTx, reservation: &Reservation) -> Result<(), SettlementError> {
        match &reservation.prior {
            Some(state) => tx.save_reward_state(state).await?,
            None => tx.delete_reward_state(&reservation.key).await?,
        }
        Ok(())
    }

    /// Total reward units ever settled to `owner`, across all assets.
    pub async fn settled_total(&self, repo: &Repository, owner: &Address) -> Result<u128, SettlementError> {
        let states = repo.query_reward_states_by_owner(owner).await?;
        states
            .iter()
            .try_fold(0u128, |acc, s| acc.checked_add(s.total_settled))
            .ok_or(SettlementError::Overflow)
    }

    /// Per-asset tallies for `owner`.
    pub async fn settled_states(&self, repo: &Repository, owner: &Address) -> Result<Vec<RewardState>, SettlementError> {
        Ok(repo.query_reward_states_by_owner(owner).await?)
    }

    pub async fn global_settled_total(&self, repo: &Repository) -> Result<u128, SettlementError> {
        Ok(repo.sum_settled_rewards().await?)
    }

    pub async fn balance_of(&self, who: &Address) -> Result<u128, SettlementError> {
        Ok(self.token.balance_of(who).await?)
    }
}
