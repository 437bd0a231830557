//! Per-(owner, asset) staking positions: deposits, withdrawals and reward claims.

use super::{AdminGate, AssetRegistry, CallContext, LedgerError};
use crate::db::{LedgerTx, Repository};
use crate::domain::{
    Address, AssetDescriptor, AssetId, EventKind, LedgerEvent, Position, PositionKey,
    PositionStatus, RewardRate, Timestamp, Valuation,
};
use crate::engine::{AccrualEngine, KeyedLocks};
use crate::oracle::{OracleAdapter, PriceQuote};
use crate::rewards::{Reservation, RewardSettlement, RewardState};
use crate::transfer::AssetTransfer;
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Ledger-wide accrual parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerSettings {
    /// Reward units per USD per second, unless the asset overrides it.
    pub reward_rate: RewardRate,
    /// Decimal precision of the reward token.
    pub reward_decimals: u32,
}

/// Outcome of a committed mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerReceipt {
    pub seq: i64,
    /// Principal moved, or reward units settled for claims.
    pub amount: u128,
    pub position: Position,
}

/// Read-only projection of a position as of some instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PositionView {
    pub position: Position,
    pub status: PositionStatus,
    /// What `accrued_reward` would be if settled now.
    pub reward: u128,
    /// USD value at the stored valuation, at the valuation's price scale.
    pub usd_value: u128,
    pub days_staked: u64,
    pub reward_rate: RewardRate,
    pub as_of: Timestamp,
}

/// The position accrual and settlement engine.
#[derive(Debug)]
pub struct PositionLedger {
    repo: Arc<Repository>,
    registry: Arc<AssetRegistry>,
    admin: Arc<AdminGate>,
    oracle: OracleAdapter,
    transfer: Arc<dyn AssetTransfer>,
    settlement: RewardSettlement,
    engine: AccrualEngine,
    settings: LedgerSettings,
    locks: KeyedLocks<PositionKey>,
}

impl PositionLedger {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        repo: Arc<Repository>,
        registry: Arc<AssetRegistry>,
        admin: Arc<AdminGate>,
        oracle: OracleAdapter,
        transfer: Arc<dyn AssetTransfer>,
        settlement: RewardSettlement,
        settings: LedgerSettings,
    ) -> Self {
        Self {
            repo,
            registry,
            admin,
            oracle,
            transfer,
            settlement,
            engine: AccrualEngine::new(settings.reward_decimals),
            settings,
            locks: KeyedLocks::new(),
        }
    }

    pub fn settings(&self) -> LedgerSettings {
        self.settings
    }

    pub fn settlement(&self) -> &RewardSettlement {
        &self.settlement
    }

    /// Stake `amount` of `asset_id` for the caller.
    ///
    /// Pending accrual is settled at the old valuation before principal grows,
    /// then the whole position is re-valued at the fresh oracle price.
    ///
    /// # Errors
    /// - `InvalidAmount` for a zero amount
    /// - `Paused` while the ledger is paused
    /// - `UnknownAsset` / `AssetDisabled` for the asset
    /// - `OracleUnavailable` for a failing or stale feed
    /// - `TransferFailed` if funds cannot be pulled
    pub async fn deposit(
        &self,
        ctx: &CallContext,
        asset_id: &AssetId,
        amount: u128,
    ) -> Result<LedgerReceipt, LedgerError> {
        if amount == 0 {
            return Err(LedgerError::InvalidAmount);
        }
        if self.admin.is_paused() {
            return Err(LedgerError::Paused);
        }
        let asset = self.registry.resolve(asset_id).await?;
        if asset.disabled {
            return Err(LedgerError::AssetDisabled(asset_id.clone()));
        }

        let key = PositionKey::new(ctx.caller.clone(), asset_id.clone());
        let _guard = self.locks.lock(&key).await;

        let quote = self.oracle.price_of(&asset.oracle, ctx.now).await?;
        let rate = self.rate_for(&asset);

        let mut tx = self.repo.begin_write().await?;
        let existing = tx.load_position(&key).await?;
        let reopens = existing.as_ref().map_or(true, Position::is_vacant);
        let mut position = existing.unwrap_or_else(|| Position::empty(&key, asset.decimals));

        self.engine.settle(&mut position, rate, ctx.now)?;
        position.principal = position
            .principal
            .checked_add(amount)
            .ok_or(LedgerError::Overflow)?;
        position.valuation = valuation_of(&quote);
        if reopens {
            position.opened_at = ctx.now;
        }
        // a stake that cannot be valued would block every later settlement
        self.engine
            .usd_value(position.principal, position.decimals, position.valuation)?;

        let seq = self
            .write(&mut tx, &position, EventKind::Deposited, amount, ctx.now)
            .await?;

        if let Err(e) = self.transfer.pull(&ctx.caller, &asset.kind, amount).await {
            warn!(key = %key, amount, error = %e, "Deposit pull rejected");
            return Err(e.into());
        }
        if let Err(e) = tx.commit().await {
            error!(key = %key, amount, error = %e, "Deposit commit failed, refunding");
            if let Err(refund) = self.transfer.push(&ctx.caller, &asset.kind, amount).await {
                error!(key = %key, amount, error = %refund, "Deposit refund failed");
            }
            return Err(e.into());
        }

        info!(
            key = %key,
            seq,
            amount,
            principal = position.principal,
            price = quote.price,
            price_scale = quote.scale,
            "Deposited"
        );
        Ok(LedgerReceipt {
            seq,
            amount,
            position,
        })
    }

    /// Unstake `amount` and send it back to the caller.
    ///
    /// Accrued reward stays on the position, including after a full
    /// withdrawal. Neither the oracle nor the pause switch is consulted, and
    /// accrual that no longer fits saturates rather than blocking the exit.
    ///
    /// The reduced principal commits before the payout, so a failed commit
    /// never sends funds twice. A rejected payout restores the position.
    ///
    /// # Errors
    /// `InsufficientPosition` unless `0 < amount <= principal`.
    pub async fn withdraw(
        &self,
        ctx: &CallContext,
        asset_id: &AssetId,
        amount: u128,
    ) -> Result<LedgerReceipt, LedgerError> {
        let asset = self.registry.resolve(asset_id).await?;
        let key = PositionKey::new(ctx.caller.clone(), asset_id.clone());
        let _guard = self.locks.lock(&key).await;

        let mut tx = self.repo.begin_write().await?;
        let existing = tx.load_position(&key).await?;
        let available = existing.as_ref().map_or(0, |p| p.principal);
        let snapshot = match existing {
            Some(p) if amount > 0 && amount <= available => p,
            _ => {
                return Err(LedgerError::InsufficientPosition {
                    requested: amount,
                    available,
                })
            }
        };

        let mut position = snapshot.clone();
        self.engine
            .settle_capped(&mut position, self.rate_for(&asset), ctx.now);
        position.principal -= amount;
        tx.save_position(&position).await?;
        tx.commit().await?;

        if let Err(e) = self.transfer.push(&ctx.caller, &asset.kind, amount).await {
            warn!(key = %key, amount, error = %e, "Withdrawal push rejected");
            self.restore(&snapshot, None).await;
            return Err(e.into());
        }

        let seq = match self
            .append_event(&position, EventKind::Withdrawn, amount, ctx.now, None)
            .await
        {
            Ok(seq) => seq,
            Err(e) => {
                error!(key = %key, amount, error = %e, "Withdrawal paid out but its event was not recorded");
                return Err(e);
            }
        };

        info!(
            key = %key,
            seq,
            amount,
            principal = position.principal,
            status = ?position.status(),
            "Withdrew"
        );
        Ok(LedgerReceipt {
            seq,
            amount,
            position,
        })
    }

    /// Settle accrual and pay out the whole accrued reward.
    ///
    /// The zeroed reward and the reserved payout commit before the reward
    /// token ledger is called, so the same window is never paid twice. If the
    /// payout is rejected the position and tally are put back and
    /// `accrued_reward` keeps its previous value.
    ///
    /// # Errors
    /// `NothingToClaim` when no reward is owed, `SettlementFailed` when the
    /// reward token ledger rejects the payout.
    pub async fn claim_reward(
        &self,
        ctx: &CallContext,
        asset_id: &AssetId,
    ) -> Result<LedgerReceipt, LedgerError> {
        let asset = self.registry.resolve(asset_id).await?;
        let key = PositionKey::new(ctx.caller.clone(), asset_id.clone());
        let _guard = self.locks.lock(&key).await;

        let mut tx = self.repo.begin_write().await?;
        let snapshot = tx
            .load_position(&key)
            .await?
            .ok_or(LedgerError::NothingToClaim)?;

        let mut position = snapshot.clone();
        self.engine.settle(&mut position, self.rate_for(&asset), ctx.now)?;
        let reward = position.accrued_reward;
        if reward == 0 {
            return Err(LedgerError::NothingToClaim);
        }
        position.accrued_reward = 0;
        tx.save_position(&position).await?;

        let reservation = self.settlement.reserve(&mut tx, &key, reward, ctx.now).await?;
        if reservation.recovered > 0 {
            self.record(&mut tx, &snapshot, EventKind::RewardClaimed, reservation.recovered, ctx.now)
                .await?;
        }
        tx.commit().await?;

        if let Err(e) = self.settlement.pay(&reservation).await {
            self.restore(&snapshot, Some(&reservation)).await;
            return Err(e.into());
        }

        let seq = match self
            .append_event(&position, EventKind::RewardClaimed, reward, ctx.now, Some(&reservation))
            .await
        {
            Ok(seq) => seq,
            Err(e) => {
                error!(key = %key, reward, error = %e, "Reward paid out but left pending");
                return Err(e);
            }
        };

        info!(key = %key, seq, reward, "Claimed reward");
        Ok(LedgerReceipt {
            seq,
            amount: reward,
            position,
        })
    }

    /// Checkpoint accrual for `owner` without moving funds.
    ///
    /// Anyone may trigger it; the owner's entitlement is unchanged, only its
    /// representation moves from pending into `accrued_reward`.
    pub async fn update_reward(
        &self,
        ctx: &CallContext,
        owner: &Address,
        asset_id: &AssetId,
    ) -> Result<Position, LedgerError> {
        let asset = self.registry.resolve(asset_id).await?;
        let key = PositionKey::new(owner.clone(), asset_id.clone());
        let _guard = self.locks.lock(&key).await;

        let mut tx = self.repo.begin_write().await?;
        let Some(mut position) = tx.load_position(&key).await? else {
            return Ok(Position::empty(&key, asset.decimals));
        };

        let earned = self.engine.settle(&mut position, self.rate_for(&asset), ctx.now)?;
        let seq = self
            .write(&mut tx, &position, EventKind::RewardUpdated, earned, ctx.now)
            .await?;
        tx.commit().await?;

        info!(key = %key, seq, earned, accrued = position.accrued_reward, "Checkpointed reward");
        Ok(position)
    }

    /// Projection of a position at `now`. Never writes.
    ///
    /// A key that was never deposited yields a closed, zero view.
    pub async fn get_position(
        &self,
        owner: &Address,
        asset_id: &AssetId,
        now: Timestamp,
    ) -> Result<PositionView, LedgerError> {
        let asset = self.registry.resolve(asset_id).await?;
        let key = PositionKey::new(owner.clone(), asset_id.clone());
        let position = self
            .repo
            .get_position(&key)
            .await?
            .unwrap_or_else(|| Position::empty(&key, asset.decimals));
        self.view(position, self.rate_for(&asset), now)
    }

    /// Reward that a claim at `now` would settle.
    pub async fn get_updated_reward(
        &self,
        owner: &Address,
        asset_id: &AssetId,
        now: Timestamp,
    ) -> Result<u128, LedgerError> {
        Ok(self.get_position(owner, asset_id, now).await?.reward)
    }

    /// Every retained position of `owner`, with live reward projections.
    pub async fn get_user_positions(
        &self,
        owner: &Address,
        now: Timestamp,
    ) -> Result<Vec<PositionView>, LedgerError> {
        let positions = self.repo.query_positions_by_owner(owner).await?;
        let mut views = Vec::with_capacity(positions.len());
        for position in positions {
            let asset = self.registry.resolve(&position.asset_id).await?;
            views.push(self.view(position, self.rate_for(&asset), now)?);
        }
        Ok(views)
    }

    /// Fresh oracle quote for an asset.
    pub async fn get_token_price(
        &self,
        asset_id: &AssetId,
        now: Timestamp,
    ) -> Result<PriceQuote, LedgerError> {
        let asset = self.registry.resolve(asset_id).await?;
        Ok(self.oracle.price_of(&asset.oracle, now).await?)
    }

    /// Settled reward tallies of `owner` plus their sum.
    pub async fn settled_rewards(&self, owner: &Address) -> Result<(Vec<RewardState>, u128), LedgerError> {
        let states = self.settlement.settled_states(&self.repo, owner).await?;
        let total = self.settlement.settled_total(&self.repo, owner).await?;
        Ok((states, total))
    }

    pub async fn global_settled_total(&self) -> Result<u128, LedgerError> {
        Ok(self.settlement.global_settled_total(&self.repo).await?)
    }

    pub async fn events(
        &self,
        owner: &Address,
        from_seq: Option<i64>,
    ) -> Result<Vec<LedgerEvent>, LedgerError> {
        Ok(self.repo.query_events(owner, from_seq).await?)
    }

    fn rate_for(&self, asset: &AssetDescriptor) -> RewardRate {
        asset.effective_rate(self.settings.reward_rate)
    }

    fn view(&self, position: Position, rate: RewardRate, now: Timestamp) -> Result<PositionView, LedgerError> {
        let reward = self.engine.projected_reward(&position, rate, now)?;
        let usd_value = self
            .engine
            .usd_value(position.principal, position.decimals, position.valuation)?;
        Ok(PositionView {
            status: position.status(),
            days_staked: position.days_staked(now),
            reward,
            usd_value,
            reward_rate: rate,
            as_of: now,
            position,
        })
    }

    /// Persist the position and its event inside `tx`.
    async fn write(
        &self,
        tx: &mut LedgerTx,
        position: &Position,
        kind: EventKind,
        amount: u128,
        at: Timestamp,
    ) -> Result<i64, LedgerError> {
        tx.save_position(position).await?;
        self.record(tx, position, kind, amount, at).await
    }

    async fn record(
        &self,
        tx: &mut LedgerTx,
        position: &Position,
        kind: EventKind,
        amount: u128,
        at: Timestamp,
    ) -> Result<i64, LedgerError> {
        let seq = tx.seq();
        tx.record_event(&LedgerEvent::new(
            seq,
            kind,
            position.owner.clone(),
            position.asset_id.clone(),
            amount,
            position.principal,
            position.valuation,
            position.accrued_reward,
            at,
        ))
        .await?;
        Ok(seq)
    }

    /// Record the event of a completed payout, finalizing its reservation.
    async fn append_event(
        &self,
        position: &Position,
        kind: EventKind,
        amount: u128,
        at: Timestamp,
        reservation: Option<&Reservation>,
    ) -> Result<i64, LedgerError> {
        let mut tx = self.repo.begin_write().await?;
        if let Some(reservation) = reservation {
            self.settlement.finalize(&mut tx, reservation).await?;
        }
        let seq = self.record(&mut tx, position, kind, amount, at).await?;
        tx.commit().await?;
        Ok(seq)
    }

    /// Put back a position, and the reservation made with it, after its
    /// payout was rejected.
    async fn restore(&self, snapshot: &Position, reservation: Option<&Reservation>) {
        if let Err(e) = self.try_restore(snapshot, reservation).await {
            error!(key = %snapshot.key(), error = %e, "Could not restore position after rejected payout");
        }
    }

    async fn try_restore(
        &self,
        snapshot: &Position,
        reservation: Option<&Reservation>,
    ) -> Result<(), LedgerError> {
        let mut tx = self.repo.begin_write().await?;
        tx.save_position(snapshot).await?;
        if let Some(reservation) = reservation {
            self.settlement.release(&mut tx, reservation).await?;
        }
        tx.commit().await?;
        Ok(())
    }
}

fn valuation_of(quote: &PriceQuote) -> Valuation {
    Valuation::new(quote.price, quote.scale)
}
