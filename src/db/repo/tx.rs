//! Write transaction shared by every ledger mutation.

use crate::domain::{LedgerEvent, Position, PositionKey};
use crate::rewards::RewardState;
use sqlx::sqlite::{Sqlite, SqlitePool};
use sqlx::{Row, Transaction};

use super::position_from_row;
use super::rewards::reward_state_from_row;

/// One all-or-nothing unit of ledger work.
///
/// Dropping it without [`LedgerTx::commit`] rolls everything back.
pub struct LedgerTx {
    tx: Transaction<'static, Sqlite>,
    seq: i64,
}

impl LedgerTx {
    pub(super) async fn begin(pool: &SqlitePool) -> Result<Self, sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query("UPDATE ledger_meta SET op_seq = op_seq + 1 WHERE id = 1")
            .execute(&mut *tx)
            .await?;
        let row = sqlx::query("SELECT op_seq FROM ledger_meta WHERE id = 1")
            .fetch_one(&mut *tx)
            .await?;
        let seq = row.get::<i64, _>("op_seq");

        Ok(Self { tx, seq })
    }

    /// Sequence number this operation will commit under.
    pub fn seq(&self) -> i64 {
        self.seq
    }

    pub async fn load_position(&mut self, key: &PositionKey) -> Result<Option<Position>, sqlx::Error> {
        let row = sqlx::query(
            r#"
            SELECT owner, asset_id, principal, decimals, valuation_price, valuation_scale,
                   opened_at, last_accrual_at, accrued_reward
            FROM positions
            WHERE owner = ? AND asset_id = ?
            "#,
        )
        .bind(key.owner.as_str())
        .bind(key.asset_id.as_str())
        .fetch_optional(&mut *self.tx)
        .await?;

        row.as_ref().map(position_from_row).transpose()
    }

    pub async fn save_position(&mut self, position: &Position) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO positions (
                owner, asset_id, principal, decimals, valuation_price, valuation_scale,
                opened_at, last_accrual_at, accrued_reward, updated_seq
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(owner, asset_id) DO UPDATE SET
                principal = excluded.principal,
                decimals = excluded.decimals,
                valuation_price = excluded.valuation_price,
                valuation_scale = excluded.valuation_scale,
                opened_at = excluded.opened_at,
                last_accrual_at = excluded.last_accrual_at,
                accrued_reward = excluded.accrued_reward,
                updated_seq = excluded.updated_seq
            "#,
        )
        .bind(position.owner.as_str())
        .bind(position.asset_id.as_str())
        .bind(position.principal.to_string())
        .bind(position.decimals as i64)
        .bind(position.valuation.price.to_string())
        .bind(position.valuation.scale as i64)
        .bind(position.opened_at.as_secs())
        .bind(position.last_accrual_at.as_secs())
        .bind(position.accrued_reward.to_string())
        .bind(self.seq)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    pub async fn record_event(&mut self, event: &LedgerEvent) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO ledger_events (
                id, seq, kind, owner, asset_id, amount, principal_after,
                price, price_scale, reward_after, at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(event.id.to_string())
        .bind(event.seq)
        .bind(event.kind.as_str())
        .bind(event.owner.as_str())
        .bind(event.asset_id.as_str())
        .bind(event.amount.to_string())
        .bind(event.principal_after.to_string())
        .bind(event.valuation.price.to_string())
        .bind(event.valuation.scale as i64)
        .bind(event.reward_after.to_string())
        .bind(event.at.as_secs())
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    pub async fn load_reward_state(&mut self, key: &PositionKey) -> Result<Option<RewardState>, sqlx::Error> {
        let row = sqlx::query(
            r#"
            SELECT owner, asset_id, total_settled, last_settled_at, settlement_count, pending_payout
            FROM reward_state
            WHERE owner = ? AND asset_id = ?
            "#,
        )
        .bind(key.owner.as_str())
        .bind(key.asset_id.as_str())
        .fetch_optional(&mut *self.tx)
        .await?;

        row.as_ref().map(reward_state_from_row).transpose()
    }

    pub async fn save_reward_state(&mut self, state: &RewardState) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO reward_state (
                owner, asset_id, total_settled, last_settled_at, settlement_count, pending_payout
            ) VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(owner, asset_id) DO UPDATE SET
                total_settled = excluded.total_settled,
                last_settled_at = excluded.last_settled_at,
                settlement_count = excluded.settlement_count,
                pending_payout = excluded.pending_payout
            "#,
        )
        .bind(state.key.owner.as_str())
        .bind(state.key.asset_id.as_str())
        .bind(state.total_settled.to_string())
        .bind(state.last_settled_at.as_secs())
        .bind(state.settlement_count)
        .bind(state.pending_payout.to_string())
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    pub async fn delete_reward_state(&mut self, key: &PositionKey) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM reward_state WHERE owner = ? AND asset_id = ?")
            .bind(key.owner.as_str())
            .bind(key.asset_id.as_str())
            .execute(&mut *self.tx)
            .await?;

        Ok(())
    }

    pub async fn commit(self) -> Result<(), sqlx::Error> {
        self.tx.commit().await
    }
}
