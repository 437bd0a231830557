//! Reward settlement tallies.

use crate::domain::{Address, AssetId, PositionKey, Timestamp};
use crate::rewards::RewardState;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use super::{parse_amount, Repository};

pub(crate) fn reward_state_from_row(row: &SqliteRow) -> Result<RewardState, sqlx::Error> {
    Ok(RewardState {
        key: PositionKey::new(
            Address::new(row.try_get::<String, _>("owner")?),
            AssetId::new(Address::new(row.try_get::<String, _>("asset_id")?)),
        ),
        total_settled: parse_amount(row, "total_settled")?,
        last_settled_at: Timestamp::new(row.try_get::<i64, _>("last_settled_at")?),
        settlement_count: row.try_get::<i64, _>("settlement_count")?,
        pending_payout: parse_amount(row, "pending_payout")?,
    })
}

impl Repository {
    /// Settlement tally for one position key.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn get_reward_state(&self, key: &PositionKey) -> Result<Option<RewardState>, sqlx::Error> {
        let row = sqlx::query(
            r#"
            SELECT owner, asset_id, total_settled, last_settled_at, settlement_count, pending_payout
            FROM reward_state
            WHERE owner = ? AND asset_id = ?
            "#,
        )
        .bind(key.owner.as_str())
        .bind(key.asset_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(reward_state_from_row).transpose()
    }

    /// Settlement tallies for every asset an owner has claimed on.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn query_reward_states_by_owner(
        &self,
        owner: &Address,
    ) -> Result<Vec<RewardState>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT owner, asset_id, total_settled, last_settled_at, settlement_count, pending_payout
            FROM reward_state
            WHERE owner = ?
            ORDER BY asset_id ASC
            "#,
        )
        .bind(owner.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(reward_state_from_row).collect()
    }

    /// Sum of every settled reward across all owners.
    ///
    /// Summed in Rust: SQLite would coerce the text amounts to floats.
    pub async fn sum_settled_rewards(&self) -> Result<u128, sqlx::Error> {
        let rows = sqlx::query("SELECT total_settled FROM reward_state")
            .fetch_all(&self.pool)
            .await?;

        let mut total = 0u128;
        for row in &rows {
            total = total.saturating_add(parse_amount(row, "total_settled")?);
        }
        Ok(total)
    }
}
