//! Position reads for the query layer.

use crate::domain::{Address, Position, PositionKey};

use super::{position_from_row, Repository};

impl Repository {
    /// Fetch the committed position for a key.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn get_position(&self, key: &PositionKey) -> Result<Option<Position>, sqlx::Error> {
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
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(position_from_row).transpose()
    }

    /// All positions ever opened by an owner, ordered by asset.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn query_positions_by_owner(&self, owner: &Address) -> Result<Vec<Position>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT owner, asset_id, principal, decimals, valuation_price, valuation_scale,
                   opened_at, last_accrual_at, accrued_reward
            FROM positions
            WHERE owner = ?
            ORDER BY asset_id ASC
            "#,
        )
        .bind(owner.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(position_from_row).collect()
    }
}

#[cfg(test)]
mod tests {
    use crate::db::repo::test_support::setup_repo;
    use crate::domain::{
        Address, AssetDescriptor, AssetId, OracleHandle, Position, PositionKey, Timestamp, Valuation,
    };
    use std::str::FromStr;

    fn owner() -> Address {
        Address::from_str("0x1111111111111111111111111111111111111111").unwrap()
    }

    #[tokio::test]
    async fn test_position_roundtrip_preserves_large_amounts() {
        let (repo, _temp) = setup_repo().await;
        repo.insert_asset(&AssetDescriptor::new(
            AssetId::native(),
            18,
            "ETH",
            OracleHandle::new("eth-usd"),
            Timestamp::new(0),
        ))
        .await
        .unwrap();

        let key = PositionKey::new(owner(), AssetId::native());
        let mut position = Position::empty(&key, 18);
        position.principal = u128::MAX - 1;
        position.valuation = Valuation::new(200_000_000_000, 8);
        position.opened_at = Timestamp::new(10);
        position.last_accrual_at = Timestamp::new(20);
        position.accrued_reward = 10u128.pow(30);

        let mut tx = repo.begin_write().await.unwrap();
        tx.save_position(&position).await.unwrap();
        tx.commit().await.unwrap();

        let stored = repo.get_position(&key).await.unwrap().unwrap();
        assert_eq!(stored, position);

        let all = repo.query_positions_by_owner(&owner()).await.unwrap();
        assert_eq!(all, vec![position]);
    }

    #[tokio::test]
    async fn test_missing_position_is_none() {
        let (repo, _temp) = setup_repo().await;
        let key = PositionKey::new(owner(), AssetId::native());
        assert!(repo.get_position(&key).await.unwrap().is_none());
        assert!(repo.query_positions_by_owner(&owner()).await.unwrap().is_empty());
    }
}
