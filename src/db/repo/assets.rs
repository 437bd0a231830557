//! Asset registry rows.

use crate::domain::{Address, AssetDescriptor, AssetId, AssetKind, OracleHandle, RewardRate, Timestamp};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

use super::{parse_small, Repository};

fn descriptor_from_row(row: &SqliteRow) -> Result<AssetDescriptor, sqlx::Error> {
    let asset_id = AssetId::new(Address::new(row.try_get::<String, _>("asset_id")?));
    let mantissa: Option<String> = row.try_get("reward_rate_mantissa")?;
    let scale: Option<i64> = row.try_get("reward_rate_scale")?;
    let reward_rate = match (mantissa, scale) {
        (Some(m), Some(s)) => Some(RewardRate::new(
            m.parse::<u128>().map_err(|e| sqlx::Error::ColumnDecode {
                index: "reward_rate_mantissa".to_string(),
                source: Box::new(e),
            })?,
            u32::try_from(s).map_err(|e| sqlx::Error::ColumnDecode {
                index: "reward_rate_scale".to_string(),
                source: Box::new(e),
            })?,
        )),
        _ => None,
    };

    Ok(AssetDescriptor {
        kind: AssetKind::for_asset(&asset_id),
        asset_id,
        decimals: parse_small(row, "decimals")?,
        symbol: row.try_get("symbol")?,
        oracle: OracleHandle::new(row.try_get::<String, _>("oracle")?),
        reward_rate,
        disabled: row.try_get::<i64, _>("disabled")? != 0,
        registered_at: Timestamp::new(row.try_get::<i64, _>("registered_at")?),
    })
}

impl Repository {
    /// Insert an asset descriptor if the identifier is free.
    ///
    /// Returns `false` when the asset already exists.
    ///
    /// # Errors
    /// Returns an error if the insert fails.
    pub async fn insert_asset(&self, descriptor: &AssetDescriptor) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO assets (
                asset_id, kind, decimals, symbol, oracle,
                reward_rate_mantissa, reward_rate_scale, disabled, registered_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(asset_id) DO NOTHING
            "#,
        )
        .bind(descriptor.asset_id.as_str())
        .bind(descriptor.kind.label())
        .bind(descriptor.decimals as i64)
        .bind(descriptor.symbol.as_str())
        .bind(descriptor.oracle.as_str())
        .bind(descriptor.reward_rate.map(|r| r.mantissa.to_string()))
        .bind(descriptor.reward_rate.map(|r| r.scale as i64))
        .bind(descriptor.disabled as i64)
        .bind(descriptor.registered_at.as_secs())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Fetch one asset descriptor.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn get_asset(&self, asset_id: &AssetId) -> Result<Option<AssetDescriptor>, sqlx::Error> {
        let row = sqlx::query(
            r#"
            SELECT asset_id, decimals, symbol, oracle, reward_rate_mantissa,
                   reward_rate_scale, disabled, registered_at
            FROM assets
            WHERE asset_id = ?
            "#,
        )
        .bind(asset_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(descriptor_from_row).transpose()
    }

    /// All registered assets ordered by identifier.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn list_assets(&self) -> Result<Vec<AssetDescriptor>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT asset_id, decimals, symbol, oracle, reward_rate_mantissa,
                   reward_rate_scale, disabled, registered_at
            FROM assets
            ORDER BY asset_id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(descriptor_from_row).collect()
    }

    /// Point an asset at a different price feed.
    ///
    /// Returns `false` when the asset does not exist.
    pub async fn update_asset_oracle(
        &self,
        asset_id: &AssetId,
        oracle: &OracleHandle,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE assets SET oracle = ? WHERE asset_id = ?")
            .bind(oracle.as_str())
            .bind(asset_id.as_str())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Returns `false` when the asset does not exist.
    pub async fn update_asset_disabled(
        &self,
        asset_id: &AssetId,
        disabled: bool,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE assets SET disabled = ? WHERE asset_id = ?")
            .bind(disabled as i64)
            .bind(asset_id.as_str())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
