//! Repository layer for database operations.
//!
//! This module provides the `Repository` struct for pooled reads and the
//! `LedgerTx` unit of work for mutations. Methods are organized across
//! submodules by table group:
//! - `assets.rs` - Asset registry rows
//! - `positions.rs` - Position reads
//! - `rewards.rs` - Reward settlement tallies
//! - `events.rs` - Ledger event log
//! - `tx.rs` - Write transaction used by every ledger mutation

mod assets;
mod events;
mod positions;
mod rewards;
mod tx;

pub use tx::LedgerTx;

use crate::domain::{Address, AssetId, Position, Timestamp, Valuation};
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::Row;

/// Repository for database operations.
#[derive(Debug)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Repository { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Open a write transaction.
    ///
    /// The first statement bumps the operation sequence, so the SQLite write
    /// lock is taken up front and concurrent writers queue on the busy
    /// timeout instead of failing on a stale read snapshot.
    ///
    /// # Errors
    /// Returns an error if the transaction cannot be started.
    pub async fn begin_write(&self) -> Result<LedgerTx, sqlx::Error> {
        LedgerTx::begin(&self.pool).await
    }

    /// Latest committed operation sequence number.
    pub async fn current_seq(&self) -> Result<i64, sqlx::Error> {
        let row = sqlx::query("SELECT op_seq FROM ledger_meta WHERE id = 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get::<i64, _>("op_seq"))
    }
}

/// Decode a u128 amount column stored as a decimal string.
pub(crate) fn parse_amount(row: &SqliteRow, column: &str) -> Result<u128, sqlx::Error> {
    let raw = row.try_get::<String, _>(column)?;
    raw.parse::<u128>().map_err(|e| sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: Box::new(e),
    })
}

pub(crate) fn parse_small<T: TryFrom<i64>>(row: &SqliteRow, column: &str) -> Result<T, sqlx::Error>
where
    T::Error: std::error::Error + Send + Sync + 'static,
{
    let raw = row.try_get::<i64, _>(column)?;
    T::try_from(raw).map_err(|e| sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: Box::new(e),
    })
}

pub(crate) fn position_from_row(row: &SqliteRow) -> Result<Position, sqlx::Error> {
    Ok(Position {
        owner: Address::new(row.try_get::<String, _>("owner")?),
        asset_id: AssetId::new(Address::new(row.try_get::<String, _>("asset_id")?)),
        principal: parse_amount(row, "principal")?,
        decimals: parse_small(row, "decimals")?,
        valuation: Valuation::new(
            parse_amount(row, "valuation_price")?,
            parse_small(row, "valuation_scale")?,
        ),
        opened_at: Timestamp::new(row.try_get::<i64, _>("opened_at")?),
        last_accrual_at: Timestamp::new(row.try_get::<i64, _>("last_accrual_at")?),
        accrued_reward: parse_amount(row, "accrued_reward")?,
    })
}
