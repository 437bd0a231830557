//! Ledger event log.

use crate::domain::{Address, AssetId, EventKind, LedgerEvent, Timestamp, Valuation};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use uuid::Uuid;

use super::{parse_amount, parse_small, Repository};

pub(crate) fn event_from_row(row: &SqliteRow) -> Result<LedgerEvent, sqlx::Error> {
    let id: String = row.try_get("id")?;
    let kind: String = row.try_get("kind")?;
    Ok(LedgerEvent {
        id: Uuid::parse_str(&id).map_err(|e| sqlx::Error::ColumnDecode {
            index: "id".to_string(),
            source: Box::new(e),
        })?,
        seq: row.try_get("seq")?,
        kind: EventKind::parse(&kind).ok_or_else(|| sqlx::Error::ColumnDecode {
            index: "kind".to_string(),
            source: format!("unknown event kind {}", kind).into(),
        })?,
        owner: Address::new(row.try_get::<String, _>("owner")?),
        asset_id: AssetId::new(Address::new(row.try_get::<String, _>("asset_id")?)),
        amount: parse_amount(row, "amount")?,
        principal_after: parse_amount(row, "principal_after")?,
        valuation: Valuation::new(parse_amount(row, "price")?, parse_small(row, "price_scale")?),
        reward_after: parse_amount(row, "reward_after")?,
        at: Timestamp::new(row.try_get::<i64, _>("at")?),
    })
}

impl Repository {
    /// Events for an owner with `seq >= from_seq`, oldest first.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn query_events(
        &self,
        owner: &Address,
        from_seq: Option<i64>,
    ) -> Result<Vec<LedgerEvent>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT id, seq, kind, owner, asset_id, amount, principal_after,
                   price, price_scale, reward_after, at
            FROM ledger_events
            WHERE owner = ? AND seq >= ?
            ORDER BY seq ASC, id ASC
            "#,
        )
        .bind(owner.as_str())
        .bind(from_seq.unwrap_or(0))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(event_from_row).collect()
    }
}
