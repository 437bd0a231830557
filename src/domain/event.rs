//! Ledger event emitted by every committed mutation.

use crate::domain::{Address, AssetId, Timestamp, Valuation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Deposited,
    Withdrawn,
    RewardClaimed,
    /// Pending accrual checkpointed into `accrued_reward`.
    RewardUpdated,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Deposited => "deposited",
            EventKind::Withdrawn => "withdrawn",
            EventKind::RewardClaimed => "reward_claimed",
            EventKind::RewardUpdated => "reward_updated",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "deposited" => Some(EventKind::Deposited),
            "withdrawn" => Some(EventKind::Withdrawn),
            "reward_claimed" => Some(EventKind::RewardClaimed),
            "reward_updated" => Some(EventKind::RewardUpdated),
            _ => None,
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEvent {
    pub id: Uuid,
    /// Operation sequence number, assigned by storage at commit.
    pub seq: i64,
    pub kind: EventKind,
    pub owner: Address,
    pub asset_id: AssetId,
    /// Principal moved, or reward settled for claims.
    pub amount: u128,
    pub principal_after: u128,
    /// Valuation in force after the operation.
    pub valuation: Valuation,
    /// `accrued_reward` after the operation.
    pub reward_after: u128,
    pub at: Timestamp,
}

impl LedgerEvent {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        seq: i64,
        kind: EventKind,
        owner: Address,
        asset_id: AssetId,
        amount: u128,
        principal_after: u128,
        valuation: Valuation,
        reward_after: u128,
        at: Timestamp,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            seq,
            kind,
            owner,
            asset_id,
            amount,
            principal_after,
            valuation,
            reward_after,
            at,
        }
    }
}
