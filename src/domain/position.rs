//! Staked position record.

use crate::domain::{Address, AssetId, Timestamp, SECONDS_PER_DAY};
use serde::{Deserialize, Serialize};

/// Unique key of a position.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PositionKey {
    pub owner: Address,
    pub asset_id: AssetId,
}

impl PositionKey {
    pub fn new(owner: Address, asset_id: AssetId) -> Self {
        Self { owner, asset_id }
    }
}

impl std::fmt::Display for PositionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.asset_id)
    }
}

/// USD price captured at an accrual boundary, as `price / 10^scale`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Valuation {
    pub price: u128,
    pub scale: u32,
}

impl Valuation {
    pub fn new(price: u128, scale: u32) -> Self {
        Self { price, scale }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionStatus {
    Open,
    Closed,
}

/// A user's staked balance and accrual state for one asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub owner: Address,
    pub asset_id: AssetId,
    /// Raw deposited amount in asset-native units.
    pub principal: u128,
    /// Asset decimal precision, copied at first deposit.
    pub decimals: u8,
    pub valuation: Valuation,
    pub opened_at: Timestamp,
    pub last_accrual_at: Timestamp,
    /// Reward units owed but not yet claimed.
    pub accrued_reward: u128,
}

impl Position {
    /// A zero record, as seen for a key that was never deposited.
    pub fn empty(key: &PositionKey, decimals: u8) -> Self {
        Self {
            owner: key.owner.clone(),
            asset_id: key.asset_id.clone(),
            principal: 0,
            decimals,
            valuation: Valuation::default(),
            opened_at: Timestamp::new(0),
            last_accrual_at: Timestamp::new(0),
            accrued_reward: 0,
        }
    }

    pub fn key(&self) -> PositionKey {
        PositionKey::new(self.owner.clone(), self.asset_id.clone())
    }

    pub fn status(&self) -> PositionStatus {
        if self.principal > 0 {
            PositionStatus::Open
        } else {
            PositionStatus::Closed
        }
    }

    pub fn is_open(&self) -> bool {
        self.status() == PositionStatus::Open
    }

    /// Nothing staked and nothing owed.
    pub fn is_vacant(&self) -> bool {
        self.principal == 0 && self.accrued_reward == 0
    }

    /// Whole days since the position was opened; zero for vacant records.
    pub fn days_staked(&self, now: Timestamp) -> u64 {
        if self.is_vacant() {
            return 0;
        }
        now.seconds_since(self.opened_at) / SECONDS_PER_DAY as u64
    }
}
