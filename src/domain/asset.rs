//! Asset metadata and reward-rate types.

use crate::domain::{Address, AssetId, Decimal, OracleHandle, Timestamp};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Highest decimal precision an asset may declare.
pub const MAX_ASSET_DECIMALS: u8 = 18;

/// How the transfer collaborator moves a given asset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "type", content = "token")]
pub enum AssetKind {
    /// The chain's native coin.
    Native,
    /// A fungible token identified by its contract address.
    Fungible(Address),
}

impl AssetKind {
    /// Derive the kind from an asset identifier.
    pub fn for_asset(asset_id: &AssetId) -> Self {
        if asset_id.is_native() {
            AssetKind::Native
        } else {
            AssetKind::Fungible(asset_id.address().clone())
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AssetKind::Native => "native",
            AssetKind::Fungible(_) => "fungible",
        }
    }
}

/// Reward emitted per unit of USD value per second, as a fixed-point number
/// `mantissa / 10^scale`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RewardRate {
    pub mantissa: u128,
    pub scale: u32,
}

impl RewardRate {
    pub fn new(mantissa: u128, scale: u32) -> Self {
        Self { mantissa, scale }
    }

    /// Parse a decimal string such as `"0.0001"`.
    pub fn parse(s: &str) -> Option<Self> {
        let (mantissa, scale) = Decimal::from_str(s).ok()?.to_scaled()?;
        Some(Self { mantissa, scale })
    }

    /// Canonical decimal rendering, e.g. `"0.0001"`.
    pub fn to_canonical_string(&self) -> String {
        crate::domain::decimal::format_scaled(self.mantissa, self.scale)
    }
}

/// Registered asset metadata.
///
/// Everything except `oracle` and `disabled` is fixed at registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetDescriptor {
    pub asset_id: AssetId,
    pub kind: AssetKind,
    pub decimals: u8,
    pub symbol: String,
    pub oracle: OracleHandle,
    /// Overrides the ledger-wide rate for this asset when set.
    pub reward_rate: Option<RewardRate>,
    pub disabled: bool,
    pub registered_at: Timestamp,
}

impl AssetDescriptor {
    pub fn new(
        asset_id: AssetId,
        decimals: u8,
        symbol: impl Into<String>,
        oracle: OracleHandle,
        registered_at: Timestamp,
    ) -> Self {
        Self {
            kind: AssetKind::for_asset(&asset_id),
            asset_id,
            decimals,
            symbol: symbol.into(),
            oracle,
            reward_rate: None,
            disabled: false,
            registered_at,
        }
    }

    pub fn with_reward_rate(mut self, rate: RewardRate) -> Self {
        self.reward_rate = Some(rate);
        self
    }

    /// The rate that applies to positions in this asset.
    pub fn effective_rate(&self, ledger_rate: RewardRate) -> RewardRate {
        self.reward_rate.unwrap_or(ledger_rate)
    }
}
