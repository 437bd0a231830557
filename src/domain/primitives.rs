//! Domain primitives: Timestamp, Address, AssetId, OracleHandle.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

/// Seconds in one day, used for the staked-days projection.
pub const SECONDS_PER_DAY: i64 = 86_400;

/// Time in whole seconds since Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(pub i64);

impl Timestamp {
    /// Create a Timestamp from seconds.
    pub fn new(secs: i64) -> Self {
        Timestamp(secs)
    }

    /// Current wall-clock time.
    pub fn now() -> Self {
        Timestamp(chrono::Utc::now().timestamp())
    }

    /// Get the underlying seconds value.
    pub fn as_secs(&self) -> i64 {
        self.0
    }

    /// Seconds elapsed from `earlier` to `self`, clamped at zero.
    ///
    /// A clock that moves backwards never produces negative accrual.
    pub fn seconds_since(&self, earlier: Timestamp) -> u64 {
        self.0.saturating_sub(earlier.0).max(0) as u64
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressParseError {
    #[error("address must start with 0x")]
    MissingPrefix,
    #[error("address must have 40 hex digits, got {0}")]
    InvalidLength(usize),
    #[error("address contains non-hex character")]
    InvalidCharacter,
}

/// Account address (0x-prefixed, 20 bytes hex, stored lowercase).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Address(pub String);

impl Address {
    /// Create an Address from a string without validation.
    pub fn new(addr: String) -> Self {
        Address(addr)
    }

    /// The all-zero address.
    pub fn zero() -> Self {
        Address(format!("0x{}", "0".repeat(40)))
    }

    pub fn is_zero(&self) -> bool {
        self.0
            .strip_prefix("0x")
            .map(|hex| hex.chars().all(|c| c == '0'))
            .unwrap_or(false)
    }

    /// Get the address as a string reference.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Address {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let hex = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .ok_or(AddressParseError::MissingPrefix)?;
        if hex.len() != 40 {
            return Err(AddressParseError::InvalidLength(hex.len()));
        }
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(AddressParseError::InvalidCharacter);
        }
        Ok(Address(format!("0x{}", hex.to_lowercase())))
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a stakeable asset.
///
/// The zero address denotes the native coin; any other address is the
/// contract address of a fungible token.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AssetId(pub Address);

impl AssetId {
    pub fn new(addr: Address) -> Self {
        AssetId(addr)
    }

    pub fn native() -> Self {
        AssetId(Address::zero())
    }

    pub fn is_native(&self) -> bool {
        self.0.is_zero()
    }

    pub fn address(&self) -> &Address {
        &self.0
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl FromStr for AssetId {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Address::from_str(s).map(AssetId)
    }
}

impl std::fmt::Display for AssetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Reference to a price feed entry (e.g. an aggregator address or feed id).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OracleHandle(pub String);

impl OracleHandle {
    pub fn new(handle: impl Into<String>) -> Self {
        OracleHandle(handle.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for OracleHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
