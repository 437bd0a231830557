#![allow(dead_code)]

use stakeledger::domain::AssetKind;
use stakeledger::ledger::LedgerSettings;
use stakeledger::{
    init_db, Address, AdminGate, AssetDescriptor, AssetId, AssetRegistry, CallContext,
    InMemoryCustody, InMemoryRewardToken, MockPriceOracle, OracleAdapter, OracleHandle,
    PositionLedger, Repository, RewardRate, RewardSettlement, SettlementStrategy, Timestamp,
};
use std::str::FromStr;
use std::sync::Arc;
use tempfile::TempDir;

pub const ETH_FEED: &str = "eth-usd";
pub const USDC_FEED: &str = "usdc-usd";
pub const MAX_STALENESS_SECS: u64 = 3600;
pub const ONE_ETH: u128 = 1_000_000_000_000_000_000;

pub fn addr(s: &str) -> Address {
    Address::from_str(s).unwrap()
}

pub fn owner() -> Address {
    addr("0x00000000000000000000000000000000000000aa")
}

pub fn alice() -> Address {
    addr("0x000000000000000000000000000000000000a11c")
}

pub fn bob() -> Address {
    addr("0x0000000000000000000000000000000000000b0b")
}

pub fn usdc() -> AssetId {
    AssetId::from_str("0x326c977e6efc84e512bb9c30f76e30c160ed06fb").unwrap()
}

pub fn ctx(caller: &Address, at: i64) -> CallContext {
    CallContext::new(caller.clone(), Timestamp::new(at))
}

pub struct Harness {
    pub repo: Arc<Repository>,
    pub admin: Arc<AdminGate>,
    pub registry: Arc<AssetRegistry>,
    pub ledger: Arc<PositionLedger>,
    pub oracle: MockPriceOracle,
    pub custody: InMemoryCustody,
    pub token: InMemoryRewardToken,
    _temp: TempDir,
}

/// Ledger with a 0.0001 reward rate over 3-decimal reward units, mint
/// settlement and strict custody.
pub async fn setup() -> Harness {
    setup_with(RewardRate::new(1, 4), 3, SettlementStrategy::Mint).await
}

pub async fn setup_with(
    reward_rate: RewardRate,
    reward_decimals: u32,
    strategy: SettlementStrategy,
) -> Harness {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir
        .path()
        .join("test.db")
        .to_string_lossy()
        .to_string();
    let pool = init_db(&db_path).await.expect("init_db failed");
    let repo = Arc::new(Repository::new(pool));

    let admin = Arc::new(AdminGate::new(owner()));
    let registry = Arc::new(AssetRegistry::new(repo.clone(), admin.clone()));
    let oracle = MockPriceOracle::new();
    let custody = InMemoryCustody::new();
    let token = InMemoryRewardToken::new();

    let ledger = Arc::new(PositionLedger::new(
        repo.clone(),
        registry.clone(),
        admin.clone(),
        OracleAdapter::new(Arc::new(oracle.clone()), MAX_STALENESS_SECS),
        Arc::new(custody.clone()),
        RewardSettlement::new(Arc::new(token.clone()), strategy),
        LedgerSettings {
            reward_rate,
            reward_decimals,
        },
    ));

    Harness {
        repo,
        admin,
        registry,
        ledger,
        oracle,
        custody,
        token,
        _temp: temp_dir,
    }
}

impl Harness {
    /// Register the native coin (18 decimals) on the ETH feed.
    pub async fn register_native(&self) {
        self.registry
            .register(
                &ctx(&owner(), 0),
                AssetDescriptor::new(
                    AssetId::native(),
                    18,
                    "ETH",
                    OracleHandle::new(ETH_FEED),
                    Timestamp::new(0),
                ),
            )
            .await
            .unwrap();
    }

    /// Register USDC (6 decimals) on the USDC feed.
    pub async fn register_usdc(&self) {
        self.registry
            .register(
                &ctx(&owner(), 0),
                AssetDescriptor::new(
                    usdc(),
                    6,
                    "USDC",
                    OracleHandle::new(USDC_FEED),
                    Timestamp::new(0),
                ),
            )
            .await
            .unwrap();
    }

    pub fn set_price(&self, feed: &str, price: u128, scale: u32, observed_at: i64) {
        self.oracle.set_price(
            OracleHandle::new(feed),
            price,
            scale,
            Timestamp::new(observed_at),
        );
    }

    pub fn fund(&self, who: &Address, asset: &AssetId, amount: u128) {
        self.custody
            .fund(who, &AssetKind::for_asset(asset), amount);
    }

    pub fn wallet(&self, who: &Address, asset: &AssetId) -> u128 {
        self.custody
            .wallet_balance(who, &AssetKind::for_asset(asset))
    }
}
