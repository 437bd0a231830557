use anyhow::Context;
use stakeledger::config::{Config, RewardSettlementMode};
use stakeledger::ledger::LedgerSettings;
use stakeledger::{
    api, init_db, AdminGate, AssetRegistry, HttpPriceOracle, InMemoryCustody, InMemoryRewardToken,
    OracleAdapter, PositionLedger, Repository, RewardSettlement, SettlementStrategy,
};
use std::net::SocketAddr;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into()),
        )
        .init();

    let config = Config::from_env().context("Configuration error")?;
    let port = config.port;

    let pool = init_db(&config.database_path)
        .await
        .context("Failed to initialize database")?;
    let repo = Arc::new(Repository::new(pool));

    let admin = Arc::new(AdminGate::new(config.admin_address.clone()));
    let registry = Arc::new(AssetRegistry::new(repo.clone(), admin.clone()));

    let oracle = OracleAdapter::new(
        Arc::new(HttpPriceOracle::new(config.price_feed_url.clone())),
        config.max_staleness_secs,
    );

    // No chain is attached: custody and the reward token live in process.
    let custody = Arc::new(InMemoryCustody::open());
    let token = InMemoryRewardToken::new();
    let strategy = match &config.reward_settlement {
        RewardSettlementMode::Mint => SettlementStrategy::Mint,
        RewardSettlementMode::Treasury(treasury) => {
            token.fund(treasury, u128::MAX / 2);
            SettlementStrategy::Treasury(treasury.clone())
        }
    };
    let settlement = RewardSettlement::new(Arc::new(token), strategy);

    let ledger = Arc::new(PositionLedger::new(
        repo,
        registry.clone(),
        admin.clone(),
        oracle,
        custody,
        settlement,
        LedgerSettings {
            reward_rate: config.reward_rate,
            reward_decimals: config.reward_decimals,
        },
    ));

    let app = api::create_router(api::AppState::new(ledger, registry, admin, config));

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
