use crate::domain::{Address, RewardRate};
use std::collections::HashMap;
use std::str::FromStr;
use thiserror::Error;

/// Upper bound on reward-token precision.
pub const MAX_REWARD_DECIMALS: u32 = 30;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_path: String,
    pub price_feed_url: String,
    pub admin_address: Address,
    pub max_staleness_secs: u64,
    pub reward_rate: RewardRate,
    pub reward_decimals: u32,
    pub reward_settlement: RewardSettlementMode,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RewardSettlementMode {
    Mint,
    Treasury(Address),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let port = env_map
            .get("PORT")
            .map(|s| s.as_str())
            .unwrap_or("8080")
            .parse::<u16>()
            .map_err(|_| {
                ConfigError::InvalidValue("PORT".to_string(), "must be a valid u16".to_string())
            })?;

        let database_path = required(&env_map, "DATABASE_PATH")?;
        let price_feed_url = required(&env_map, "PRICE_FEED_URL")?;
        let admin_address = parse_address(&env_map, "ADMIN_ADDRESS")?;

        let max_staleness_secs = env_map
            .get("MAX_STALENESS_SECS")
            .map(|s| s.as_str())
            .unwrap_or("3600")
            .parse::<u64>()
            .map_err(|_| {
                ConfigError::InvalidValue(
                    "MAX_STALENESS_SECS".to_string(),
                    "must be a valid u64".to_string(),
                )
            })?;

        let rate_str = env_map
            .get("REWARD_RATE")
            .map(|s| s.as_str())
            .unwrap_or("0.0001");
        let reward_rate = RewardRate::parse(rate_str).ok_or_else(|| {
            ConfigError::InvalidValue(
                "REWARD_RATE".to_string(),
                format!("must be a non-negative decimal, got {}", rate_str),
            )
        })?;

        let reward_decimals = env_map
            .get("REWARD_DECIMALS")
            .map(|s| s.as_str())
            .unwrap_or("18")
            .parse::<u32>()
            .ok()
            .filter(|d| *d <= MAX_REWARD_DECIMALS)
            .ok_or_else(|| {
                ConfigError::InvalidValue(
                    "REWARD_DECIMALS".to_string(),
                    format!("must be an integer between 0 and {}", MAX_REWARD_DECIMALS),
                )
            })?;

        let reward_settlement = match env_map
            .get("REWARD_SETTLEMENT")
            .map(|s| s.as_str())
            .unwrap_or("mint")
        {
            "mint" => RewardSettlementMode::Mint,
            "treasury" => {
                RewardSettlementMode::Treasury(parse_address(&env_map, "REWARD_TREASURY")?)
            }
            other => {
                return Err(ConfigError::InvalidValue(
                    "REWARD_SETTLEMENT".to_string(),
                    format!("must be mint or treasury, got {}", other),
                ))
            }
        };

        Ok(Config {
            port,
            database_path,
            price_feed_url,
            admin_address,
            max_staleness_secs,
            reward_rate,
            reward_decimals,
            reward_settlement,
        })
    }
}

fn required(env_map: &HashMap<String, String>, key: &str) -> Result<String, ConfigError> {
    env_map
        .get(key)
        .cloned()
        .ok_or_else(|| ConfigError::MissingEnv(key.to_string()))
}

fn parse_address(env_map: &HashMap<String, String>, key: &str) -> Result<Address, ConfigError> {
    let raw = required(env_map, key)?;
    Address::from_str(&raw).map_err(|e| ConfigError::InvalidValue(key.to_string(), e.to_string()))
}
