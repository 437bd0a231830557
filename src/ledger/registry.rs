//! Registry of stakeable assets.

use super::{AdminGate, CallContext, LedgerError};
use crate::db::Repository;
use crate::domain::{AssetDescriptor, AssetId, AssetKind, OracleHandle, MAX_ASSET_DECIMALS};
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Clone)]
pub struct AssetRegistry {
    repo: Arc<Repository>,
    admin: Arc<AdminGate>,
}

impl AssetRegistry {
    pub fn new(repo: Arc<Repository>, admin: Arc<AdminGate>) -> Self {
        Self { repo, admin }
    }

    /// Register a new asset. `registered_at` is taken from the call context.
    ///
    /// # Errors
    /// - `NotAuthorized` unless the caller is the owner
    /// - `InvalidAsset` for bad decimals, symbol, oracle or kind
    /// - `AlreadyRegistered` if the id is taken
    pub async fn register(
        &self,
        ctx: &CallContext,
        descriptor: AssetDescriptor,
    ) -> Result<AssetDescriptor, LedgerError> {
        self.admin.require_admin(&ctx.caller)?;
        validate(&descriptor)?;

        let descriptor = AssetDescriptor {
            registered_at: ctx.now,
            disabled: false,
            ..descriptor
        };
        if !self.repo.insert_asset(&descriptor).await? {
            return Err(LedgerError::AlreadyRegistered(descriptor.asset_id));
        }

        info!(
            asset = %descriptor.asset_id,
            symbol = %descriptor.symbol,
            kind = descriptor.kind.label(),
            decimals = descriptor.decimals,
            "Registered asset"
        );
        Ok(descriptor)
    }

    /// # Errors
    /// `UnknownAsset` if the id was never registered.
    pub async fn resolve(&self, asset_id: &AssetId) -> Result<AssetDescriptor, LedgerError> {
        self.repo
            .get_asset(asset_id)
            .await?
            .ok_or_else(|| LedgerError::UnknownAsset(asset_id.clone()))
    }

    /// Point an asset at a new price feed. Stored position valuations are
    /// left as they are.
    pub async fn rebind_oracle(
        &self,
        ctx: &CallContext,
        asset_id: &AssetId,
        oracle: OracleHandle,
    ) -> Result<AssetDescriptor, LedgerError> {
        self.admin.require_admin(&ctx.caller)?;
        if oracle.as_str().trim().is_empty() {
            return Err(LedgerError::InvalidAsset("oracle handle cannot be empty".to_string()));
        }
        if !self.repo.update_asset_oracle(asset_id, &oracle).await? {
            return Err(LedgerError::UnknownAsset(asset_id.clone()));
        }
        info!(asset = %asset_id, oracle = %oracle, "Rebound oracle");
        self.resolve(asset_id).await
    }

    pub async fn set_disabled(
        &self,
        ctx: &CallContext,
        asset_id: &AssetId,
        disabled: bool,
    ) -> Result<AssetDescriptor, LedgerError> {
        self.admin.require_admin(&ctx.caller)?;
        if !self.repo.update_asset_disabled(asset_id, disabled).await? {
            return Err(LedgerError::UnknownAsset(asset_id.clone()));
        }
        info!(asset = %asset_id, disabled, "Updated asset deposit switch");
        self.resolve(asset_id).await
    }

    pub async fn list(&self) -> Result<Vec<AssetDescriptor>, LedgerError> {
        Ok(self.repo.list_assets().await?)
    }
}

fn validate(descriptor: &AssetDescriptor) -> Result<(), LedgerError> {
    if descriptor.decimals > MAX_ASSET_DECIMALS {
        return Err(LedgerError::InvalidAsset(format!(
            "decimals must be at most {}, got {}",
            MAX_ASSET_DECIMALS, descriptor.decimals
        )));
    }
    if descriptor.symbol.trim().is_empty() {
        return Err(LedgerError::InvalidAsset("symbol cannot be empty".to_string()));
    }
    if descriptor.oracle.as_str().trim().is_empty() {
        return Err(LedgerError::InvalidAsset("oracle handle cannot be empty".to_string()));
    }
    if descriptor.kind != AssetKind::for_asset(&descriptor.asset_id) {
        return Err(LedgerError::InvalidAsset(format!(
            "kind {} does not match asset id {}",
            descriptor.kind.label(),
            descriptor.asset_id
        )));
    }
    Ok(())
}
