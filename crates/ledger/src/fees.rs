//! Per-asset fee schedules and deposit capacity.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::LedgerError;
use crate::types::{Amount, AssetId};

/// Flat fee per operation, in the asset's smallest unit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeSchedule {
    #[serde(default)]
    pub deposit: Amount,
    #[serde(default)]
    pub spend: Amount,
    #[serde(default)]
    pub withdraw: Amount,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetConfig {
    #[serde(default)]
    pub fees: FeeSchedule,
    /// Cap on the pool's balance of this asset after a deposit
    #[serde(default = "unbounded")]
    pub max_tvl: Amount,
}

fn unbounded() -> Amount {
    Amount::MAX
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            fees: FeeSchedule::default(),
            max_tvl: unbounded(),
        }
    }
}

/// Registry of supported assets. An asset is supported once it has a
/// configuration; the zero address never is.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FeeLedger {
    assets: HashMap<AssetId, AssetConfig>,
}

impl FeeLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, asset: AssetId, config: AssetConfig) -> Result<(), LedgerError> {
        if asset.is_zero() {
            return Err(LedgerError::InvalidAsset(asset));
        }
        info!(%asset, ?config, "asset registered");
        self.assets.insert(asset, config);
        Ok(())
    }

    /// Replace the fee schedule, registering the asset if needed.
    pub fn set_fee_schedule(&mut self, asset: AssetId, fees: FeeSchedule) -> Result<(), LedgerError> {
        let mut config = self.assets.get(&asset).copied().unwrap_or_default();
        config.fees = fees;
        self.register(asset, config)
    }

    pub fn set_max_tvl(&mut self, asset: AssetId, max_tvl: Amount) -> Result<(), LedgerError> {
        let mut config = self.assets.get(&asset).copied().unwrap_or_default();
        config.max_tvl = max_tvl;
        self.register(asset, config)
    }

    pub fn config(&self, asset: AssetId) -> Result<&AssetConfig, LedgerError> {
        if asset.is_zero() {
            return Err(LedgerError::InvalidAsset(asset));
        }
        self.assets.get(&asset).ok_or(LedgerError::InvalidAsset(asset))
    }

    pub fn fees(&self, asset: AssetId) -> Result<FeeSchedule, LedgerError> {
        self.config(asset).map(|c| c.fees)
    }

    pub fn assets(&self) -> impl Iterator<Item = (&AssetId, &AssetConfig)> {
        self.assets.iter()
    }

    /// Fails when `balance + incoming` would exceed the asset's cap.
    pub fn check_capacity(
        &self,
        asset: AssetId,
        balance: Amount,
        incoming: Amount,
    ) -> Result<(), LedgerError> {
        let max_tvl = self.config(asset)?.max_tvl;
        match balance.checked_add(incoming) {
            Some(after) if after <= max_tvl => Ok(()),
            _ => Err(LedgerError::CapacityExceeded {
                balance,
                incoming,
                max_tvl,
            }),
        }
    }
}
