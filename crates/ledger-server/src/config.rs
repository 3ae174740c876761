//! Server configuration.
//!
//! Process settings come from environment variables; the initial ledger
//! state (pool account, supported assets, fees, genesis balances) comes from
//! a JSON file.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use zeroledger_ledger::{
    Address, Amount, AssetConfig, AssetId, BankError, FeeSchedule, Forwarder, Ledger,
    LedgerError, MemoryBank, ProofOracle,
};

pub const ADDR_ENV: &str = "ZEROLEDGER_ADDR";
pub const KEYS_DIR_ENV: &str = "ZEROLEDGER_KEYS_DIR";
pub const LEDGER_CONFIG_ENV: &str = "ZEROLEDGER_LEDGER_CONFIG";
pub const ENABLE_PROVER_ENV: &str = "ZEROLEDGER_ENABLE_PROVER";

const DEFAULT_ADDR: &str = "0.0.0.0:3001";
const DEFAULT_KEYS_DIR: &str = "keys";
const DEFAULT_LEDGER_CONFIG: &str = "ledger.json";
const DEFAULT_DOMAIN: &str = "zeroledger";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {var}: {reason}")]
    InvalidVar { var: &'static str, reason: String },
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse ledger config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error("genesis balance: {0}")]
    Bank(#[from] BankError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    pub keys_dir: PathBuf,
    pub ledger_config: PathBuf,
    /// Serve the proving endpoints and run setup when keys are missing
    pub enable_prover: bool,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let addr = lookup(ADDR_ENV)
            .unwrap_or_else(|| DEFAULT_ADDR.to_string())
            .parse()
            .map_err(|e: std::net::AddrParseError| ConfigError::InvalidVar {
                var: ADDR_ENV,
                reason: e.to_string(),
            })?;

        let enable_prover = match lookup(ENABLE_PROVER_ENV).as_deref() {
            None => true,
            Some("1") | Some("true") | Some("yes") => true,
            Some("0") | Some("false") | Some("no") => false,
            Some(other) => {
                return Err(ConfigError::InvalidVar {
                    var: ENABLE_PROVER_ENV,
                    reason: format!("expected a boolean, got {:?}", other),
                })
            }
        };

        Ok(Self {
            addr,
            keys_dir: lookup(KEYS_DIR_ENV)
                .unwrap_or_else(|| DEFAULT_KEYS_DIR.to_string())
                .into(),
            ledger_config: lookup(LEDGER_CONFIG_ENV)
                .unwrap_or_else(|| DEFAULT_LEDGER_CONFIG.to_string())
                .into(),
            enable_prover,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetEntry {
    pub asset: AssetId,
    #[serde(default)]
    pub fees: FeeSchedule,
    /// Unbounded when absent
    #[serde(default)]
    pub max_tvl: Option<Amount>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisBalance {
    pub asset: AssetId,
    pub holder: Address,
    pub amount: Amount,
}

/// Initial ledger state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    pub pool: Address,
    pub fee_sink: Address,
    #[serde(default = "default_domain")]
    pub forwarder_domain: String,
    #[serde(default)]
    pub assets: Vec<AssetEntry>,
    #[serde(default)]
    pub balances: Vec<GenesisBalance>,
}

fn default_domain() -> String {
    DEFAULT_DOMAIN.to_string()
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            pool: Address([0xee; 20]),
            fee_sink: Address([0xfe; 20]),
            forwarder_domain: default_domain(),
            assets: Vec::new(),
            balances: Vec::new(),
        }
    }
}

impl LedgerConfig {
    /// Read the config file, falling back to an empty ledger when it does
    /// not exist.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            warn!(path = %path.display(), "ledger config not found, starting with no assets");
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn build<O: ProofOracle>(
        &self,
        oracle: O,
    ) -> Result<(Ledger<O, MemoryBank>, Forwarder), ConfigError> {
        let mut bank = MemoryBank::new();
        for genesis in &self.balances {
            bank.mint(genesis.asset, genesis.holder, genesis.amount)?;
        }

        let mut ledger = Ledger::new(self.pool, self.fee_sink, oracle, bank);
        for entry in &self.assets {
            ledger.fees_mut().register(
                entry.asset,
                AssetConfig {
                    fees: entry.fees,
                    max_tvl: entry.max_tvl.unwrap_or(Amount::MAX),
                },
            )?;
        }
        info!(
            pool = %self.pool,
            assets = self.assets.len(),
            domain = %self.forwarder_domain,
            "ledger initialised"
        );

        Ok((ledger, Forwarder::new(self.forwarder_domain.clone())))
    }
}
