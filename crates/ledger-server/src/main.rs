//! HTTP API server for the zeroledger pool.

use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod config;
mod handlers;
mod routes;

use config::{LedgerConfig, ServerConfig};
use zeroledger_ledger::{Forwarder, Ledger, MemoryBank, ProofOracle};
use zeroledger_prover::setup::{setup_all_circuits, CircuitKeys};
use zeroledger_prover::Groth16Oracle;

pub type DynOracle = Box<dyn ProofOracle + Send + Sync>;

/// Application state shared across handlers
pub struct AppState {
    /// Proving keys; `None` when proving is disabled
    pub keys: Option<Arc<CircuitKeys>>,
    pub ledger: Ledger<DynOracle, MemoryBank>,
    pub forwarder: Forwarder,
}

pub type SharedState = Arc<RwLock<AppState>>;

#[tokio::main(flavor = "multi_thread", worker_threads = 2)]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig::from_env()?;
    info!(?config, "starting zeroledger server");

    let keys = load_keys(&config)?;
    let oracle: DynOracle = Box::new(Groth16Oracle::new(&keys)?);
    let (ledger, forwarder) = LedgerConfig::load(&config.ledger_config)?.build(oracle)?;

    let state = Arc::new(RwLock::new(AppState {
        keys: (config.enable_prover && !keys.is_empty()).then(|| Arc::new(keys)),
        ledger,
        forwarder,
    }));

    let app = routes::app(state);

    info!(addr = %config.addr, "listening");
    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

/// Load circuit keys, running setup when they are missing and proving is on.
fn load_keys(config: &ServerConfig) -> Result<CircuitKeys, Box<dyn std::error::Error>> {
    let keys_dir = config.keys_dir.as_path();
    if keys_dir.exists() {
        info!(dir = %keys_dir.display(), "loading circuit keys");
        let keys = CircuitKeys::load_from_directory(keys_dir)?;
        info!(circuits = keys.len(), "circuit keys loaded");
        return Ok(keys);
    }

    if !config.enable_prover {
        info!("no circuit keys and prover disabled; proofs cannot be verified");
        return Ok(CircuitKeys::new());
    }

    info!("running trusted setup (this may take a while)");
    let keys = setup_all_circuits()?;
    keys.save_to_directory(keys_dir)?;
    info!(dir = %keys_dir.display(), "circuit keys saved");
    Ok(keys)
}
