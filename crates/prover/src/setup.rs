//! Trusted setup utilities for generating proving and verifying keys.

use std::collections::BTreeMap;
use std::path::Path;

use ark_bn254::Bn254;
use ark_groth16::{Groth16, ProvingKey, VerifyingKey};
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use ark_snark::SNARK;
use ark_std::rand::{rngs::StdRng, CryptoRng, RngCore, SeedableRng};
use rayon::prelude::*;
use thiserror::Error;
use tracing::info;

use zeroledger_circuits::{DepositCircuit, SpendCircuit};
use zeroledger_ledger::{Circuit, CircuitKind};

/// Errors that can occur during setup
#[derive(Error, Debug)]
pub enum SetupError {
    #[error("Circuit setup failed: {0}")]
    CircuitSetup(String),
    #[error("Serialization failed: {0}")]
    Serialization(String),
    #[error("Deserialization failed: {0}")]
    Deserialization(String),
    #[error("No keys for circuit {0}")]
    MissingKey(Circuit),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Keys for a single circuit
#[derive(Clone)]
pub struct CircuitKeyPair {
    pub proving_key: ProvingKey<Bn254>,
    pub verifying_key: VerifyingKey<Bn254>,
}

impl CircuitKeyPair {
    /// Serialize proving key to bytes
    pub fn serialize_pk(&self) -> Result<Vec<u8>, SetupError> {
        let mut bytes = Vec::new();
        self.proving_key
            .serialize_compressed(&mut bytes)
            .map_err(|e| SetupError::Serialization(e.to_string()))?;
        Ok(bytes)
    }

    /// Serialize verifying key to bytes
    pub fn serialize_vk(&self) -> Result<Vec<u8>, SetupError> {
        let mut bytes = Vec::new();
        self.verifying_key
            .serialize_compressed(&mut bytes)
            .map_err(|e| SetupError::Serialization(e.to_string()))?;
        Ok(bytes)
    }

    pub fn deserialize_pk(bytes: &[u8]) -> Result<ProvingKey<Bn254>, SetupError> {
        ProvingKey::deserialize_compressed(bytes)
            .map_err(|e| SetupError::Deserialization(e.to_string()))
    }

    pub fn deserialize_vk(bytes: &[u8]) -> Result<VerifyingKey<Bn254>, SetupError> {
        VerifyingKey::deserialize_compressed(bytes)
            .map_err(|e| SetupError::Deserialization(e.to_string()))
    }
}

/// Key pairs indexed by circuit. Files are named `<circuit>.pk` / `<circuit>.vk`.
#[derive(Clone, Default)]
pub struct CircuitKeys {
    keys: BTreeMap<Circuit, CircuitKeyPair>,
}

impl CircuitKeys {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, circuit: Circuit, pair: CircuitKeyPair) {
        self.keys.insert(circuit, pair);
    }

    pub fn get(&self, circuit: Circuit) -> Result<&CircuitKeyPair, SetupError> {
        self.keys.get(&circuit).ok_or(SetupError::MissingKey(circuit))
    }

    pub fn circuits(&self) -> impl Iterator<Item = Circuit> + '_ {
        self.keys.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Circuit, &CircuitKeyPair)> {
        self.keys.iter().map(|(c, k)| (*c, k))
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Save all keys to a directory
    pub fn save_to_directory(&self, dir: &Path) -> Result<(), SetupError> {
        std::fs::create_dir_all(dir)?;
        for (circuit, pair) in &self.keys {
            std::fs::write(dir.join(format!("{}.pk", circuit)), pair.serialize_pk()?)?;
            std::fs::write(dir.join(format!("{}.vk", circuit)), pair.serialize_vk()?)?;
        }
        Ok(())
    }

    /// Load every circuit whose key files are present in `dir`.
    pub fn load_from_directory(dir: &Path) -> Result<Self, SetupError> {
        let mut keys = Self::new();
        for circuit in Circuit::ALL {
            let pk_path = dir.join(format!("{}.pk", circuit));
            let vk_path = dir.join(format!("{}.vk", circuit));
            if !pk_path.exists() || !vk_path.exists() {
                continue;
            }
            let pair = CircuitKeyPair {
                proving_key: CircuitKeyPair::deserialize_pk(&std::fs::read(&pk_path)?)?,
                verifying_key: CircuitKeyPair::deserialize_vk(&std::fs::read(&vk_path)?)?,
            };
            keys.insert(circuit, pair);
        }
        Ok(keys)
    }
}

/// Run setup for one circuit shape.
pub fn setup_circuit<R: RngCore + CryptoRng>(
    circuit: Circuit,
    rng: &mut R,
) -> Result<CircuitKeyPair, SetupError> {
    let (pk, vk) = match circuit.kind() {
        CircuitKind::Deposit => {
            Groth16::<Bn254>::circuit_specific_setup(DepositCircuit::empty(), rng)
        }
        CircuitKind::Spend => {
            let (inputs, outputs) = circuit.arity();
            Groth16::<Bn254>::circuit_specific_setup(SpendCircuit::empty(inputs, outputs), rng)
        }
    }
    .map_err(|e| SetupError::CircuitSetup(format!("{}: {}", circuit, e)))?;

    Ok(CircuitKeyPair {
        proving_key: pk,
        verifying_key: vk,
    })
}

/// Set up `circuits` in parallel. Each circuit gets its own rng derived from
/// `seed`, so the result does not depend on scheduling.
pub fn setup_circuits(circuits: &[Circuit], seed: u64) -> Result<CircuitKeys, SetupError> {
    let pairs = circuits
        .par_iter()
        .enumerate()
        .map(|(i, &circuit)| {
            let mut rng = StdRng::seed_from_u64(seed.wrapping_add(i as u64));
            info!(%circuit, "running setup");
            setup_circuit(circuit, &mut rng).map(|pair| (circuit, pair))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut keys = CircuitKeys::new();
    for (circuit, pair) in pairs {
        keys.insert(circuit, pair);
    }
    Ok(keys)
}

/// Run trusted setup for all circuits
pub fn setup_all_circuits() -> Result<CircuitKeys, SetupError> {
    // Fixed seed for reproducible keys (in production, use a ceremony)
    setup_circuits(&Circuit::ALL, 42)
}
