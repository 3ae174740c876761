//! Groth16 tooling for the zeroledger circuits.
//!
//! This crate provides utilities for:
//! - Trusted setup for every supported circuit shape
//! - Deposit and spend proof generation
//! - A [`Groth16Oracle`] the ledger can verify proofs with

pub mod prove;
pub mod setup;
pub mod verify;


pub use prove::{prove_deposit, prove_spend, ProofWithInputs, ProveError};
pub use setup::{setup_all_circuits, setup_circuits, CircuitKeyPair, CircuitKeys, SetupError};
pub use verify::{verify_proof, Groth16Oracle, VerifyError};
pub use zeroledger_ledger::Circuit;

use ark_bn254::Fr;

/// Common field type for all operations
pub type ConstraintF = Fr;
