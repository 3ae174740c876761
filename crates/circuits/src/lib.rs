//! Circuits for the zeroledger shielded pool.
//!
//! This crate provides:
//! - Poseidon hashing over BN254, natively and in-circuit
//! - Note commitments `Poseidon(amount, blinding)` and their byte encoding
//! - `DepositCircuit`: a public total split into three hidden notes
//! - `SpendCircuit`: `n` hidden notes into `m` hidden notes plus a public amount

pub mod commitment;
pub mod deposit;
pub mod poseidon;
pub mod range_check;
pub mod spend;


pub use commitment::{
    blinding_from_bytes, commitment_hash, commitment_hash_bytes, fr_from_bytes, fr_to_bytes,
    NoteOpening,
};
pub use deposit::{DepositCircuit, DEPOSIT_OUTPUTS};
pub use range_check::AMOUNT_BITS;
pub use spend::SpendCircuit;

use ark_bn254::Fr;

/// Common type aliases
pub type ConstraintF = Fr;
