//! Note commitments.
//!
//! A note hides an `amount` behind a 32-byte blinding secret:
//!
//! ```text
//! commitment = Poseidon(amount, blinding)
//! ```
//!
//! The ledger only ever stores the commitment; the opening `(amount, blinding)`
//! stays with the note holder until it is spent inside a proof or revealed in a
//! withdrawal.

use ark_bn254::Fr;
use ark_ff::{BigInteger, PrimeField};
use ark_r1cs_std::fields::fp::FpVar;
use ark_relations::r1cs::{ConstraintSystemRef, SynthesisError};
use ark_serialize::CanonicalDeserialize;

use crate::poseidon::{poseidon_hash_two, poseidon_hash_two_var};

/// Everything needed to reproduce a commitment.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NoteOpening {
    pub amount: u128,
    pub blinding: Fr,
}

impl NoteOpening {
    pub fn new(amount: u128, blinding: Fr) -> Self {
        Self { amount, blinding }
    }

    /// Opening with the blinding given as raw secret bytes.
    pub fn from_secret(amount: u128, secret: &[u8; 32]) -> Self {
        Self::new(amount, blinding_from_bytes(secret))
    }

    pub fn commitment(&self) -> Fr {
        commitment_hash(self.amount, self.blinding)
    }

    /// Placeholder opening used to shape circuits during setup.
    pub fn zero() -> Self {
        Self::new(0, Fr::from(0u64))
    }
}

/// `Poseidon(amount, blinding)`
pub fn commitment_hash(amount: u128, blinding: Fr) -> Fr {
    poseidon_hash_two(Fr::from(amount), blinding)
}

/// Commitment computed in-circuit from witness variables.
pub fn commitment_hash_var(
    cs: ConstraintSystemRef<Fr>,
    amount: &FpVar<Fr>,
    blinding: &FpVar<Fr>,
) -> Result<FpVar<Fr>, SynthesisError> {
    poseidon_hash_two_var(cs, amount, blinding)
}

/// Commitment over raw bytes, as the ledger sees it during withdrawal.
pub fn commitment_hash_bytes(amount: u128, secret: &[u8; 32]) -> [u8; 32] {
    fr_to_bytes(&NoteOpening::from_secret(amount, secret).commitment())
}

/// Reduce a 32-byte secret into the scalar field (little-endian).
pub fn blinding_from_bytes(secret: &[u8; 32]) -> Fr {
    Fr::from_le_bytes_mod_order(secret)
}

/// Canonical little-endian encoding of a field element.
pub fn fr_to_bytes(value: &Fr) -> [u8; 32] {
    let mut out = [0u8; 32];
    let le = value.into_bigint().to_bytes_le();
    out[..le.len()].copy_from_slice(&le);
    out
}

/// Strict decoding: non-canonical encodings (>= modulus) are rejected.
pub fn fr_from_bytes(bytes: &[u8; 32]) -> Option<Fr> {
    Fr::deserialize_compressed(&bytes[..]).ok()
}
