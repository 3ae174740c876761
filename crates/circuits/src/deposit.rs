//! Deposit circuit: one public total split into three hidden notes.
//!
//! Public inputs, in allocation order:
//! - `hash_1`, `hash_2`, `hash_3`: the output commitments
//! - `total_amount`: the value entering the pool
//!
//! Witnesses: the three openings `(amount_i, blinding_i)`.
//!
//! Constraints:
//! - `hash_i == Poseidon(amount_i, blinding_i)`
//! - every `amount_i` fits in 128 bits
//! - `amount_1 + amount_2 + amount_3 == total_amount`

use ark_bn254::Fr;
use ark_r1cs_std::fields::fp::FpVar;
use ark_r1cs_std::prelude::*;
use ark_relations::r1cs::{ConstraintSynthesizer, ConstraintSystemRef, SynthesisError};

use crate::commitment::{commitment_hash_var, NoteOpening};
use crate::range_check::enforce_amount;

/// Number of notes a deposit creates
pub const DEPOSIT_OUTPUTS: usize = 3;

#[derive(Clone, Debug)]
pub struct DepositCircuit {
    /// Output commitments (public)
    pub hashes: [Fr; DEPOSIT_OUTPUTS],
    /// Declared deposit total (public)
    pub total_amount: u128,
    /// Note openings (witness)
    pub openings: [NoteOpening; DEPOSIT_OUTPUTS],
}

impl DepositCircuit {
    /// Circuit shape for key generation.
    pub fn empty() -> Self {
        Self {
            hashes: [Fr::from(0u64); DEPOSIT_OUTPUTS],
            total_amount: 0,
            openings: [NoteOpening::zero(); DEPOSIT_OUTPUTS],
        }
    }

    /// Build a circuit from the openings and the claimed total.
    ///
    /// The total is taken as given so that a prover can be asked to prove a
    /// wrong sum; such a circuit is simply unsatisfiable.
    pub fn new(openings: [NoteOpening; DEPOSIT_OUTPUTS], total_amount: u128) -> Self {
        let hashes = openings.map(|o| o.commitment());
        Self {
            hashes,
            total_amount,
            openings,
        }
    }

    /// Public inputs in the order the verifier expects.
    pub fn public_inputs(&self) -> Vec<Fr> {
        let mut inputs = self.hashes.to_vec();
        inputs.push(Fr::from(self.total_amount));
        inputs
    }
}

impl ConstraintSynthesizer<Fr> for DepositCircuit {
    fn generate_constraints(self, cs: ConstraintSystemRef<Fr>) -> Result<(), SynthesisError> {
        let hash_vars = self
            .hashes
            .iter()
            .map(|h| FpVar::new_input(cs.clone(), || Ok(*h)))
            .collect::<Result<Vec<_>, _>>()?;
        let total_var = FpVar::new_input(cs.clone(), || Ok(Fr::from(self.total_amount)))?;

        let mut sum = FpVar::<Fr>::zero();
        for (opening, hash_var) in self.openings.iter().zip(hash_vars.iter()) {
            let amount = FpVar::new_witness(cs.clone(), || Ok(Fr::from(opening.amount)))?;
            let blinding = FpVar::new_witness(cs.clone(), || Ok(opening.blinding))?;

            enforce_amount(&amount)?;
            commitment_hash_var(cs.clone(), &amount, &blinding)?.enforce_equal(hash_var)?;

            sum += &amount;
        }

        sum.enforce_equal(&total_var)?;

        Ok(())
    }
}
