//! Spend circuit: `n` hidden input notes into `m` hidden output notes plus a
//! public amount leaving the pool.
//!
//! Public inputs, in allocation order:
//! - `input_hash_1 .. input_hash_n`
//! - `output_hash_1 .. output_hash_m`
//! - `public_amount` (public payouts plus fees)
//!
//! Constraints:
//! - every hash matches its opening under Poseidon
//! - every amount, and `public_amount`, fits in 128 bits
//! - `Σ input amounts == Σ output amounts + public_amount`
//!
//! The arity is fixed per proving key; the same struct is instantiated for
//! every `(n, m)` the ledger supports.

use ark_bn254::Fr;
use ark_r1cs_std::fields::fp::FpVar;
use ark_r1cs_std::prelude::*;
use ark_relations::r1cs::{ConstraintSynthesizer, ConstraintSystemRef, SynthesisError};

use crate::commitment::{commitment_hash_var, NoteOpening};
use crate::range_check::enforce_amount;

#[derive(Clone, Debug)]
pub struct SpendCircuit {
    pub input_hashes: Vec<Fr>,
    pub output_hashes: Vec<Fr>,
    pub public_amount: u128,
    pub inputs: Vec<NoteOpening>,
    pub outputs: Vec<NoteOpening>,
}

impl SpendCircuit {
    /// Circuit shape for key generation.
    pub fn empty(num_inputs: usize, num_outputs: usize) -> Self {
        Self::new(
            vec![NoteOpening::zero(); num_inputs],
            vec![NoteOpening::zero(); num_outputs],
            0,
        )
    }

    pub fn new(inputs: Vec<NoteOpening>, outputs: Vec<NoteOpening>, public_amount: u128) -> Self {
        Self {
            input_hashes: inputs.iter().map(NoteOpening::commitment).collect(),
            output_hashes: outputs.iter().map(NoteOpening::commitment).collect(),
            public_amount,
            inputs,
            outputs,
        }
    }

    pub fn arity(&self) -> (usize, usize) {
        (self.inputs.len(), self.outputs.len())
    }

    /// Public inputs in the order the verifier expects.
    pub fn public_inputs(&self) -> Vec<Fr> {
        self.input_hashes
            .iter()
            .chain(self.output_hashes.iter())
            .copied()
            .chain(std::iter::once(Fr::from(self.public_amount)))
            .collect()
    }
}

/// Allocate the notes, bind them to their public hashes and return their sum.
fn sum_notes(
    cs: ConstraintSystemRef<Fr>,
    notes: &[NoteOpening],
    hashes: &[FpVar<Fr>],
) -> Result<FpVar<Fr>, SynthesisError> {
    if notes.len() != hashes.len() {
        return Err(SynthesisError::Unsatisfiable);
    }

    let mut sum = FpVar::<Fr>::zero();
    for (note, hash_var) in notes.iter().zip(hashes) {
        let amount = FpVar::new_witness(cs.clone(), || Ok(Fr::from(note.amount)))?;
        let blinding = FpVar::new_witness(cs.clone(), || Ok(note.blinding))?;

        enforce_amount(&amount)?;
        commitment_hash_var(cs.clone(), &amount, &blinding)?.enforce_equal(hash_var)?;

        sum += &amount;
    }
    Ok(sum)
}

impl ConstraintSynthesizer<Fr> for SpendCircuit {
    fn generate_constraints(self, cs: ConstraintSystemRef<Fr>) -> Result<(), SynthesisError> {
        // Order matters: inputs, outputs, public amount
        let input_hash_vars = self
            .input_hashes
            .iter()
            .map(|h| FpVar::new_input(cs.clone(), || Ok(*h)))
            .collect::<Result<Vec<_>, _>>()?;
        let output_hash_vars = self
            .output_hashes
            .iter()
            .map(|h| FpVar::new_input(cs.clone(), || Ok(*h)))
            .collect::<Result<Vec<_>, _>>()?;
        let public_var = FpVar::new_input(cs.clone(), || Ok(Fr::from(self.public_amount)))?;
        enforce_amount(&public_var)?;

        let total_in = sum_notes(cs.clone(), &self.inputs, &input_hash_vars)?;
        let total_out = sum_notes(cs.clone(), &self.outputs, &output_hash_vars)?;

        total_in.enforce_equal(&(total_out + public_var))?;

        Ok(())
    }
}
