//! Proof generation for deposit and spend circuits.

use ark_bn254::{Bn254, Fr};
use ark_groth16::{Groth16, Proof, ProvingKey};
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use ark_snark::SNARK;
use ark_std::rand::{rngs::StdRng, SeedableRng};
use thiserror::Error;
use tracing::debug;

use zeroledger_circuits::{fr_to_bytes, DepositCircuit, NoteOpening, SpendCircuit};
use zeroledger_ledger::{Circuit, CircuitKind, CommitmentHash, FieldBytes};

/// Errors during proof generation
#[derive(Error, Debug)]
pub enum ProveError {
    #[error("Proof generation failed: {0}")]
    ProofGeneration(String),
    #[error("Invalid note set: {0}")]
    InvalidState(String),
    #[error("Serialization failed: {0}")]
    Serialization(String),
}

/// A proof with its public inputs
#[derive(Clone)]
pub struct ProofWithInputs {
    pub circuit: Circuit,
    pub proof: Proof<Bn254>,
    pub public_inputs: Vec<Fr>,
}

impl ProofWithInputs {
    /// Serialize proof to bytes
    pub fn serialize_proof(&self) -> Result<Vec<u8>, ProveError> {
        let mut bytes = Vec::new();
        self.proof
            .serialize_compressed(&mut bytes)
            .map_err(|e| ProveError::Serialization(e.to_string()))?;
        Ok(bytes)
    }

    /// Public inputs in the ledger's 32-byte little-endian encoding
    pub fn public_input_bytes(&self) -> Vec<FieldBytes> {
        self.public_inputs.iter().map(fr_to_bytes).collect()
    }

    /// Commitment hashes among the public inputs (everything but the amount)
    pub fn commitments(&self) -> Vec<CommitmentHash> {
        let hashes = self.public_inputs.len().saturating_sub(1);
        self.public_inputs[..hashes]
            .iter()
            .map(|fr| CommitmentHash(fr_to_bytes(fr)))
            .collect()
    }

    pub fn deserialize_proof(bytes: &[u8]) -> Result<Proof<Bn254>, ProveError> {
        Proof::deserialize_compressed(bytes).map_err(|e| ProveError::Serialization(e.to_string()))
    }
}

fn total(notes: &[NoteOpening]) -> Result<u128, ProveError> {
    notes
        .iter()
        .try_fold(0u128, |acc, n| acc.checked_add(n.amount))
        .ok_or_else(|| ProveError::InvalidState("note amounts overflow".into()))
}

/// Prove that three notes add up to their public total.
pub fn prove_deposit(
    pk: &ProvingKey<Bn254>,
    openings: [NoteOpening; 3],
) -> Result<ProofWithInputs, ProveError> {
    let total_amount = total(&openings)?;
    let circuit = DepositCircuit::new(openings, total_amount);
    let public_inputs = circuit.public_inputs();

    let mut rng = StdRng::from_entropy();
    let proof = Groth16::<Bn254>::prove(pk, circuit, &mut rng)
        .map_err(|e| ProveError::ProofGeneration(e.to_string()))?;
    debug!(total_amount, "deposit proof generated");

    Ok(ProofWithInputs {
        circuit: Circuit::Deposit,
        proof,
        public_inputs,
    })
}

/// Prove that `inputs` fund `outputs` plus `public_amount`.
///
/// `public_amount` must be what the ledger will charge the pool for the
/// spend, fees included.
pub fn prove_spend(
    pk: &ProvingKey<Bn254>,
    inputs: &[NoteOpening],
    outputs: &[NoteOpening],
    public_amount: u128,
) -> Result<ProofWithInputs, ProveError> {
    let circuit_id = Circuit::resolve(CircuitKind::Spend, inputs.len(), outputs.len())
        .ok_or_else(|| {
            ProveError::InvalidState(format!(
                "no spend circuit for {} inputs and {} outputs",
                inputs.len(),
                outputs.len()
            ))
        })?;

    let spent = total(inputs)?;
    let created = total(outputs)?
        .checked_add(public_amount)
        .ok_or_else(|| ProveError::InvalidState("output amounts overflow".into()))?;
    if spent != created {
        return Err(ProveError::InvalidState(format!(
            "inputs hold {}, outputs and public amount need {}",
            spent, created
        )));
    }

    let circuit = SpendCircuit::new(inputs.to_vec(), outputs.to_vec(), public_amount);
    let public_inputs = circuit.public_inputs();

    let mut rng = StdRng::from_entropy();
    let proof = Groth16::<Bn254>::prove(pk, circuit, &mut rng)
        .map_err(|e| ProveError::ProofGeneration(e.to_string()))?;
    debug!(circuit = %circuit_id, public_amount, "spend proof generated");

    Ok(ProofWithInputs {
        circuit: circuit_id,
        proof,
        public_inputs,
    })
}
