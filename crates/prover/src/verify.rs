//! Proof verification, standalone and as the ledger's [`ProofOracle`].

use std::collections::BTreeMap;

use ark_bn254::{Bn254, Fr};
use ark_groth16::{Groth16, PreparedVerifyingKey, Proof, VerifyingKey};
use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};
use ark_snark::SNARK;
use thiserror::Error;

use zeroledger_circuits::fr_from_bytes;
use zeroledger_ledger::{Circuit, FieldBytes, OracleError, ProofOracle};

use crate::setup::CircuitKeys;

/// Errors during verification
#[derive(Error, Debug)]
pub enum VerifyError {
    #[error("Verification failed: {0}")]
    Verification(String),
    #[error("Invalid public inputs")]
    InvalidInputs,
}

/// Verify a proof against its public inputs.
pub fn verify_proof(
    vk: &VerifyingKey<Bn254>,
    proof: &Proof<Bn254>,
    public_inputs: &[Fr],
) -> Result<bool, VerifyError> {
    if public_inputs.len() + 1 != vk.gamma_abc_g1.len() {
        return Err(VerifyError::InvalidInputs);
    }
    Groth16::<Bn254>::verify(vk, public_inputs, proof)
        .map_err(|e| VerifyError::Verification(e.to_string()))
}

/// Groth16 verification with one prepared key per circuit.
pub struct Groth16Oracle {
    keys: BTreeMap<Circuit, PreparedVerifyingKey<Bn254>>,
}

impl Groth16Oracle {
    pub fn new(keys: &CircuitKeys) -> Result<Self, VerifyError> {
        Self::from_verifying_keys(keys.iter().map(|(c, pair)| (c, pair.verifying_key.clone())))
    }

    pub fn from_verifying_keys(
        keys: impl IntoIterator<Item = (Circuit, VerifyingKey<Bn254>)>,
    ) -> Result<Self, VerifyError> {
        let keys = keys
            .into_iter()
            .map(|(circuit, vk)| {
                Groth16::<Bn254>::process_vk(&vk)
                    .map(|pvk| (circuit, pvk))
                    .map_err(|e| VerifyError::Verification(e.to_string()))
            })
            .collect::<Result<_, _>>()?;
        Ok(Self { keys })
    }

    pub fn supports(&self, circuit: Circuit) -> bool {
        self.keys.contains_key(&circuit)
    }
}

impl ProofOracle for Groth16Oracle {
    fn verify(
        &self,
        circuit: Circuit,
        public_inputs: &[FieldBytes],
        proof: &[u8],
    ) -> Result<bool, OracleError> {
        let pvk = self
            .keys
            .get(&circuit)
            .ok_or_else(|| OracleError(format!("no verifying key for {}", circuit)))?;

        let inputs = public_inputs
            .iter()
            .map(|bytes| {
                fr_from_bytes(bytes)
                    .ok_or_else(|| OracleError("public input is not a canonical field element".into()))
            })
            .collect::<Result<Vec<Fr>, _>>()?;

        let proof = Proof::<Bn254>::deserialize_compressed(proof)
            .ok()
            .filter(|p| p.compressed_size() == proof.len())
            .ok_or_else(|| OracleError("malformed proof".into()))?;

        Groth16::<Bn254>::verify_with_processed_vk(pvk, &inputs, &proof)
            .map_err(|e| OracleError(e.to_string()))
    }
}
