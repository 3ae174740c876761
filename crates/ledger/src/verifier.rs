//! Proof verifier dispatch.
//!
//! A fixed table maps `(kind, inputs, outputs)` to a [`Circuit`]. The ledger
//! never checks proofs itself; it hands the selected circuit, the public
//! inputs and the opaque proof bytes to a [`ProofOracle`].

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::error::LedgerError;
use crate::types::{amount_to_field_bytes, Amount, CommitmentHash, FieldBytes};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitKind {
    Deposit,
    Spend,
}

impl fmt::Display for CircuitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CircuitKind::Deposit => f.write_str("deposit"),
            CircuitKind::Spend => f.write_str("spend"),
        }
    }
}

/// Every circuit the ledger accepts proofs for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum Circuit {
    Deposit,
    Spend1x1,
    Spend1x2,
    Spend1x3,
    Spend2x1,
    Spend2x2,
    Spend2x3,
    Spend3x1,
    Spend3x2,
    Spend3x3,
    Spend8x1,
    Spend16x1,
}

impl Circuit {
    pub const ALL: [Circuit; 12] = [
        Circuit::Deposit,
        Circuit::Spend1x1,
        Circuit::Spend1x2,
        Circuit::Spend1x3,
        Circuit::Spend2x1,
        Circuit::Spend2x2,
        Circuit::Spend2x3,
        Circuit::Spend3x1,
        Circuit::Spend3x2,
        Circuit::Spend3x3,
        Circuit::Spend8x1,
        Circuit::Spend16x1,
    ];

    /// Look up the circuit for an operation shape. Deposits are always 0 -> 3.
    pub fn resolve(kind: CircuitKind, inputs: usize, outputs: usize) -> Option<Circuit> {
        let circuit = match (kind, inputs, outputs) {
            (CircuitKind::Deposit, 0, 3) => Circuit::Deposit,
            (CircuitKind::Spend, 1, 1) => Circuit::Spend1x1,
            (CircuitKind::Spend, 1, 2) => Circuit::Spend1x2,
            (CircuitKind::Spend, 1, 3) => Circuit::Spend1x3,
            (CircuitKind::Spend, 2, 1) => Circuit::Spend2x1,
            (CircuitKind::Spend, 2, 2) => Circuit::Spend2x2,
            (CircuitKind::Spend, 2, 3) => Circuit::Spend2x3,
            (CircuitKind::Spend, 3, 1) => Circuit::Spend3x1,
            (CircuitKind::Spend, 3, 2) => Circuit::Spend3x2,
            (CircuitKind::Spend, 3, 3) => Circuit::Spend3x3,
            (CircuitKind::Spend, 8, 1) => Circuit::Spend8x1,
            (CircuitKind::Spend, 16, 1) => Circuit::Spend16x1,
            _ => return None,
        };
        Some(circuit)
    }

    pub fn kind(self) -> CircuitKind {
        match self {
            Circuit::Deposit => CircuitKind::Deposit,
            _ => CircuitKind::Spend,
        }
    }

    /// `(inputs, outputs)` of the circuit.
    pub fn arity(self) -> (usize, usize) {
        match self {
            Circuit::Deposit => (0, 3),
            Circuit::Spend1x1 => (1, 1),
            Circuit::Spend1x2 => (1, 2),
            Circuit::Spend1x3 => (1, 3),
            Circuit::Spend2x1 => (2, 1),
            Circuit::Spend2x2 => (2, 2),
            Circuit::Spend2x3 => (2, 3),
            Circuit::Spend3x1 => (3, 1),
            Circuit::Spend3x2 => (3, 2),
            Circuit::Spend3x3 => (3, 3),
            Circuit::Spend8x1 => (8, 1),
            Circuit::Spend16x1 => (16, 1),
        }
    }

    /// Number of public inputs: every hash plus one trailing amount.
    pub fn public_input_count(self) -> usize {
        let (inputs, outputs) = self.arity();
        inputs + outputs + 1
    }

    /// Stable name, used for key file names and in the HTTP API.
    pub fn name(self) -> &'static str {
        match self {
            Circuit::Deposit => "deposit",
            Circuit::Spend1x1 => "spend_1x1",
            Circuit::Spend1x2 => "spend_1x2",
            Circuit::Spend1x3 => "spend_1x3",
            Circuit::Spend2x1 => "spend_2x1",
            Circuit::Spend2x2 => "spend_2x2",
            Circuit::Spend2x3 => "spend_2x3",
            Circuit::Spend3x1 => "spend_3x1",
            Circuit::Spend3x2 => "spend_3x2",
            Circuit::Spend3x3 => "spend_3x3",
            Circuit::Spend8x1 => "spend_8x1",
            Circuit::Spend16x1 => "spend_16x1",
        }
    }
}

impl fmt::Display for Circuit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown circuit {0:?}")]
pub struct UnknownCircuit(pub String);

impl FromStr for Circuit {
    type Err = UnknownCircuit;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Circuit::ALL
            .into_iter()
            .find(|c| c.name() == s)
            .ok_or_else(|| UnknownCircuit(s.to_string()))
    }
}

impl From<Circuit> for String {
    fn from(circuit: Circuit) -> Self {
        circuit.name().to_string()
    }
}

impl TryFrom<String> for Circuit {
    type Error = UnknownCircuit;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// Failure inside an oracle, as opposed to a proof that does not verify.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct OracleError(pub String);

/// Answers whether `proof` is valid for `circuit` under `public_inputs`.
pub trait ProofOracle {
    fn verify(
        &self,
        circuit: Circuit,
        public_inputs: &[FieldBytes],
        proof: &[u8],
    ) -> Result<bool, OracleError>;
}

impl<T: ProofOracle + ?Sized> ProofOracle for Box<T> {
    fn verify(
        &self,
        circuit: Circuit,
        public_inputs: &[FieldBytes],
        proof: &[u8],
    ) -> Result<bool, OracleError> {
        (**self).verify(circuit, public_inputs, proof)
    }
}

impl<T: ProofOracle + ?Sized> ProofOracle for Arc<T> {
    fn verify(
        &self,
        circuit: Circuit,
        public_inputs: &[FieldBytes],
        proof: &[u8],
    ) -> Result<bool, OracleError> {
        (**self).verify(circuit, public_inputs, proof)
    }
}

/// Routes verification requests to the oracle after resolving the circuit.
pub struct VerifierRegistry<O> {
    oracle: O,
}

impl<O: ProofOracle> VerifierRegistry<O> {
    pub fn new(oracle: O) -> Self {
        Self { oracle }
    }

    pub fn oracle(&self) -> &O {
        &self.oracle
    }

    pub fn resolve(
        &self,
        kind: CircuitKind,
        inputs: usize,
        outputs: usize,
    ) -> Result<Circuit, LedgerError> {
        Circuit::resolve(kind, inputs, outputs).ok_or(LedgerError::UnsupportedArity {
            kind,
            inputs,
            outputs,
        })
    }

    /// Select the circuit for the shape and ask the oracle.
    ///
    /// `Ok(false)` means the proof is well-formed but invalid; oracle
    /// failures surface as `VerifierError`.
    pub fn dispatch(
        &self,
        kind: CircuitKind,
        inputs: usize,
        outputs: usize,
        public_inputs: &[FieldBytes],
        proof: &[u8],
    ) -> Result<bool, LedgerError> {
        let circuit = self.resolve(kind, inputs, outputs)?;
        if public_inputs.len() != circuit.public_input_count() {
            return Err(LedgerError::VerifierError(format!(
                "{} expects {} public inputs, got {}",
                circuit,
                circuit.public_input_count(),
                public_inputs.len()
            )));
        }

        let valid = self
            .oracle
            .verify(circuit, public_inputs, proof)
            .map_err(|e| LedgerError::VerifierError(e.0))?;
        debug!(%circuit, valid, "proof dispatched");
        Ok(valid)
    }
}

/// Public inputs of a deposit: `[h1, h2, h3, total]`.
pub fn deposit_public_inputs(hashes: &[CommitmentHash], total: Amount) -> Vec<FieldBytes> {
    hashes
        .iter()
        .map(|h| h.to_field_bytes())
        .chain(std::iter::once(amount_to_field_bytes(total)))
        .collect()
}

/// Public inputs of a spend: `[inputs.., outputs.., public_total]`.
pub fn spend_public_inputs(
    inputs: &[CommitmentHash],
    outputs: &[CommitmentHash],
    public_total: Amount,
) -> Vec<FieldBytes> {
    inputs
        .iter()
        .chain(outputs)
        .map(|h| h.to_field_bytes())
        .chain(std::iter::once(amount_to_field_bytes(public_total)))
        .collect()
}
