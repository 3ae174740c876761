//! Meta-transaction gate.
//!
//! A relayer submits [`ForwardRequest`]s signed by the account owner. The
//! gate checks target, value, deadline, signature and per-account nonce, then
//! runs the embedded call with the signer as principal. The ledger never sees
//! the relayer.

use std::collections::HashMap;

use ed25519_dalek::{Signature, Signer, SigningKey, VerifyingKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::bank::TokenBank;
use crate::error::{ForwardError, GateError, LedgerError};
use crate::events::Receipt;
use crate::processor::Ledger;
use crate::request::LedgerCall;
use crate::types::{Address, Amount, PublicKeyBytes, SignatureBytes};
use crate::verifier::ProofOracle;

/// Signed envelope around a ledger call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForwardRequest {
    pub from: Address,
    pub to: Address,
    #[serde(default)]
    pub value: Amount,
    #[serde(default)]
    pub gas: u64,
    pub nonce: u64,
    /// Last accepted timestamp, in seconds
    pub deadline: u64,
    pub data: LedgerCall,
    pub public_key: PublicKeyBytes,
    pub signature: SignatureBytes,
}

/// Everything the signature covers.
#[derive(Serialize)]
struct SignedFields<'a> {
    domain: &'a str,
    from: Address,
    to: Address,
    value: Amount,
    gas: u64,
    nonce: u64,
    deadline: u64,
    data: &'a LedgerCall,
}

impl ForwardRequest {
    /// Unsigned request from the address controlled by `key`.
    pub fn new(key: &VerifyingKey, to: Address, nonce: u64, deadline: u64, data: LedgerCall) -> Self {
        Self {
            from: Address::from_verifying_key(key),
            to,
            value: 0,
            gas: 0,
            nonce,
            deadline,
            data,
            public_key: PublicKeyBytes(key.to_bytes()),
            signature: SignatureBytes::default(),
        }
    }

    pub fn digest(&self, domain: &str) -> Result<[u8; 32], GateError> {
        let fields = SignedFields {
            domain,
            from: self.from,
            to: self.to,
            value: self.value,
            gas: self.gas,
            nonce: self.nonce,
            deadline: self.deadline,
            data: &self.data,
        };
        let encoded =
            serde_json::to_vec(&fields).map_err(|e| GateError::MalformedPayload(e.to_string()))?;
        Ok(Sha256::digest(encoded).into())
    }

    pub fn sign(mut self, key: &SigningKey, domain: &str) -> Result<Self, GateError> {
        self.public_key = PublicKeyBytes(key.verifying_key().to_bytes());
        let digest = self.digest(domain)?;
        self.signature = SignatureBytes(key.sign(&digest).to_bytes());
        Ok(self)
    }
}

pub struct Forwarder {
    domain: String,
    nonces: HashMap<Address, u64>,
}

impl Forwarder {
    /// `domain` is mixed into every signed digest.
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            nonces: HashMap::new(),
        }
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Next nonce expected from `from`.
    pub fn nonce(&self, from: Address) -> u64 {
        self.nonces.get(&from).copied().unwrap_or(0)
    }

    /// Check a request without consuming its nonce.
    pub fn verify(&self, request: &ForwardRequest, target: Address, now: u64) -> Result<(), GateError> {
        self.check(request, target, now, self.nonce(request.from))
    }

    fn check(
        &self,
        request: &ForwardRequest,
        target: Address,
        now: u64,
        expected_nonce: u64,
    ) -> Result<(), GateError> {
        if request.value != 0 {
            return Err(GateError::ValueNotAccepted);
        }
        if request.to != target {
            return Err(GateError::WrongTarget);
        }
        if now > request.deadline {
            return Err(GateError::AuthExpired {
                deadline: request.deadline,
                now,
            });
        }

        let key = VerifyingKey::from_bytes(&request.public_key.0)
            .map_err(|_| GateError::BadSignature)?;
        if Address::from_verifying_key(&key) != request.from {
            return Err(GateError::BadSignature);
        }
        let digest = request.digest(&self.domain)?;
        let signature = Signature::from_bytes(&request.signature.0);
        key.verify_strict(&digest, &signature)
            .map_err(|_| GateError::BadSignature)?;

        if request.nonce != expected_nonce {
            return Err(GateError::ReplayedNonce {
                expected: expected_nonce,
                got: request.nonce,
            });
        }
        Ok(())
    }

    /// Authenticate one request, consume its nonce and run it.
    ///
    /// A ledger rejection still consumes the nonce.
    pub fn execute<O: ProofOracle, B: TokenBank>(
        &mut self,
        ledger: &mut Ledger<O, B>,
        request: &ForwardRequest,
        now: u64,
    ) -> Result<Receipt, ForwardError> {
        self.verify(request, ledger.address(), now)?;
        self.nonces.insert(request.from, request.nonce + 1);
        info!(from = %request.from, nonce = request.nonce, op = request.data.name(), "forwarding call");
        Ok(ledger.apply(request.from, &request.data)?)
    }

    /// Authenticate every request first; if any fails, nothing runs and no
    /// nonce is consumed. Calls then run one at a time, in order, each with
    /// its own outcome.
    pub fn execute_batch<O: ProofOracle, B: TokenBank>(
        &mut self,
        ledger: &mut Ledger<O, B>,
        requests: &[ForwardRequest],
        now: u64,
    ) -> Result<Vec<Result<Receipt, LedgerError>>, GateError> {
        let target = ledger.address();
        let mut next: HashMap<Address, u64> = HashMap::new();
        for (index, request) in requests.iter().enumerate() {
            let expected = next
                .get(&request.from)
                .copied()
                .unwrap_or_else(|| self.nonce(request.from));
            self.check(request, target, now, expected)
                .map_err(|e| GateError::InBatch {
                    index,
                    source: Box::new(e),
                })?;
            next.insert(request.from, expected + 1);
        }
        self.nonces.extend(next);
        debug!(count = requests.len(), "batch authenticated");

        Ok(requests
            .iter()
            .map(|request| ledger.apply(request.from, &request.data))
            .collect())
    }
}
