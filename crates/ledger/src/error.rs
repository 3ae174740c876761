//! Error types for ledger operations.

use thiserror::Error;

use crate::types::{Amount, AssetId, CommitmentHash};
use crate::verifier::CircuitKind;

/// Failure of a ledger operation. Any error leaves the ledger unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("invalid amount")]
    InvalidAmount,

    #[error("asset {0} is not registered")]
    InvalidAsset(AssetId),

    #[error("no verifier for {kind} with {inputs} inputs and {outputs} outputs")]
    UnsupportedArity {
        kind: CircuitKind,
        inputs: usize,
        outputs: usize,
    },

    #[error("invalid zk proof")]
    InvalidProof,

    #[error("verifier failure: {0}")]
    VerifierError(String),

    #[error("commitment {0} already exists")]
    CommitmentAlreadyExists(CommitmentHash),

    #[error("commitment {0} not found")]
    CommitmentNotFound(CommitmentHash),

    #[error("commitment {0} belongs to another address")]
    OwnerMismatch(CommitmentHash),

    #[error("commitment {0} is locked by an operation in flight")]
    CommitmentLocked(CommitmentHash),

    #[error("pool capacity exceeded: balance {balance} + deposit {incoming} > cap {max_tvl}")]
    CapacityExceeded {
        balance: Amount,
        incoming: Amount,
        max_tvl: Amount,
    },

    #[error("output owners must assign every output exactly once")]
    InvalidOutputOwners,

    #[error("payouts total {payouts}, expected {expected}")]
    PayoutMismatch { payouts: Amount, expected: Amount },

    #[error("token transfer failed: {0}")]
    TransferFailed(String),
}

impl LedgerError {
    /// Stable machine-readable name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            LedgerError::InvalidAmount => "invalid_amount",
            LedgerError::InvalidAsset(_) => "invalid_asset",
            LedgerError::UnsupportedArity { .. } => "unsupported_arity",
            LedgerError::InvalidProof => "invalid_proof",
            LedgerError::VerifierError(_) => "verifier_error",
            LedgerError::CommitmentAlreadyExists(_) => "commitment_already_exists",
            LedgerError::CommitmentNotFound(_) => "commitment_not_found",
            LedgerError::OwnerMismatch(_) => "owner_mismatch",
            LedgerError::CommitmentLocked(_) => "commitment_locked",
            LedgerError::CapacityExceeded { .. } => "capacity_exceeded",
            LedgerError::InvalidOutputOwners => "invalid_output_owners",
            LedgerError::PayoutMismatch { .. } => "payout_mismatch",
            LedgerError::TransferFailed(_) => "transfer_failed",
        }
    }
}

/// Rejection of a forwarded request before it reaches the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GateError {
    #[error("request expired at {deadline}, now {now}")]
    AuthExpired { deadline: u64, now: u64 },

    #[error("nonce {got} already used, expected {expected}")]
    ReplayedNonce { expected: u64, got: u64 },

    #[error("signature does not match the request")]
    BadSignature,

    #[error("request is not addressed to this ledger")]
    WrongTarget,

    #[error("forwarded requests must not carry value")]
    ValueNotAccepted,

    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    #[error("request {index} rejected: {source}")]
    InBatch {
        index: usize,
        #[source]
        source: Box<GateError>,
    },
}

impl GateError {
    pub fn kind(&self) -> &'static str {
        match self {
            GateError::AuthExpired { .. } => "auth_expired",
            GateError::ReplayedNonce { .. } => "replayed_nonce",
            GateError::BadSignature => "bad_signature",
            GateError::WrongTarget => "wrong_target",
            GateError::ValueNotAccepted => "value_not_accepted",
            GateError::MalformedPayload(_) => "malformed_payload",
            GateError::InBatch { source, .. } => source.kind(),
        }
    }
}

/// Outcome of a single forwarded call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ForwardError {
    #[error(transparent)]
    Gate(#[from] GateError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}
