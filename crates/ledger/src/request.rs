//! Operation payloads accepted by the ledger.

use serde::{Deserialize, Serialize};

use crate::types::{Address, Amount, AssetId, CommitmentHash, Metadata, ProofBytes, Secret};

/// Extra fee paid to whoever relayed the operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SponsorFee {
    pub amount: Amount,
    pub recipient: Address,
}

/// A commitment to create, with its owner and tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputNote {
    pub hash: CommitmentHash,
    pub owner: Address,
    #[serde(default)]
    pub metadata: Metadata,
}

/// Public payment out of the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payout {
    pub recipient: Address,
    pub amount: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositRequest {
    pub asset: AssetId,
    pub total_amount: Amount,
    pub outputs: [OutputNote; 3],
    #[serde(default)]
    pub sponsor_fee: Option<SponsorFee>,
}

/// Assigns the outputs at `indexes` to `owner`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerGroup {
    pub owner: Address,
    pub indexes: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpendRequest {
    pub asset: AssetId,
    pub inputs: Vec<CommitmentHash>,
    pub outputs: Vec<CommitmentHash>,
    pub output_owners: Vec<OwnerGroup>,
    /// One tag per output; missing trailing tags are zero
    #[serde(default)]
    pub metadata: Vec<Metadata>,
    #[serde(default)]
    pub public_outputs: Vec<Payout>,
    #[serde(default)]
    pub sponsor_fee: Option<SponsorFee>,
}

/// Amount and blinding secret revealing a commitment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Opening {
    pub amount: Amount,
    pub secret: Secret,
}

impl Opening {
    pub fn hash(&self) -> CommitmentHash {
        CommitmentHash(zeroledger_circuits::commitment_hash_bytes(
            self.amount,
            &self.secret.0,
        ))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawRequest {
    pub asset: AssetId,
    pub openings: Vec<Opening>,
    pub payouts: Vec<Payout>,
    #[serde(default)]
    pub sponsor_fee: Option<SponsorFee>,
}

/// A ledger operation with everything needed to run it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerCall {
    Deposit {
        request: DepositRequest,
        proof: ProofBytes,
    },
    Spend {
        request: SpendRequest,
        proof: ProofBytes,
    },
    Withdraw {
        request: WithdrawRequest,
    },
}

impl LedgerCall {
    pub fn name(&self) -> &'static str {
        match self {
            LedgerCall::Deposit { .. } => "deposit",
            LedgerCall::Spend { .. } => "spend",
            LedgerCall::Withdraw { .. } => "withdraw",
        }
    }

    pub fn asset(&self) -> AssetId {
        match self {
            LedgerCall::Deposit { request, .. } => request.asset,
            LedgerCall::Spend { request, .. } => request.asset,
            LedgerCall::Withdraw { request } => request.asset,
        }
    }
}
