//! Events emitted by committed ledger operations.

use serde::{Deserialize, Serialize};

use crate::types::{Address, Amount, AssetId, CommitmentHash, Metadata};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerEvent {
    DepositCompleted {
        asset: AssetId,
        depositor: Address,
        amount: Amount,
        fee: Amount,
        commitments: Vec<CommitmentHash>,
    },
    SpendCompleted {
        asset: AssetId,
        spender: Address,
        inputs: Vec<CommitmentHash>,
        outputs: Vec<CommitmentHash>,
        public_amount: Amount,
        fee: Amount,
    },
    WithdrawCompleted {
        asset: AssetId,
        owner: Address,
        amount: Amount,
        fee: Amount,
    },
    CommitmentCreated {
        asset: AssetId,
        hash: CommitmentHash,
        owner: Address,
        metadata: Metadata,
    },
    CommitmentRemoved {
        asset: AssetId,
        hash: CommitmentHash,
        owner: Address,
    },
}

/// Events of one committed operation, in emission order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub events: Vec<LedgerEvent>,
}

impl Receipt {
    pub fn created(&self) -> impl Iterator<Item = &CommitmentHash> {
        self.events.iter().filter_map(|e| match e {
            LedgerEvent::CommitmentCreated { hash, .. } => Some(hash),
            _ => None,
        })
    }

    pub fn removed(&self) -> impl Iterator<Item = &CommitmentHash> {
        self.events.iter().filter_map(|e| match e {
            LedgerEvent::CommitmentRemoved { hash, .. } => Some(hash),
            _ => None,
        })
    }
}
