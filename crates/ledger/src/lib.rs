//! Confidential value-transfer ledger.
//!
//! Value lives in commitments `Poseidon(amount, blinding)` keyed per asset.
//! The ledger never sees amounts of shielded notes; it checks proofs through
//! a [`ProofOracle`] and moves tokens through a [`TokenBank`].
//!
//! - [`store`]: commitment lifecycle with staged, revertible changes
//! - [`verifier`]: circuit selection by operation shape
//! - [`processor`]: deposit, spend and withdraw
//! - [`fees`]: per-asset fee schedule and deposit cap
//! - [`forwarder`]: signed meta-transactions with nonces and deadlines

pub mod bank;
pub mod error;
pub mod events;
pub mod fees;
pub mod forwarder;
pub mod processor;
pub mod request;
pub mod store;
pub mod types;
pub mod verifier;

#[cfg(test)]
mod tests;

pub use bank::{BankError, Leg, MemoryBank, Settlement, TokenBank};
pub use error::{ForwardError, GateError, LedgerError};
pub use events::{LedgerEvent, Receipt};
pub use fees::{AssetConfig, FeeLedger, FeeSchedule};
pub use forwarder::{ForwardRequest, Forwarder};
pub use processor::Ledger;
pub use request::{
    DepositRequest, LedgerCall, Opening, OutputNote, OwnerGroup, Payout, SpendRequest, SponsorFee,
    WithdrawRequest,
};
pub use store::{Commitment, CommitmentState, CommitmentStore};
pub use types::{
    Address, Amount, AssetId, CommitmentHash, FieldBytes, Metadata, ProofBytes, PublicKeyBytes,
    Secret, SignatureBytes,
};
pub use verifier::{
    deposit_public_inputs, spend_public_inputs, Circuit, CircuitKind, OracleError, ProofOracle,
    VerifierRegistry,
};
