//! Transaction processor: deposit, spend and withdraw.
//!
//! Every operation runs the same way: validate, verify the proof, lock the
//! consumed commitments, create the new ones, settle tokens in one call, then
//! remove the locked inputs. An error at any step drops the store
//! transaction, which releases locks and discards created entries, so a
//! rejected operation leaves no trace.

use tracing::{info, warn};

use crate::bank::{BankError, Settlement, TokenBank};
use crate::error::LedgerError;
use crate::events::{LedgerEvent, Receipt};
use crate::fees::FeeLedger;
use crate::request::{
    DepositRequest, LedgerCall, OutputNote, OwnerGroup, SpendRequest, SponsorFee, WithdrawRequest,
};
use crate::store::{Commitment, CommitmentStore};
use crate::types::{Address, Amount, AssetId, CommitmentHash, Metadata};
use crate::verifier::{
    deposit_public_inputs, spend_public_inputs, CircuitKind, ProofOracle, VerifierRegistry,
};

pub struct Ledger<O, B> {
    address: Address,
    fee_sink: Address,
    store: CommitmentStore,
    fees: FeeLedger,
    verifiers: VerifierRegistry<O>,
    bank: B,
    events: Vec<LedgerEvent>,
}

impl<O: ProofOracle, B: TokenBank> Ledger<O, B> {
    /// `address` is the pool account holding deposited tokens; fees are paid
    /// to `fee_sink`.
    pub fn new(address: Address, fee_sink: Address, oracle: O, bank: B) -> Self {
        Self {
            address,
            fee_sink,
            store: CommitmentStore::new(),
            fees: FeeLedger::new(),
            verifiers: VerifierRegistry::new(oracle),
            bank,
            events: Vec::new(),
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn fee_sink(&self) -> Address {
        self.fee_sink
    }

    pub fn store(&self) -> &CommitmentStore {
        &self.store
    }

    pub fn fees(&self) -> &FeeLedger {
        &self.fees
    }

    pub fn fees_mut(&mut self) -> &mut FeeLedger {
        &mut self.fees
    }

    pub fn verifiers(&self) -> &VerifierRegistry<O> {
        &self.verifiers
    }

    pub fn bank(&self) -> &B {
        &self.bank
    }

    pub fn bank_mut(&mut self) -> &mut B {
        &mut self.bank
    }

    /// Events of every committed operation so far.
    pub fn events(&self) -> &[LedgerEvent] {
        &self.events
    }

    pub fn owner_of(&self, asset: AssetId, hash: CommitmentHash) -> Option<Address> {
        self.store.owner_of(asset, hash)
    }

    pub fn pool_balance(&self, asset: AssetId) -> Amount {
        self.bank.balance_of(asset, self.address)
    }

    /// Public amount a spend proof must commit to: public outputs plus the
    /// spend fee plus the sponsor fee.
    pub fn spend_public_total(&self, request: &SpendRequest) -> Result<Amount, LedgerError> {
        let fees = self.fees.fees(request.asset)?;
        if request.public_outputs.iter().any(|p| p.amount == 0) {
            return Err(LedgerError::InvalidAmount);
        }
        let paid = checked_sum(request.public_outputs.iter().map(|p| p.amount))?;
        checked_sum([paid, fees.spend, sponsor_amount(&request.sponsor_fee)])
    }

    pub fn deposit(
        &mut self,
        principal: Address,
        request: &DepositRequest,
        proof: &[u8],
    ) -> Result<Receipt, LedgerError> {
        let result = self.run_deposit(principal, request, proof);
        self.finish("deposit", request.asset, principal, result)
    }

    pub fn spend(
        &mut self,
        principal: Address,
        request: &SpendRequest,
        proof: &[u8],
    ) -> Result<Receipt, LedgerError> {
        let result = self.run_spend(principal, request, proof);
        self.finish("spend", request.asset, principal, result)
    }

    pub fn withdraw(
        &mut self,
        principal: Address,
        request: &WithdrawRequest,
    ) -> Result<Receipt, LedgerError> {
        let result = self.run_withdraw(principal, request);
        self.finish("withdraw", request.asset, principal, result)
    }

    /// Run a call on behalf of `principal`.
    pub fn apply(&mut self, principal: Address, call: &LedgerCall) -> Result<Receipt, LedgerError> {
        match call {
            LedgerCall::Deposit { request, proof } => self.deposit(principal, request, &proof.0),
            LedgerCall::Spend { request, proof } => self.spend(principal, request, &proof.0),
            LedgerCall::Withdraw { request } => self.withdraw(principal, request),
        }
    }

    fn finish(
        &mut self,
        op: &'static str,
        asset: AssetId,
        principal: Address,
        result: Result<Receipt, LedgerError>,
    ) -> Result<Receipt, LedgerError> {
        match &result {
            Ok(receipt) => {
                info!(op, %asset, %principal, events = receipt.events.len(), "operation committed");
                self.events.extend(receipt.events.iter().cloned());
            }
            Err(e) => {
                warn!(op, %asset, %principal, kind = e.kind(), error = %e, "operation rejected");
            }
        }
        result
    }

    fn run_deposit(
        &mut self,
        principal: Address,
        request: &DepositRequest,
        proof: &[u8],
    ) -> Result<Receipt, LedgerError> {
        let asset = request.asset;
        let fees = self.fees.fees(asset)?;
        if request.total_amount == 0 {
            return Err(LedgerError::InvalidAmount);
        }
        let pulled = checked_sum([
            request.total_amount,
            fees.deposit,
            sponsor_amount(&request.sponsor_fee),
        ])?;
        self.fees
            .check_capacity(asset, self.pool_balance(asset), request.total_amount)?;

        let hashes: Vec<CommitmentHash> = request.outputs.iter().map(|n| n.hash).collect();
        let public_inputs = deposit_public_inputs(&hashes, request.total_amount);
        if !self
            .verifiers
            .dispatch(CircuitKind::Deposit, 0, hashes.len(), &public_inputs, proof)?
        {
            return Err(LedgerError::InvalidProof);
        }

        let mut txn = self.store.begin(asset);
        for note in &request.outputs {
            txn.create(note.hash, note.owner, note.metadata)?;
        }

        let mut settlement = Settlement::new(asset);
        settlement
            .pull(principal, pulled)
            .pay(self.fee_sink, fees.deposit);
        pay_sponsor(&mut settlement, &request.sponsor_fee);
        self.bank
            .settle(self.address, &settlement)
            .map_err(transfer_failed)?;
        txn.commit();

        let mut events: Vec<LedgerEvent> = request
            .outputs
            .iter()
            .map(|note| created(asset, note))
            .collect();
        events.push(LedgerEvent::DepositCompleted {
            asset,
            depositor: principal,
            amount: request.total_amount,
            fee: fees.deposit,
            commitments: hashes,
        });
        Ok(Receipt { events })
    }

    fn run_spend(
        &mut self,
        principal: Address,
        request: &SpendRequest,
        proof: &[u8],
    ) -> Result<Receipt, LedgerError> {
        let asset = request.asset;
        let fees = self.fees.fees(asset)?;
        let (n, m) = (request.inputs.len(), request.outputs.len());
        self.verifiers.resolve(CircuitKind::Spend, n, m)?;

        let notes = assign_owners(&request.outputs, &request.output_owners, &request.metadata)?;
        let public_total = self.spend_public_total(request)?;
        let public_inputs = spend_public_inputs(&request.inputs, &request.outputs, public_total);
        if !self
            .verifiers
            .dispatch(CircuitKind::Spend, n, m, &public_inputs, proof)?
        {
            return Err(LedgerError::InvalidProof);
        }

        let mut txn = self.store.begin(asset);
        for hash in &request.inputs {
            txn.lock(*hash, Some(principal))?;
        }
        for note in &notes {
            txn.create(note.hash, note.owner, note.metadata)?;
        }

        let mut settlement = Settlement::new(asset);
        for payout in &request.public_outputs {
            settlement.pay(payout.recipient, payout.amount);
        }
        settlement.pay(self.fee_sink, fees.spend);
        pay_sponsor(&mut settlement, &request.sponsor_fee);
        self.bank
            .settle(self.address, &settlement)
            .map_err(transfer_failed)?;
        let removed = txn.commit();

        let mut events: Vec<LedgerEvent> = removed
            .iter()
            .map(|(hash, c)| removed_event(asset, *hash, c))
            .collect();
        events.extend(notes.iter().map(|note| created(asset, note)));
        events.push(LedgerEvent::SpendCompleted {
            asset,
            spender: principal,
            inputs: request.inputs.clone(),
            outputs: request.outputs.clone(),
            public_amount: public_total - fees.spend - sponsor_amount(&request.sponsor_fee),
            fee: fees.spend,
        });
        Ok(Receipt { events })
    }

    fn run_withdraw(
        &mut self,
        principal: Address,
        request: &WithdrawRequest,
    ) -> Result<Receipt, LedgerError> {
        let asset = request.asset;
        let fees = self.fees.fees(asset)?;
        if request.openings.is_empty()
            || request.openings.iter().any(|o| o.amount == 0)
            || request.payouts.iter().any(|p| p.amount == 0)
        {
            return Err(LedgerError::InvalidAmount);
        }

        let consumed = checked_sum(request.openings.iter().map(|o| o.amount))?;
        let deductions = checked_sum([fees.withdraw, sponsor_amount(&request.sponsor_fee)])?;
        let expected = consumed
            .checked_sub(deductions)
            .ok_or(LedgerError::InvalidAmount)?;
        let paid = checked_sum(request.payouts.iter().map(|p| p.amount))?;
        if paid != expected {
            return Err(LedgerError::PayoutMismatch {
                payouts: paid,
                expected,
            });
        }

        // A wrong opening, a foreign commitment and a spent one look the same
        // to the caller.
        let mut txn = self.store.begin(asset);
        for opening in &request.openings {
            let hash = opening.hash();
            txn.lock(hash, Some(principal))
                .map_err(|_| LedgerError::CommitmentNotFound(hash))?;
        }

        let mut settlement = Settlement::new(asset);
        for payout in &request.payouts {
            settlement.pay(payout.recipient, payout.amount);
        }
        settlement.pay(self.fee_sink, fees.withdraw);
        pay_sponsor(&mut settlement, &request.sponsor_fee);
        self.bank
            .settle(self.address, &settlement)
            .map_err(transfer_failed)?;
        let removed = txn.commit();

        let mut events: Vec<LedgerEvent> = removed
            .iter()
            .map(|(hash, c)| removed_event(asset, *hash, c))
            .collect();
        events.push(LedgerEvent::WithdrawCompleted {
            asset,
            owner: principal,
            amount: paid,
            fee: fees.withdraw,
        });
        Ok(Receipt { events })
    }
}

/// Resolve owner groups into one owner per output. Every index must be
/// assigned exactly once.
fn assign_owners(
    outputs: &[CommitmentHash],
    groups: &[OwnerGroup],
    metadata: &[Metadata],
) -> Result<Vec<OutputNote>, LedgerError> {
    if metadata.len() > outputs.len() {
        return Err(LedgerError::InvalidOutputOwners);
    }

    let mut owners: Vec<Option<Address>> = vec![None; outputs.len()];
    for group in groups {
        for &index in &group.indexes {
            let slot = owners
                .get_mut(index)
                .ok_or(LedgerError::InvalidOutputOwners)?;
            if slot.replace(group.owner).is_some() {
                return Err(LedgerError::InvalidOutputOwners);
            }
        }
    }

    outputs
        .iter()
        .zip(owners)
        .enumerate()
        .map(|(i, (hash, owner))| {
            Ok(OutputNote {
                hash: *hash,
                owner: owner.ok_or(LedgerError::InvalidOutputOwners)?,
                metadata: metadata.get(i).copied().unwrap_or_default(),
            })
        })
        .collect()
}

fn checked_sum(amounts: impl IntoIterator<Item = Amount>) -> Result<Amount, LedgerError> {
    amounts
        .into_iter()
        .try_fold(0, |acc: Amount, a| acc.checked_add(a))
        .ok_or(LedgerError::InvalidAmount)
}

fn sponsor_amount(fee: &Option<SponsorFee>) -> Amount {
    fee.map_or(0, |f| f.amount)
}

fn pay_sponsor(settlement: &mut Settlement, fee: &Option<SponsorFee>) {
    if let Some(fee) = fee {
        settlement.pay(fee.recipient, fee.amount);
    }
}

fn transfer_failed(err: BankError) -> LedgerError {
    LedgerError::TransferFailed(err.to_string())
}

fn created(asset: AssetId, note: &OutputNote) -> LedgerEvent {
    LedgerEvent::CommitmentCreated {
        asset,
        hash: note.hash,
        owner: note.owner,
        metadata: note.metadata,
    }
}

fn removed_event(asset: AssetId, hash: CommitmentHash, commitment: &Commitment) -> LedgerEvent {
    LedgerEvent::CommitmentRemoved {
        asset,
        hash,
        owner: commitment.owner,
    }
}
