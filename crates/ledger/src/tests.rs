//! End-to-end ledger scenarios against an in-memory bank.
//!
//! The oracle here accepts a proof iff it is the sha256 binding of the
//! circuit and its public inputs, and the helper prover refuses to bind
//! notes that do not balance.

use ed25519_dalek::SigningKey;
use sha2::{Digest, Sha256};

use crate::*;

const ASSET: AssetId = Address([0xa5; 20]);
const POOL: Address = Address([0xee; 20]);
const FEE_SINK: Address = Address([0xfe; 20]);
const ALICE: Address = Address([1; 20]);
const BOB: Address = Address([2; 20]);
const CAROL: Address = Address([3; 20]);
const RELAYER: Address = Address([9; 20]);

const FEES: FeeSchedule = FeeSchedule {
    deposit: 2,
    spend: 3,
    withdraw: 4,
};

const DOMAIN: &str = "zeroledger-test";
const NOW: u64 = 1_700_000_000;

struct BindingOracle;

impl ProofOracle for BindingOracle {
    fn verify(
        &self,
        circuit: Circuit,
        public_inputs: &[FieldBytes],
        proof: &[u8],
    ) -> Result<bool, OracleError> {
        if proof.len() != 32 {
            return Err(OracleError("malformed proof".into()));
        }
        Ok(proof == bind(circuit, public_inputs).as_slice())
    }
}

fn bind(circuit: Circuit, public_inputs: &[FieldBytes]) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(circuit.name());
    for input in public_inputs {
        hasher.update(input);
    }
    hasher.finalize().to_vec()
}

fn note(amount: Amount, seed: u8) -> Opening {
    Opening {
        amount,
        secret: Secret([seed; 32]),
    }
}

fn prove_deposit(notes: &[Opening; 3]) -> (Vec<CommitmentHash>, Amount, Vec<u8>) {
    let hashes: Vec<CommitmentHash> = notes.iter().map(Opening::hash).collect();
    let total = notes.iter().map(|n| n.amount).sum();
    let proof = bind(Circuit::Deposit, &deposit_public_inputs(&hashes, total));
    (hashes, total, proof)
}

fn prove_spend(
    inputs: &[Opening],
    outputs: &[Opening],
    public_total: Amount,
) -> (Vec<CommitmentHash>, Vec<CommitmentHash>, Vec<u8>) {
    let spent: Amount = inputs.iter().map(|n| n.amount).sum();
    let created: Amount = outputs.iter().map(|n| n.amount).sum();
    assert_eq!(spent, created + public_total, "unbalanced spend");

    let ins: Vec<CommitmentHash> = inputs.iter().map(Opening::hash).collect();
    let outs: Vec<CommitmentHash> = outputs.iter().map(Opening::hash).collect();
    let circuit = Circuit::resolve(CircuitKind::Spend, ins.len(), outs.len()).unwrap();
    let proof = bind(circuit, &spend_public_inputs(&ins, &outs, public_total));
    (ins, outs, proof)
}

fn ledger() -> Ledger<BindingOracle, MemoryBank> {
    let mut bank = MemoryBank::new();
    bank.mint(ASSET, ALICE, 1_000).unwrap();
    bank.mint(ASSET, BOB, 1_000).unwrap();
    let mut ledger = Ledger::new(POOL, FEE_SINK, BindingOracle, bank);
    ledger.fees_mut().set_fee_schedule(ASSET, FEES).unwrap();
    ledger
}

fn deposit_call(owner: Address, notes: [Opening; 3]) -> (DepositRequest, Vec<u8>) {
    let (hashes, total, proof) = prove_deposit(&notes);
    let outputs = [0, 1, 2].map(|i| OutputNote {
        hash: hashes[i],
        owner,
        metadata: Metadata::default(),
    });
    let request = DepositRequest {
        asset: ASSET,
        total_amount: total,
        outputs,
        sponsor_fee: None,
    };
    (request, proof)
}

fn deposit(ledger: &mut Ledger<BindingOracle, MemoryBank>, owner: Address, notes: [Opening; 3]) {
    let (request, proof) = deposit_call(owner, notes);
    ledger.deposit(owner, &request, &proof).unwrap();
}

fn balance(ledger: &Ledger<BindingOracle, MemoryBank>, holder: Address) -> Amount {
    ledger.bank().balance_of(ASSET, holder)
}

#[derive(Debug, PartialEq)]
struct Snapshot {
    store: CommitmentStore,
    bank: MemoryBank,
    fees: FeeLedger,
    events: usize,
}

fn snapshot(ledger: &Ledger<BindingOracle, MemoryBank>) -> Snapshot {
    Snapshot {
        store: ledger.store().clone(),
        bank: ledger.bank().clone(),
        fees: ledger.fees().clone(),
        events: ledger.events().len(),
    }
}

// ---------------------------------------------------------------------------
// Deposit
// ---------------------------------------------------------------------------

#[test]
fn test_deposit_splits_into_three_commitments() {
    let mut ledger = ledger();
    let notes = [note(30, 1), note(40, 2), note(60, 3)];
    let (request, proof) = deposit_call(ALICE, notes);

    let receipt = ledger.deposit(ALICE, &request, &proof).unwrap();

    assert_eq!(balance(&ledger, ALICE), 1_000 - 130 - FEES.deposit);
    assert_eq!(balance(&ledger, POOL), 130);
    assert_eq!(balance(&ledger, FEE_SINK), FEES.deposit);
    for n in &notes {
        let c = ledger.store().peek(ASSET, n.hash()).unwrap();
        assert_eq!(c.owner, ALICE);
        assert_eq!(c.state, CommitmentState::Active);
    }
    assert_eq!(receipt.created().count(), 3);
    assert!(matches!(
        receipt.events.last(),
        Some(LedgerEvent::DepositCompleted { amount: 130, fee: 2, .. })
    ));
    assert_eq!(ledger.events(), receipt.events.as_slice());
}

#[test]
fn test_deposit_proof_bound_to_total() {
    let mut ledger = ledger();
    let (mut request, proof) = deposit_call(ALICE, [note(30, 1), note(40, 2), note(60, 3)]);
    request.total_amount = 131;
    let before = snapshot(&ledger);

    assert_eq!(
        ledger.deposit(ALICE, &request, &proof),
        Err(LedgerError::InvalidProof)
    );
    assert_eq!(snapshot(&ledger), before);
}

#[test]
fn test_deposit_zero_total_rejected() {
    let mut ledger = ledger();
    let (request, proof) = deposit_call(ALICE, [note(0, 1), note(0, 2), note(0, 3)]);
    assert_eq!(
        ledger.deposit(ALICE, &request, &proof),
        Err(LedgerError::InvalidAmount)
    );
}

#[test]
fn test_deposit_unknown_asset_rejected() {
    let mut ledger = ledger();
    let (mut request, proof) = deposit_call(ALICE, [note(1, 1), note(1, 2), note(1, 3)]);

    request.asset = CAROL;
    assert_eq!(
        ledger.deposit(ALICE, &request, &proof),
        Err(LedgerError::InvalidAsset(CAROL))
    );
    request.asset = Address::ZERO;
    assert_eq!(
        ledger.deposit(ALICE, &request, &proof),
        Err(LedgerError::InvalidAsset(Address::ZERO))
    );
}

#[test]
fn test_deposit_respects_capacity() {
    let mut ledger = ledger();
    ledger.fees_mut().set_max_tvl(ASSET, 150).unwrap();
    deposit(&mut ledger, ALICE, [note(100, 1), note(0, 2), note(0, 3)]);

    let (request, proof) = deposit_call(BOB, [note(30, 4), note(20, 5), note(1, 6)]);
    let before = snapshot(&ledger);
    assert_eq!(
        ledger.deposit(BOB, &request, &proof),
        Err(LedgerError::CapacityExceeded {
            balance: 100,
            incoming: 51,
            max_tvl: 150
        })
    );
    assert_eq!(snapshot(&ledger), before);

    // Exactly at the cap is fine
    deposit(&mut ledger, BOB, [note(30, 4), note(20, 5), note(0, 6)]);
    assert_eq!(balance(&ledger, POOL), 150);
}

#[test]
fn test_deposit_duplicate_output_rejected() {
    let mut ledger = ledger();
    let (request, proof) = deposit_call(ALICE, [note(10, 1), note(10, 1), note(5, 2)]);
    let before = snapshot(&ledger);

    assert_eq!(
        ledger.deposit(ALICE, &request, &proof),
        Err(LedgerError::CommitmentAlreadyExists(note(10, 1).hash()))
    );
    assert_eq!(snapshot(&ledger), before);
}

#[test]
fn test_deposit_existing_commitment_rejected() {
    let mut ledger = ledger();
    deposit(&mut ledger, ALICE, [note(10, 1), note(20, 2), note(30, 3)]);

    let (request, proof) = deposit_call(BOB, [note(30, 3), note(5, 7), note(5, 8)]);
    let before = snapshot(&ledger);
    assert_eq!(
        ledger.deposit(BOB, &request, &proof),
        Err(LedgerError::CommitmentAlreadyExists(note(30, 3).hash()))
    );
    assert_eq!(snapshot(&ledger), before);
    assert_eq!(ledger.owner_of(ASSET, note(30, 3).hash()), Some(ALICE));
}

#[test]
fn test_deposit_unfunded_leaves_no_commitments() {
    let mut ledger = ledger();
    let (request, proof) = deposit_call(CAROL, [note(10, 1), note(20, 2), note(30, 3)]);
    let before = snapshot(&ledger);

    let err = ledger.deposit(CAROL, &request, &proof).unwrap_err();
    assert_eq!(err.kind(), "transfer_failed");
    assert_eq!(snapshot(&ledger), before);
    assert!(ledger.store().is_empty(ASSET));
}

#[test]
fn test_deposit_sponsor_fee() {
    let mut ledger = ledger();
    let (mut request, proof) = deposit_call(ALICE, [note(10, 1), note(20, 2), note(30, 3)]);
    request.sponsor_fee = Some(SponsorFee {
        amount: 7,
        recipient: RELAYER,
    });

    ledger.deposit(ALICE, &request, &proof).unwrap();
    assert_eq!(balance(&ledger, ALICE), 1_000 - 60 - FEES.deposit - 7);
    assert_eq!(balance(&ledger, RELAYER), 7);
    assert_eq!(balance(&ledger, POOL), 60);
}

#[test]
fn test_malformed_proof_is_verifier_error() {
    let mut ledger = ledger();
    let (request, _) = deposit_call(ALICE, [note(10, 1), note(20, 2), note(30, 3)]);
    let err = ledger.deposit(ALICE, &request, &[0u8; 3]).unwrap_err();
    assert_eq!(err, LedgerError::VerifierError("malformed proof".into()));
}

// ---------------------------------------------------------------------------
// Spend
// ---------------------------------------------------------------------------

fn spend_call(
    inputs: &[Opening],
    outputs: &[Opening],
    owners: Vec<OwnerGroup>,
    public_outputs: Vec<Payout>,
    public_total: Amount,
) -> (SpendRequest, Vec<u8>) {
    let (ins, outs, proof) = prove_spend(inputs, outputs, public_total);
    let request = SpendRequest {
        asset: ASSET,
        inputs: ins,
        outputs: outs,
        output_owners: owners,
        metadata: Vec::new(),
        public_outputs,
        sponsor_fee: None,
    };
    (request, proof)
}

fn all_to(owner: Address, count: usize) -> Vec<OwnerGroup> {
    vec![OwnerGroup {
        owner,
        indexes: (0..count).collect(),
    }]
}

#[test]
fn test_spend_one_to_two_with_public_output() {
    let mut ledger = ledger();
    let input = note(100, 1);
    deposit(&mut ledger, ALICE, [input, note(0, 2), note(0, 3)]);

    let outputs = [note(60, 10), note(35 - FEES.spend, 11)];
    let owners = vec![
        OwnerGroup { owner: ALICE, indexes: vec![0] },
        OwnerGroup { owner: BOB, indexes: vec![1] },
    ];
    let payout = vec![Payout { recipient: CAROL, amount: 5 }];
    let (request, proof) = spend_call(&[input], &outputs, owners, payout, 5 + FEES.spend);
    assert_eq!(ledger.spend_public_total(&request), Ok(5 + FEES.spend));

    let receipt = ledger.spend(ALICE, &request, &proof).unwrap();

    assert_eq!(balance(&ledger, POOL), 100 - 5 - FEES.spend);
    assert_eq!(balance(&ledger, CAROL), 5);
    assert_eq!(balance(&ledger, FEE_SINK), FEES.deposit + FEES.spend);
    assert_eq!(ledger.owner_of(ASSET, input.hash()), None);
    assert_eq!(ledger.owner_of(ASSET, outputs[0].hash()), Some(ALICE));
    assert_eq!(ledger.owner_of(ASSET, outputs[1].hash()), Some(BOB));
    assert!(ledger.store().peek(ASSET, outputs[1].hash()).unwrap().is_active());
    assert_eq!(receipt.removed().collect::<Vec<_>>(), vec![&input.hash()]);
    assert_eq!(receipt.created().count(), 2);
}

#[test]
fn test_spend_fully_shielded_transfer() {
    let mut ledger = ledger();
    let a = note(25, 1);
    let b = note(17, 2);
    deposit(&mut ledger, ALICE, [a, b, note(0, 3)]);

    let out = note(42 - FEES.spend, 20);
    let (request, proof) = spend_call(&[a, b], &[out], all_to(BOB, 1), vec![], FEES.spend);
    ledger.spend(ALICE, &request, &proof).unwrap();

    assert_eq!(ledger.owner_of(ASSET, out.hash()), Some(BOB));
    assert_eq!(balance(&ledger, POOL), 42 - FEES.spend);
}

#[test]
fn test_spend_inflation_rejected() {
    let mut ledger = ledger();
    let input = note(100, 1);
    deposit(&mut ledger, ALICE, [input, note(0, 2), note(0, 3)]);

    // Proof is for 10 public, request asks for 50
    let outputs = [note(100 - 10 - FEES.spend, 10)];
    let (request, proof) = spend_call(
        &[input],
        &outputs,
        all_to(ALICE, 1),
        vec![Payout { recipient: CAROL, amount: 10 }],
        10 + FEES.spend,
    );
    let mut inflated = request.clone();
    inflated.public_outputs[0].amount = 50;
    let before = snapshot(&ledger);

    assert_eq!(
        ledger.spend(ALICE, &inflated, &proof),
        Err(LedgerError::InvalidProof)
    );
    assert_eq!(snapshot(&ledger), before);
    ledger.spend(ALICE, &request, &proof).unwrap();
}

#[test]
fn test_spend_owner_mismatch() {
    let mut ledger = ledger();
    let input = note(50, 1);
    deposit(&mut ledger, ALICE, [input, note(0, 2), note(0, 3)]);

    let (request, proof) = spend_call(
        &[input],
        &[note(50 - FEES.spend, 10)],
        all_to(BOB, 1),
        vec![],
        FEES.spend,
    );
    let before = snapshot(&ledger);
    assert_eq!(
        ledger.spend(BOB, &request, &proof),
        Err(LedgerError::OwnerMismatch(input.hash()))
    );
    assert_eq!(snapshot(&ledger), before);
}

#[test]
fn test_spend_consumes_exactly_once() {
    let mut ledger = ledger();
    let input = note(50, 1);
    deposit(&mut ledger, ALICE, [input, note(0, 2), note(0, 3)]);

    let (first, proof) = spend_call(&[input], &[note(47, 10)], all_to(ALICE, 1), vec![], FEES.spend);
    ledger.spend(ALICE, &first, &proof).unwrap();

    let (second, proof) = spend_call(&[input], &[note(47, 11)], all_to(ALICE, 1), vec![], FEES.spend);
    assert_eq!(
        ledger.spend(ALICE, &second, &proof),
        Err(LedgerError::CommitmentNotFound(input.hash()))
    );
    assert_eq!(ledger.owner_of(ASSET, note(47, 11).hash()), None);
}

#[test]
fn test_spend_duplicate_input_rejected() {
    let mut ledger = ledger();
    let input = note(20, 1);
    deposit(&mut ledger, ALICE, [input, note(0, 2), note(0, 3)]);

    let (request, proof) = spend_call(
        &[input, input],
        &[note(40 - FEES.spend, 10)],
        all_to(ALICE, 1),
        vec![],
        FEES.spend,
    );
    let before = snapshot(&ledger);
    assert_eq!(
        ledger.spend(ALICE, &request, &proof),
        Err(LedgerError::CommitmentLocked(input.hash()))
    );
    assert_eq!(snapshot(&ledger), before);
}

#[test]
fn test_spend_output_collides_with_active_commitment() {
    let mut ledger = ledger();
    let a = note(30, 1);
    let b = note(0, 2);
    deposit(&mut ledger, ALICE, [a, b, note(0, 3)]);

    // `b` is still live, so the second output lands on an occupied hash
    let (request, proof) = spend_call(
        &[a],
        &[note(30 - FEES.spend, 10), b],
        all_to(BOB, 2),
        vec![],
        FEES.spend,
    );
    let before = snapshot(&ledger);
    assert_eq!(
        ledger.spend(ALICE, &request, &proof),
        Err(LedgerError::CommitmentAlreadyExists(b.hash()))
    );
    assert_eq!(snapshot(&ledger), before);
    assert!(ledger.store().peek(ASSET, a.hash()).unwrap().is_active());
    assert_eq!(ledger.owner_of(ASSET, b.hash()), Some(ALICE));
}

#[test]
fn test_spend_unsupported_arity() {
    let mut ledger = ledger();
    let notes = [note(1, 1), note(1, 2), note(1, 3), note(1, 4)];
    let request = SpendRequest {
        asset: ASSET,
        inputs: notes.iter().map(Opening::hash).collect(),
        outputs: vec![note(1, 9).hash()],
        output_owners: all_to(ALICE, 1),
        metadata: Vec::new(),
        public_outputs: Vec::new(),
        sponsor_fee: None,
    };
    assert_eq!(
        ledger.spend(ALICE, &request, &[0u8; 32]),
        Err(LedgerError::UnsupportedArity {
            kind: CircuitKind::Spend,
            inputs: 4,
            outputs: 1
        })
    );
}

#[test]
fn test_spend_invalid_output_owners() {
    let mut ledger = ledger();
    let input = note(30, 1);
    deposit(&mut ledger, ALICE, [input, note(0, 2), note(0, 3)]);

    let (request, proof) = spend_call(
        &[input],
        &[note(10, 10), note(30 - 10 - FEES.spend, 11)],
        vec![OwnerGroup { owner: BOB, indexes: vec![1] }],
        vec![],
        FEES.spend,
    );
    assert_eq!(
        ledger.spend(ALICE, &request, &proof),
        Err(LedgerError::InvalidOutputOwners)
    );
}

#[test]
fn test_spend_sponsor_fee_and_metadata() {
    let mut ledger = ledger();
    let input = note(80, 1);
    deposit(&mut ledger, ALICE, [input, note(0, 2), note(0, 3)]);

    let sponsor = 6;
    let out = note(80 - FEES.spend - sponsor, 10);
    let (mut request, proof) =
        spend_call(&[input], &[out], all_to(BOB, 1), vec![], FEES.spend + sponsor);
    request.sponsor_fee = Some(SponsorFee { amount: sponsor, recipient: RELAYER });
    request.metadata = vec![Metadata([0x11; 32])];

    ledger.spend(ALICE, &request, &proof).unwrap();
    assert_eq!(balance(&ledger, RELAYER), sponsor);
    assert_eq!(
        ledger.store().peek(ASSET, out.hash()).unwrap().metadata,
        Metadata([0x11; 32])
    );
}

// ---------------------------------------------------------------------------
// Withdraw
// ---------------------------------------------------------------------------

fn withdraw_call(openings: Vec<Opening>, payouts: Vec<Payout>) -> WithdrawRequest {
    WithdrawRequest {
        asset: ASSET,
        openings,
        payouts,
        sponsor_fee: None,
    }
}

#[test]
fn test_withdraw_pays_out_and_removes() {
    let mut ledger = ledger();
    let opening = note(50, 1);
    deposit(&mut ledger, ALICE, [opening, note(0, 2), note(0, 3)]);
    let alice_before = balance(&ledger, ALICE);

    let request = withdraw_call(
        vec![opening],
        vec![Payout { recipient: ALICE, amount: 50 - FEES.withdraw }],
    );
    let receipt = ledger.withdraw(ALICE, &request).unwrap();

    assert_eq!(balance(&ledger, ALICE), alice_before + 50 - FEES.withdraw);
    assert_eq!(balance(&ledger, POOL), 0);
    assert_eq!(ledger.owner_of(ASSET, opening.hash()), None);
    assert_eq!(receipt.removed().count(), 1);

    let before = snapshot(&ledger);
    assert_eq!(
        ledger.withdraw(ALICE, &request),
        Err(LedgerError::CommitmentNotFound(opening.hash()))
    );
    assert_eq!(snapshot(&ledger), before);
}

#[test]
fn test_withdraw_requires_owner() {
    let mut ledger = ledger();
    let opening = note(50, 1);
    deposit(&mut ledger, ALICE, [opening, note(0, 2), note(0, 3)]);

    // Knowing the opening is not enough
    let request = withdraw_call(vec![opening], vec![Payout { recipient: BOB, amount: 46 }]);
    assert_eq!(
        ledger.withdraw(BOB, &request),
        Err(LedgerError::CommitmentNotFound(opening.hash()))
    );
    assert_eq!(ledger.owner_of(ASSET, opening.hash()), Some(ALICE));
}

#[test]
fn test_withdraw_wrong_secret() {
    let mut ledger = ledger();
    deposit(&mut ledger, ALICE, [note(50, 1), note(0, 2), note(0, 3)]);

    let guess = note(50, 99);
    let request = withdraw_call(vec![guess], vec![Payout { recipient: ALICE, amount: 46 }]);
    assert_eq!(
        ledger.withdraw(ALICE, &request),
        Err(LedgerError::CommitmentNotFound(guess.hash()))
    );
}

#[test]
fn test_withdraw_amount_checks() {
    let mut ledger = ledger();
    let opening = note(50, 1);
    deposit(&mut ledger, ALICE, [opening, note(3, 2), note(0, 3)]);
    let before = snapshot(&ledger);

    let short = withdraw_call(vec![opening], vec![Payout { recipient: ALICE, amount: 40 }]);
    assert_eq!(
        ledger.withdraw(ALICE, &short),
        Err(LedgerError::PayoutMismatch { payouts: 40, expected: 46 })
    );

    let zero_payout = withdraw_call(
        vec![opening],
        vec![
            Payout { recipient: ALICE, amount: 46 },
            Payout { recipient: BOB, amount: 0 },
        ],
    );
    assert_eq!(ledger.withdraw(ALICE, &zero_payout), Err(LedgerError::InvalidAmount));

    // Fee larger than the note
    let dust = withdraw_call(vec![note(3, 2)], vec![]);
    assert_eq!(ledger.withdraw(ALICE, &dust), Err(LedgerError::InvalidAmount));

    let empty = withdraw_call(vec![], vec![]);
    assert_eq!(ledger.withdraw(ALICE, &empty), Err(LedgerError::InvalidAmount));

    assert_eq!(snapshot(&ledger), before);
}

#[test]
fn test_withdraw_batch_with_sponsor() {
    let mut ledger = ledger();
    let a = note(30, 1);
    let b = note(20, 2);
    deposit(&mut ledger, ALICE, [a, b, note(0, 3)]);

    let mut request = withdraw_call(
        vec![a, b],
        vec![
            Payout { recipient: BOB, amount: 25 },
            Payout { recipient: CAROL, amount: 50 - 25 - FEES.withdraw - 1 },
        ],
    );
    request.sponsor_fee = Some(SponsorFee { amount: 1, recipient: RELAYER });

    ledger.withdraw(ALICE, &request).unwrap();
    assert_eq!(balance(&ledger, POOL), 0);
    assert_eq!(balance(&ledger, RELAYER), 1);
    assert_eq!(balance(&ledger, CAROL), 20);
    assert!(ledger.owner_of(ASSET, a.hash()).is_none());
    assert!(ledger.owner_of(ASSET, b.hash()).is_none());
}

#[test]
fn test_withdraw_one_bad_opening_keeps_all() {
    let mut ledger = ledger();
    let a = note(30, 1);
    deposit(&mut ledger, ALICE, [a, note(20, 2), note(0, 3)]);
    let before = snapshot(&ledger);

    let request = withdraw_call(
        vec![a, note(20, 77)],
        vec![Payout { recipient: ALICE, amount: 50 - FEES.withdraw }],
    );
    assert_eq!(
        ledger.withdraw(ALICE, &request),
        Err(LedgerError::CommitmentNotFound(note(20, 77).hash()))
    );
    assert_eq!(snapshot(&ledger), before);
}

#[test]
fn test_rejection_after_asset_drained_leaves_state() {
    let mut ledger = ledger();
    let notes = [note(50, 1), note(5, 2), note(5, 3)];
    deposit(&mut ledger, ALICE, notes);
    let request = withdraw_call(
        notes.to_vec(),
        vec![Payout { recipient: ALICE, amount: 60 - FEES.withdraw }],
    );
    ledger.withdraw(ALICE, &request).unwrap();
    assert!(ledger.store().is_empty(ASSET));

    let (request, proof) = deposit_call(CAROL, [note(5, 4), note(5, 5), note(5, 6)]);
    let before = snapshot(&ledger);
    let err = ledger.deposit(CAROL, &request, &proof).unwrap_err();
    assert_eq!(err.kind(), "transfer_failed");
    assert_eq!(snapshot(&ledger), before);
}

// ---------------------------------------------------------------------------
// Forwarder
// ---------------------------------------------------------------------------

fn signer(seed: u8) -> (SigningKey, Address) {
    let key = SigningKey::from_bytes(&[seed; 32]);
    let address = Address::from_verifying_key(&key.verifying_key());
    (key, address)
}

fn forwarded(key: &SigningKey, nonce: u64, call: LedgerCall) -> ForwardRequest {
    ForwardRequest::new(&key.verifying_key(), POOL, nonce, NOW + 60, call)
        .sign(key, DOMAIN)
        .unwrap()
}

fn funded_signer(ledger: &mut Ledger<BindingOracle, MemoryBank>, seed: u8) -> (SigningKey, Address) {
    let (key, address) = signer(seed);
    ledger.bank_mut().mint(ASSET, address, 500).unwrap();
    (key, address)
}

fn deposit_for(owner: Address, seeds: [u8; 3]) -> LedgerCall {
    let (request, proof) =
        deposit_call(owner, [note(10, seeds[0]), note(20, seeds[1]), note(30, seeds[2])]);
    LedgerCall::Deposit {
        request,
        proof: ProofBytes(proof),
    }
}

#[test]
fn test_forwarded_deposit_runs_as_signer() {
    let mut ledger = ledger();
    let mut gate = Forwarder::new(DOMAIN);
    let (key, user) = funded_signer(&mut ledger, 42);

    let request = forwarded(&key, 0, deposit_for(user, [1, 2, 3]));
    gate.execute(&mut ledger, &request, NOW).unwrap();

    assert_eq!(balance(&ledger, user), 500 - 60 - FEES.deposit);
    assert_eq!(balance(&ledger, RELAYER), 0);
    assert_eq!(ledger.owner_of(ASSET, note(10, 1).hash()), Some(user));
    assert_eq!(gate.nonce(user), 1);
}

#[test]
fn test_forwarded_replay_rejected() {
    let mut ledger = ledger();
    let mut gate = Forwarder::new(DOMAIN);
    let (key, _) = funded_signer(&mut ledger, 42);
    let user = Address::from_verifying_key(&key.verifying_key());

    let request = forwarded(&key, 0, deposit_for(user, [1, 2, 3]));
    gate.execute(&mut ledger, &request, NOW).unwrap();

    assert_eq!(
        gate.execute(&mut ledger, &request, NOW),
        Err(ForwardError::Gate(GateError::ReplayedNonce { expected: 1, got: 0 }))
    );
}

#[test]
fn test_forwarded_expired() {
    let mut ledger = ledger();
    let mut gate = Forwarder::new(DOMAIN);
    let (key, user) = funded_signer(&mut ledger, 42);

    let request = forwarded(&key, 0, deposit_for(user, [1, 2, 3]));
    let err = gate.execute(&mut ledger, &request, NOW + 61).unwrap_err();
    assert_eq!(
        err,
        ForwardError::Gate(GateError::AuthExpired { deadline: NOW + 60, now: NOW + 61 })
    );
    assert_eq!(gate.nonce(user), 0);
}

#[test]
fn test_forwarded_tampering_detected() {
    let mut ledger = ledger();
    let gate = Forwarder::new(DOMAIN);
    let (key, user) = funded_signer(&mut ledger, 42);
    let (_, mallory) = signer(66);
    let request = forwarded(&key, 0, deposit_for(user, [1, 2, 3]));

    let mut redirected = request.clone();
    redirected.data = deposit_for(mallory, [1, 2, 3]);
    assert_eq!(gate.verify(&redirected, POOL, NOW), Err(GateError::BadSignature));

    let mut impersonated = request.clone();
    impersonated.from = mallory;
    assert_eq!(gate.verify(&impersonated, POOL, NOW), Err(GateError::BadSignature));

    let other_domain = Forwarder::new("another-ledger");
    assert_eq!(other_domain.verify(&request, POOL, NOW), Err(GateError::BadSignature));

    assert_eq!(gate.verify(&request, POOL, NOW), Ok(()));
}

#[test]
fn test_forwarded_target_and_value() {
    let mut ledger = ledger();
    let mut gate = Forwarder::new(DOMAIN);
    let (key, user) = funded_signer(&mut ledger, 42);

    let wrong_target = ForwardRequest::new(&key.verifying_key(), CAROL, 0, NOW, deposit_for(user, [1, 2, 3]))
        .sign(&key, DOMAIN)
        .unwrap();
    assert_eq!(
        gate.execute(&mut ledger, &wrong_target, NOW),
        Err(ForwardError::Gate(GateError::WrongTarget))
    );

    let mut with_value = ForwardRequest::new(&key.verifying_key(), POOL, 0, NOW, deposit_for(user, [1, 2, 3]));
    with_value.value = 1;
    let with_value = with_value.sign(&key, DOMAIN).unwrap();
    assert_eq!(
        gate.execute(&mut ledger, &with_value, NOW),
        Err(ForwardError::Gate(GateError::ValueNotAccepted))
    );
}

#[test]
fn test_forwarded_ledger_rejection_consumes_nonce() {
    let mut ledger = ledger();
    let mut gate = Forwarder::new(DOMAIN);
    let (key, user) = signer(42);

    // Signer holds no tokens
    let request = forwarded(&key, 0, deposit_for(user, [1, 2, 3]));
    let err = gate.execute(&mut ledger, &request, NOW).unwrap_err();
    assert!(matches!(err, ForwardError::Ledger(LedgerError::TransferFailed(_))));
    assert_eq!(gate.nonce(user), 1);
}

#[test]
fn test_forwarded_batch() {
    let mut ledger = ledger();
    let mut gate = Forwarder::new(DOMAIN);
    let (key, user) = funded_signer(&mut ledger, 42);
    let (other_key, other) = funded_signer(&mut ledger, 43);

    let batch = vec![
        forwarded(&key, 0, deposit_for(user, [1, 2, 3])),
        forwarded(&other_key, 0, deposit_for(other, [4, 5, 6])),
        forwarded(&key, 1, deposit_for(user, [1, 7, 8])),
    ];
    let results = gate.execute_batch(&mut ledger, &batch, NOW).unwrap();

    assert!(results[0].is_ok());
    assert!(results[1].is_ok());
    // Reuses commitment of the first deposit
    assert_eq!(
        results[2],
        Err(LedgerError::CommitmentAlreadyExists(note(10, 1).hash()))
    );
    assert_eq!(gate.nonce(user), 2);
    assert_eq!(gate.nonce(other), 1);
}

#[test]
fn test_forwarded_batch_authenticates_all_first() {
    let mut ledger = ledger();
    let mut gate = Forwarder::new(DOMAIN);
    let (key, user) = funded_signer(&mut ledger, 42);

    let mut tampered = forwarded(&key, 1, deposit_for(user, [4, 5, 6]));
    tampered.gas = 1;
    let batch = vec![forwarded(&key, 0, deposit_for(user, [1, 2, 3])), tampered];
    let before = snapshot(&ledger);

    let err = gate.execute_batch(&mut ledger, &batch, NOW).unwrap_err();
    assert_eq!(err.kind(), "bad_signature");
    assert!(matches!(err, GateError::InBatch { index: 1, .. }));
    assert_eq!(gate.nonce(user), 0);
    assert_eq!(snapshot(&ledger), before);
}

#[test]
fn test_forward_request_survives_json() {
    let mut ledger = ledger();
    let mut gate = Forwarder::new(DOMAIN);
    let key = SigningKey::generate(&mut rand::thread_rng());
    let user = Address::from_verifying_key(&key.verifying_key());
    ledger.bank_mut().mint(ASSET, user, 1_000_000).unwrap();

    let request = forwarded(&key, 0, deposit_for(user, [1, 2, 3]));
    let json = serde_json::to_string(&request).unwrap();
    let decoded: ForwardRequest = serde_json::from_str(&json).unwrap();

    assert_eq!(decoded, request);
    gate.execute(&mut ledger, &decoded, NOW).unwrap();
}
