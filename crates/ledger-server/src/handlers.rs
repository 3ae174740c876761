//! HTTP request handlers.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use ark_bn254::Fr;
use ark_std::rand::Rng;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tokio::task::JoinError;
use tracing::{info, warn};

use zeroledger_circuits::{commitment_hash_bytes, fr_to_bytes, NoteOpening};
use zeroledger_ledger::{
    Address, Amount, AssetId, Circuit, CircuitKind, CommitmentHash, CommitmentState,
    FeeSchedule, ForwardRequest, LedgerEvent, Metadata, ProofBytes, Secret,
};
use zeroledger_prover::{prove, setup::CircuitKeys, ProofWithInputs, ProveError};

use crate::SharedState;

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub prover: bool,
    pub circuits: Vec<Circuit>,
}

pub async fn health(State(state): State<SharedState>) -> Json<HealthResponse> {
    let state = state.read().await;
    let circuits = state
        .keys
        .as_ref()
        .map(|k| k.circuits().collect())
        .unwrap_or_default();
    Json(HealthResponse {
        status: "ok",
        prover: state.keys.is_some(),
        circuits,
    })
}

/// Error response
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<&'static str>,
}

fn error_response(status: StatusCode, error: impl ToString, kind: Option<&'static str>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
            kind,
        }),
    )
        .into_response()
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

// ============ Forwarding ============

#[derive(Deserialize)]
pub struct ForwardBatch {
    pub requests: Vec<ForwardRequest>,
}

#[derive(Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ForwardOutcome {
    Committed { events: Vec<LedgerEvent> },
    Rejected { kind: &'static str, error: String },
}

#[derive(Serialize)]
pub struct ForwardResponse {
    pub results: Vec<ForwardOutcome>,
}

/// Authenticate a batch of signed requests and run them in order.
///
/// Authentication failures reject the whole batch with 401; ledger
/// rejections are reported per request.
pub async fn forward(
    State(state): State<SharedState>,
    Json(batch): Json<ForwardBatch>,
) -> Response {
    if batch.requests.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "empty batch", None);
    }

    let mut guard = state.write().await;
    let state = &mut *guard;
    let results = match state
        .forwarder
        .execute_batch(&mut state.ledger, &batch.requests, unix_now())
    {
        Ok(results) => results,
        Err(e) => {
            warn!(error = %e, "forwarded batch rejected");
            return error_response(StatusCode::UNAUTHORIZED, &e, Some(e.kind()));
        }
    };

    let results: Vec<ForwardOutcome> = results
        .into_iter()
        .map(|result| match result {
            Ok(receipt) => ForwardOutcome::Committed {
                events: receipt.events,
            },
            Err(e) => ForwardOutcome::Rejected {
                kind: e.kind(),
                error: e.to_string(),
            },
        })
        .collect();
    info!(count = results.len(), "forwarded batch processed");

    (StatusCode::OK, Json(ForwardResponse { results })).into_response()
}

#[derive(Serialize)]
pub struct NonceResponse {
    pub address: Address,
    pub nonce: u64,
}

pub async fn forwarder_nonce(
    State(state): State<SharedState>,
    Path(address): Path<Address>,
) -> Json<NonceResponse> {
    let state = state.read().await;
    Json(NonceResponse {
        address,
        nonce: state.forwarder.nonce(address),
    })
}

// ============ Queries ============

#[derive(Serialize)]
pub struct CommitmentResponse {
    pub asset: AssetId,
    pub hash: CommitmentHash,
    pub owner: Address,
    pub state: CommitmentState,
    pub metadata: Metadata,
}

pub async fn get_commitment(
    State(state): State<SharedState>,
    Path((asset, hash)): Path<(AssetId, CommitmentHash)>,
) -> Response {
    let state = state.read().await;
    match state.ledger.store().peek(asset, hash) {
        Some(c) => (
            StatusCode::OK,
            Json(CommitmentResponse {
                asset,
                hash,
                owner: c.owner,
                state: c.state,
                metadata: c.metadata,
            }),
        )
            .into_response(),
        None => error_response(
            StatusCode::NOT_FOUND,
            format!("commitment {} not found", hash),
            Some("commitment_not_found"),
        ),
    }
}

#[derive(Serialize)]
pub struct AssetResponse {
    pub asset: AssetId,
    pub fees: FeeSchedule,
    pub max_tvl: Amount,
    pub pool_balance: Amount,
    pub commitments: usize,
}

pub async fn get_asset(State(state): State<SharedState>, Path(asset): Path<AssetId>) -> Response {
    let state = state.read().await;
    let ledger = &state.ledger;
    match ledger.fees().config(asset) {
        Ok(config) => (
            StatusCode::OK,
            Json(AssetResponse {
                asset,
                fees: config.fees,
                max_tvl: config.max_tvl,
                pool_balance: ledger.pool_balance(asset),
                commitments: ledger.store().len(asset),
            }),
        )
            .into_response(),
        Err(e) => error_response(StatusCode::NOT_FOUND, &e, Some(e.kind())),
    }
}

// ============ Proof generation ============

/// A note as the client knows it.
#[derive(Debug, Deserialize)]
pub struct NoteInput {
    pub amount: Amount,
    pub secret: Secret,
}

impl NoteInput {
    fn opening(&self) -> NoteOpening {
        NoteOpening::from_secret(self.amount, &self.secret.0)
    }
}

#[derive(Deserialize)]
pub struct ProveDepositRequest {
    pub notes: [NoteInput; 3],
}

#[derive(Deserialize)]
pub struct ProveSpendRequest {
    pub inputs: Vec<NoteInput>,
    pub outputs: Vec<NoteInput>,
    /// Public outputs plus spend fee plus sponsor fee
    pub public_amount: Amount,
}

#[derive(Serialize)]
pub struct ProofResponse {
    pub circuit: Circuit,
    pub proof: ProofBytes,
    pub public_inputs: Vec<String>,
    pub commitments: Vec<CommitmentHash>,
}

/// Proving keys for `circuit`, or the response explaining why there are none.
async fn proving_keys(state: &SharedState, circuit: Circuit) -> Result<Arc<CircuitKeys>, Response> {
    let state = state.read().await;
    let keys = state.keys.clone().ok_or_else(|| {
        error_response(StatusCode::SERVICE_UNAVAILABLE, "prover disabled", None)
    })?;
    if let Err(e) = keys.get(circuit) {
        return Err(error_response(StatusCode::SERVICE_UNAVAILABLE, e, None));
    }
    Ok(keys)
}

fn proof_response(result: Result<Result<ProofWithInputs, ProveError>, JoinError>) -> Response {
    let proof = match result {
        Ok(Ok(proof)) => proof,
        Ok(Err(e)) => return error_response(StatusCode::BAD_REQUEST, e, None),
        Err(e) => return error_response(StatusCode::INTERNAL_SERVER_ERROR, e, None),
    };
    let bytes = match proof.serialize_proof() {
        Ok(bytes) => bytes,
        Err(e) => return error_response(StatusCode::INTERNAL_SERVER_ERROR, e, None),
    };

    let response = ProofResponse {
        circuit: proof.circuit,
        proof: ProofBytes(bytes),
        public_inputs: proof
            .public_input_bytes()
            .iter()
            .map(|b| format!("0x{}", hex::encode(b)))
            .collect(),
        commitments: proof.commitments(),
    };
    (StatusCode::OK, Json(response)).into_response()
}

pub async fn prove_deposit(
    State(state): State<SharedState>,
    Json(req): Json<ProveDepositRequest>,
) -> Response {
    let keys = match proving_keys(&state, Circuit::Deposit).await {
        Ok(keys) => keys,
        Err(response) => return response,
    };
    let notes = req.notes.map(|n| n.opening());

    // Proving is CPU-bound; keep it off the async workers
    let result = tokio::task::spawn_blocking(move || {
        let pair = keys
            .get(Circuit::Deposit)
            .map_err(|e| ProveError::InvalidState(e.to_string()))?;
        prove::prove_deposit(&pair.proving_key, notes)
    })
    .await;
    proof_response(result)
}

pub async fn prove_spend(
    State(state): State<SharedState>,
    Json(req): Json<ProveSpendRequest>,
) -> Response {
    let Some(circuit) = Circuit::resolve(CircuitKind::Spend, req.inputs.len(), req.outputs.len())
    else {
        return error_response(
            StatusCode::BAD_REQUEST,
            format!(
                "no spend circuit for {} inputs and {} outputs",
                req.inputs.len(),
                req.outputs.len()
            ),
            Some("unsupported_arity"),
        );
    };
    let keys = match proving_keys(&state, circuit).await {
        Ok(keys) => keys,
        Err(response) => return response,
    };
    let inputs: Vec<NoteOpening> = req.inputs.iter().map(NoteInput::opening).collect();
    let outputs: Vec<NoteOpening> = req.outputs.iter().map(NoteInput::opening).collect();

    let result = tokio::task::spawn_blocking(move || {
        let pair = keys
            .get(circuit)
            .map_err(|e| ProveError::InvalidState(e.to_string()))?;
        prove::prove_spend(&pair.proving_key, &inputs, &outputs, req.public_amount)
    })
    .await;
    proof_response(result)
}

// ============ Utilities ============

#[derive(Deserialize)]
pub struct CreateCommitmentRequest {
    pub amount: Amount,
    pub secret: Secret,
}

#[derive(Serialize)]
pub struct CreateCommitmentResponse {
    pub commitment: CommitmentHash,
}

pub async fn create_commitment(
    Json(req): Json<CreateCommitmentRequest>,
) -> Json<CreateCommitmentResponse> {
    Json(CreateCommitmentResponse {
        commitment: CommitmentHash(commitment_hash_bytes(req.amount, &req.secret.0)),
    })
}

#[derive(Serialize)]
pub struct GenerateBlindingResponse {
    pub secret: Secret,
}

pub async fn generate_blinding() -> Json<GenerateBlindingResponse> {
    let mut rng = ark_std::rand::thread_rng();
    let blinding: Fr = rng.gen();

    Json(GenerateBlindingResponse {
        secret: Secret(fr_to_bytes(&blinding)),
    })
}
