//! API route definitions.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::SharedState;

/// Create API routes
pub fn api_routes() -> Router<SharedState> {
    Router::new()
        // Health check
        .route("/health", get(handlers::health))
        // Relayed ledger operations
        .route("/api/forward", post(handlers::forward))
        .route("/api/forwarder/nonce/:address", get(handlers::forwarder_nonce))
        // Ledger queries
        .route("/api/commitments/:asset/:hash", get(handlers::get_commitment))
        .route("/api/assets/:asset", get(handlers::get_asset))
        // Proof generation
        .route("/api/prove/deposit", post(handlers::prove_deposit))
        .route("/api/prove/spend", post(handlers::prove_spend))
        // Utility endpoints
        .route("/api/commitment/create", post(handlers::create_commitment))
        .route("/api/blinding/generate", post(handlers::generate_blinding))
}

/// Full application with middleware
pub fn app(state: SharedState) -> Router {
    Router::new()
        .merge(api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
