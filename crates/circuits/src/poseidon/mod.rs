//! Poseidon over BN254, natively and as R1CS gadgets.

mod config;
mod gadgets;
mod native;


pub use config::{poseidon_params, FULL_ROUNDS, PARTIAL_ROUNDS};
pub use gadgets::{poseidon_hash_many_var, poseidon_hash_two_var};
pub use native::{poseidon_hash_many, poseidon_hash_two};
