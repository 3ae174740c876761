//! Poseidon hashing outside of circuits.

use ark_bn254::Fr;
use ark_crypto_primitives::sponge::poseidon::PoseidonSponge;
use ark_crypto_primitives::sponge::CryptographicSponge;

use super::config::poseidon_params;

/// Absorb `inputs` in order and squeeze one element.
pub fn poseidon_hash_many(inputs: &[Fr]) -> Fr {
    let mut sponge = PoseidonSponge::new(poseidon_params());
    for input in inputs {
        sponge.absorb(input);
    }
    sponge.squeeze_field_elements::<Fr>(1)[0]
}

/// Two-to-one hash, the shape used by note commitments.
pub fn poseidon_hash_two(a: Fr, b: Fr) -> Fr {
    poseidon_hash_many(&[a, b])
}
