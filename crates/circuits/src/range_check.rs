//! Range checks against field wrap-around.
//!
//! Amounts are `u128` on the ledger side, but inside the circuit they are
//! BN254 scalars. Without a bound, `in = out + public` can be satisfied with an
//! output of `p - 5` that is really a negative amount. Every amount the
//! circuits touch is therefore pinned to 128 bits; at most 16 of them are
//! summed, which stays far below the 254-bit modulus.

use ark_ff::PrimeField;
use ark_r1cs_std::fields::fp::FpVar;
use ark_r1cs_std::prelude::*;
use ark_relations::r1cs::SynthesisError;

/// Width of an amount in bits (matches `u128`)
pub const AMOUNT_BITS: usize = 128;

/// Enforce `value < 2^num_bits`.
pub fn enforce_range<F: PrimeField>(value: &FpVar<F>, num_bits: usize) -> Result<(), SynthesisError> {
    let bits = value.to_bits_le()?;
    for bit in bits.iter().skip(num_bits) {
        bit.enforce_equal(&Boolean::FALSE)?;
    }
    Ok(())
}

/// Enforce that `value` is a valid `u128` amount.
pub fn enforce_amount<F: PrimeField>(value: &FpVar<F>) -> Result<(), SynthesisError> {
    enforce_range(value, AMOUNT_BITS)
}
