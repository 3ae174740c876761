//! Identifiers and byte-string newtypes shared across the ledger.
//!
//! Every fixed-size byte string is rendered as `0x`-prefixed hex, both in
//! `Display` and in serde.

use std::fmt;
use std::str::FromStr;

use ed25519_dalek::VerifyingKey;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Token amounts (wide enough for 18-decimal tokens)
pub type Amount = u128;

/// 32-byte little-endian field element, as handed to a verifier
pub type FieldBytes = [u8; 32];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid hex value: {0}")]
pub struct ParseHexError(pub String);

macro_rules! hex_newtype {
    ($(#[$meta:meta])* $name:ident, $len:expr) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub [u8; $len]);

        impl $name {
            pub const LEN: usize = $len;

            pub fn as_bytes(&self) -> &[u8; $len] {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self([0u8; $len])
            }
        }

        impl From<[u8; $len]> for $name {
            fn from(bytes: [u8; $len]) -> Self {
                Self(bytes)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "0x{}", hex::encode(self.0))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self)
            }
        }

        impl FromStr for $name {
            type Err = ParseHexError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let bytes = hex::decode(s.trim_start_matches("0x"))
                    .map_err(|e| ParseHexError(e.to_string()))?;
                let array: [u8; $len] = bytes.try_into().map_err(|b: Vec<u8>| {
                    ParseHexError(format!("expected {} bytes, got {}", $len, b.len()))
                })?;
                Ok(Self(array))
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

hex_newtype!(
    /// 20-byte account identifier.
    Address,
    20
);

hex_newtype!(
    /// Commitment identifier: the canonical encoding of `Poseidon(amount, blinding)`.
    CommitmentHash,
    32
);

hex_newtype!(
    /// Opaque tag attached to a commitment for off-ledger indexing.
    Metadata,
    32
);

hex_newtype!(
    /// Blinding secret of a note opening.
    Secret,
    32
);

hex_newtype!(
    /// Ed25519 public key bytes.
    PublicKeyBytes,
    32
);

hex_newtype!(
    /// Ed25519 signature bytes.
    SignatureBytes,
    64
);

/// Assets are identified by the address of their token.
pub type AssetId = Address;

impl Address {
    pub const ZERO: Address = Address([0u8; 20]);

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }

    /// Account address controlled by an ed25519 key: the last 20 bytes of
    /// `sha256(public_key)`.
    pub fn from_verifying_key(key: &VerifyingKey) -> Self {
        let digest = Sha256::digest(key.as_bytes());
        let mut out = [0u8; 20];
        out.copy_from_slice(&digest[12..]);
        Self(out)
    }
}

impl CommitmentHash {
    pub fn to_field_bytes(self) -> FieldBytes {
        self.0
    }
}

/// Proof bytes as produced by the prover; never stored by the ledger.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ProofBytes(pub Vec<u8>);

impl fmt::Debug for ProofBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ProofBytes({} bytes)", self.0.len())
    }
}

impl Serialize for ProofBytes {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("0x{}", hex::encode(&self.0)))
    }
}

impl<'de> Deserialize<'de> for ProofBytes {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode(s.trim_start_matches("0x"))
            .map(ProofBytes)
            .map_err(serde::de::Error::custom)
    }
}

/// Little-endian field encoding of an amount.
pub fn amount_to_field_bytes(amount: Amount) -> FieldBytes {
    let mut out = [0u8; 32];
    out[..16].copy_from_slice(&amount.to_le_bytes());
    out
}
