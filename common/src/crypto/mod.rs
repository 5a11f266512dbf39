//! Key codec: DER prefix handling, protobuf key containers and the
//! framing-free views used to compare keys observed through different
//! sources.

mod der;
mod error;
mod proto;
mod tree;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use der::*;
pub use error::*;
pub use proto::*;
pub use tree::*;

/// Signature algorithm of a single key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum KeyAlgorithm {
    Ed25519,
    EcdsaSecp256k1,
}

impl KeyAlgorithm {
    /// Size of the raw public key (compressed point for secp256k1)
    pub const fn public_key_size(&self) -> usize {
        match self {
            Self::Ed25519 => ED25519_PUBLIC_KEY_SIZE,
            Self::EcdsaSecp256k1 => ECDSA_PUBLIC_KEY_SIZE,
        }
    }

    pub const fn public_der_prefix(&self) -> &'static [u8] {
        match self {
            Self::Ed25519 => &ED25519_PUBLIC_DER_PREFIX,
            Self::EcdsaSecp256k1 => &ECDSA_PUBLIC_DER_PREFIX,
        }
    }

    pub const fn private_der_prefix(&self) -> &'static [u8] {
        match self {
            Self::Ed25519 => &ED25519_PRIVATE_DER_PREFIX,
            Self::EcdsaSecp256k1 => &ECDSA_PRIVATE_DER_PREFIX,
        }
    }
}

impl fmt::Display for KeyAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ed25519 => write!(f, "ED25519"),
            Self::EcdsaSecp256k1 => write!(f, "ECDSA_SECP256K1"),
        }
    }
}

/// Algorithm-tagged key bytes without any container or DER wrapping.
///
/// Two views match when they carry the same algorithm and the shorter byte
/// string equals the trailing bytes of the longer one. Sources are not
/// guaranteed to agree on framing even when the key is the same.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct RawKeyView {
    algorithm: KeyAlgorithm,
    bytes: Vec<u8>,
}

impl RawKeyView {
    pub fn new(algorithm: KeyAlgorithm, bytes: Vec<u8>) -> Self {
        Self { algorithm, bytes }
    }

    pub fn algorithm(&self) -> KeyAlgorithm {
        self.algorithm
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.bytes)
    }

    /// Cross-source equality (suffix rule)
    pub fn matches(&self, other: &RawKeyView) -> bool {
        self.algorithm == other.algorithm && suffix_eq(&self.bytes, &other.bytes)
    }
}

impl fmt::Debug for RawKeyView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RawKeyView({}, {})", self.algorithm, self.to_hex())
    }
}

impl fmt::Display for RawKeyView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// True when the shorter slice equals the tail of the longer one.
///
/// An empty slice only matches another empty slice.
pub fn suffix_eq(a: &[u8], b: &[u8]) -> bool {
    if a.is_empty() || b.is_empty() {
        return a.is_empty() && b.is_empty();
    }
    let (short, long) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    long.ends_with(short)
}

pub(crate) fn decode_hex(encoded: &str) -> Result<Vec<u8>, KeyError> {
    let trimmed = encoded.trim();
    let trimmed = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    hex::decode(trimmed).map_err(|e| KeyError::InvalidHex(e.to_string()))
}
