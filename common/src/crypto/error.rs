use thiserror::Error;

use super::KeyAlgorithm;

/// Errors raised while decoding or deriving key material.
///
/// Every decode failure is surfaced to the caller; no encoding is ever
/// defaulted to a guessed algorithm.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyError {
    /// Invalid hexadecimal string format
    #[error("Invalid hex string: {0}")]
    InvalidHex(String),

    /// Length matches neither the raw nor the DER form of the algorithm
    #[error("Unrecognized {algorithm} key encoding of {len} bytes")]
    UnrecognizedLength { algorithm: KeyAlgorithm, len: usize },

    /// Length matches the DER form but the container bytes differ
    #[error("Unexpected {algorithm} DER prefix: {prefix}")]
    PrefixMismatch {
        algorithm: KeyAlgorithm,
        prefix: String,
    },

    /// No known public key encoding has this length
    #[error("Unknown key encoding of {0} bytes")]
    UnknownEncoding(usize),

    #[error("Invalid protobuf key: {0}")]
    InvalidProtobuf(String),

    #[error("Key is not a key list or threshold key")]
    NotAList,

    #[error("Key message has no key set")]
    EmptyKey,

    /// Bytes have the right shape but are not a valid key
    #[error("Invalid {algorithm} key material: {reason}")]
    InvalidMaterial {
        algorithm: KeyAlgorithm,
        reason: String,
    },
}
