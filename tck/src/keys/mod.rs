//! Declarative key shapes and their materialization through the SDK under test.

mod generator;

pub use generator::{GenerateError, KeySpecGenerator, GENERATE_KEY_METHOD};

use tck_common::crypto::{KeyAlgorithm, KeyError, KeyTree};
use thiserror::Error;

/// Where a single key's bytes come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyMaterial {
    /// Hex public key, DER or raw, used as given
    PublicKey(String),
    /// Hex private key; the public half is derived and the private half signs
    PrivateKey(String),
    /// Ask the backend for a new private key
    Fresh,
}

/// Shape of a key to create: a single key or a (threshold) list of specs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeySpec {
    /// One ED25519 or ECDSA(secp256k1) key
    Single {
        /// Curve of the key
        algorithm: KeyAlgorithm,
        /// Source of the key bytes
        material: KeyMaterial,
    },
    /// Ordered children; a threshold turns the list into a threshold key
    List {
        /// Child specs, kept in order
        children: Vec<KeySpec>,
        /// Required signatures, `None` for a plain key list
        threshold: Option<u32>,
    },
}

impl KeySpec {
    /// Fresh key of `algorithm`
    pub fn fresh(algorithm: KeyAlgorithm) -> Self {
        Self::Single {
            algorithm,
            material: KeyMaterial::Fresh,
        }
    }

    /// Fresh ED25519 key
    pub fn ed25519() -> Self {
        Self::fresh(KeyAlgorithm::Ed25519)
    }

    /// Fresh ECDSA(secp256k1) key
    pub fn ecdsa_secp256k1() -> Self {
        Self::fresh(KeyAlgorithm::EcdsaSecp256k1)
    }

    /// Existing public key
    pub fn public_key(algorithm: KeyAlgorithm, encoded: impl Into<String>) -> Self {
        Self::Single {
            algorithm,
            material: KeyMaterial::PublicKey(encoded.into()),
        }
    }

    /// Existing private key
    pub fn private_key(algorithm: KeyAlgorithm, encoded: impl Into<String>) -> Self {
        Self::Single {
            algorithm,
            material: KeyMaterial::PrivateKey(encoded.into()),
        }
    }

    /// Plain key list
    pub fn key_list(children: Vec<KeySpec>) -> Self {
        Self::List {
            children,
            threshold: None,
        }
    }

    /// Threshold key requiring `threshold` of `children`
    pub fn threshold(threshold: u32, children: Vec<KeySpec>) -> Self {
        Self::List {
            children,
            threshold: Some(threshold),
        }
    }

    /// The empty key list, used as the "no key" sentinel
    pub fn empty() -> Self {
        Self::key_list(Vec::new())
    }

    /// Number of leaves that need a backend round trip
    pub fn fresh_leaf_count(&self) -> usize {
        match self {
            Self::Single {
                material: KeyMaterial::Fresh,
                ..
            } => 1,
            Self::Single { .. } => 0,
            Self::List { children, .. } => children.iter().map(Self::fresh_leaf_count).sum(),
        }
    }

    /// Check every threshold against its list size.
    ///
    /// Generation does not call this: the network is the authority on
    /// invalid thresholds and negative tests need to submit them.
    pub fn validate(&self) -> Result<(), KeySpecError> {
        match self {
            Self::Single { .. } => Ok(()),
            Self::List {
                children,
                threshold,
            } => {
                match *threshold {
                    Some(0) => return Err(KeySpecError::ZeroThreshold),
                    Some(t) if t as usize > children.len() => {
                        return Err(KeySpecError::ThresholdTooLarge {
                            threshold: t,
                            children: children.len(),
                        })
                    }
                    _ => {}
                }
                children.iter().try_for_each(Self::validate)
            }
        }
    }
}

/// Reasons a spec would be rejected by the network
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeySpecError {
    /// A threshold of zero
    #[error("Threshold must be at least 1")]
    ZeroThreshold,
    /// A threshold above the number of children
    #[error("Threshold {threshold} exceeds the {children} keys of the list")]
    ThresholdTooLarge {
        /// Requested threshold
        threshold: u32,
        /// Number of children in the list
        children: usize,
    },
}

/// Result of materializing a [`KeySpec`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedKey {
    /// Network encoding: DER hex for a single key, protobuf hex for a list
    pub encoded: String,
    /// DER hex private keys of every leaf that has one, in leaf order
    pub signing_keys: Vec<String>,
}

impl GeneratedKey {
    /// Decoded structure of [`GeneratedKey::encoded`]
    pub fn tree(&self) -> Result<KeyTree, KeyError> {
        KeyTree::decode(&self.encoded)
    }
}
