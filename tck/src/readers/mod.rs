//! Read-only views of the two data sources an assertion compares.

mod consensus;
mod mirror;

pub use consensus::RpcConsensusReader;
pub use mirror::{MirrorRestClient, MIRROR_API_PREFIX};

use std::fmt;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tck_common::{
    crypto::{strip_prefix, KeyAlgorithm, KeyError, KeyTree},
    TestContext,
};

use crate::fees::{CustomFee, MirrorCustomFees};

/// Entity whose key or fees an assertion reads
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EntityId {
    /// Account, keyed by `key`
    Account(String),
    /// Token, keyed by `admin_key`
    Token(String),
    /// Consensus topic, keyed by `admin_key`
    Topic(String),
    /// Smart contract, keyed by `admin_key`
    Contract(String),
}

impl EntityId {
    /// The `shard.realm.num` id
    pub fn id(&self) -> &str {
        match self {
            Self::Account(id) | Self::Token(id) | Self::Topic(id) | Self::Contract(id) => id,
        }
    }

    /// Lowercase entity kind
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Account(_) => "account",
            Self::Token(_) => "token",
            Self::Topic(_) => "topic",
            Self::Contract(_) => "contract",
        }
    }

    /// Backend method returning the entity's info
    pub fn consensus_method(&self) -> &'static str {
        match self {
            Self::Account(_) => "getAccountInfo",
            Self::Token(_) => "getTokenInfo",
            Self::Topic(_) => "getTopicInfo",
            Self::Contract(_) => "getContractInfo",
        }
    }

    /// Name of the id parameter of [`EntityId::consensus_method`]
    pub fn consensus_param(&self) -> &'static str {
        match self {
            Self::Account(_) => "accountId",
            Self::Token(_) => "tokenId",
            Self::Topic(_) => "topicId",
            Self::Contract(_) => "contractId",
        }
    }

    /// Path of the entity below the mirror API prefix
    pub fn mirror_path(&self) -> String {
        let collection = match self {
            Self::Account(_) => "accounts",
            Self::Token(_) => "tokens",
            Self::Topic(_) => "topics",
            Self::Contract(_) => "contracts",
        };
        format!("{}/{}", collection, self.id())
    }

    /// Field holding the entity's key, camelCase on consensus and
    /// snake_case on the mirror
    pub(crate) fn key_fields(&self) -> (&'static str, &'static str) {
        match self {
            Self::Account(_) => ("key", "key"),
            _ => ("adminKey", "admin_key"),
        }
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind(), self.id())
    }
}

/// Key as the mirror reports it: `{ "_type": ..., "key": hex }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservedKey {
    /// `ED25519`, `ECDSA_SECP256K1` or `ProtobufEncoded`
    #[serde(rename = "_type")]
    pub key_type: String,
    /// Hex key bytes
    pub key: String,
}

impl ObservedKey {
    /// Mirror `_type` of keys that are not a single key
    pub const PROTOBUF_ENCODED: &'static str = "ProtobufEncoded";

    /// Decode into a framing-free tree
    pub fn tree(&self) -> Result<KeyTree, KeyError> {
        match self.key_type.as_str() {
            "ED25519" => strip_prefix(&self.key, KeyAlgorithm::Ed25519).map(KeyTree::Single),
            "ECDSA_SECP256K1" => {
                strip_prefix(&self.key, KeyAlgorithm::EcdsaSecp256k1).map(KeyTree::Single)
            }
            _ => KeyTree::decode(&self.key),
        }
    }
}

/// Mirror lookup outcome
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MirrorRecord<T> {
    /// The entity has not been indexed yet
    NotIndexed,
    /// The mirror could not answer right now (5xx, refused, timed out)
    Unavailable(String),
    /// The indexed value
    Found(T),
}

impl<T> MirrorRecord<T> {
    /// Transform the indexed value
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> MirrorRecord<U> {
        match self {
            Self::NotIndexed => MirrorRecord::NotIndexed,
            Self::Unavailable(reason) => MirrorRecord::Unavailable(reason),
            Self::Found(value) => MirrorRecord::Found(f(value)),
        }
    }

    /// Indexed value, if any
    pub fn found(self) -> Option<T> {
        match self {
            Self::NotIndexed | Self::Unavailable(_) => None,
            Self::Found(value) => Some(value),
        }
    }
}

/// Strongly-consistent source: reflects a write once it is finalized
#[async_trait]
pub trait ConsensusReader: Send + Sync {
    /// Encoded key of `entity`, `None` when it has none
    async fn entity_key(&self, ctx: &TestContext, entity: &EntityId) -> Result<Option<String>>;

    /// Custom fee schedule of `token_id`
    async fn token_custom_fees(&self, ctx: &TestContext, token_id: &str) -> Result<Vec<CustomFee>>;
}

/// Eventually-consistent source: indexes writes after some delay
#[async_trait]
pub trait MirrorReader: Send + Sync {
    /// Key of `entity`; `Found(None)` when indexed without a key
    async fn entity_key(&self, entity: &EntityId) -> Result<MirrorRecord<Option<ObservedKey>>>;

    /// Custom fee schedule of `token_id`
    async fn token_custom_fees(&self, token_id: &str) -> Result<MirrorRecord<MirrorCustomFees>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use tck_common::crypto::{encode_public_der, RawKeyView};

    #[test]
    fn test_entity_routes() {
        let token = EntityId::Token("0.0.1234".into());
        assert_eq!(token.consensus_method(), "getTokenInfo");
        assert_eq!(token.consensus_param(), "tokenId");
        assert_eq!(token.mirror_path(), "tokens/0.0.1234");
        assert_eq!(token.key_fields(), ("adminKey", "admin_key"));
        assert_eq!(token.to_string(), "token 0.0.1234");

        let account = EntityId::Account("0.0.2".into());
        assert_eq!(account.mirror_path(), "accounts/0.0.2");
        assert_eq!(account.key_fields(), ("key", "key"));
    }

    #[test]
    fn test_observed_key_framings() {
        let view = RawKeyView::new(KeyAlgorithm::Ed25519, vec![4; 32]);
        let raw: ObservedKey = serde_json::from_value(serde_json::json!({
            "_type": "ED25519",
            "key": view.to_hex(),
        }))
        .unwrap();
        let der = KeyTree::decode(&encode_public_der(&view)).unwrap();
        assert!(raw.tree().unwrap().matches(&der));

        let list = ObservedKey {
            key_type: ObservedKey::PROTOBUF_ENCODED.into(),
            key: "3200".into(),
        };
        assert_eq!(
            list.tree().unwrap(),
            KeyTree::List {
                threshold: None,
                keys: vec![]
            }
        );
    }

    #[test]
    fn test_observed_key_with_wrong_length_fails() {
        let key = ObservedKey {
            key_type: "ECDSA_SECP256K1".into(),
            key: "02".repeat(32),
        };
        assert!(matches!(
            key.tree(),
            Err(KeyError::UnrecognizedLength { len: 32, .. })
        ));
    }
}
