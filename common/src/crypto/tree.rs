use std::fmt;

use super::{
    encode_public_der, key_message, key_message_from_encoded, strip_prefix_bytes, KeyAlgorithm,
    KeyError, KeyMessage, RawKeyView,
};

/// Framing-free structure of a single or composite key.
///
/// Consensus and mirror sources report the same key as DER hex, raw hex or
/// protobuf hex; decoding both into a tree makes them comparable.
#[derive(Clone, PartialEq, Eq)]
pub enum KeyTree {
    Single(RawKeyView),
    List {
        threshold: Option<u32>,
        keys: Vec<KeyTree>,
    },
}

impl KeyTree {
    /// Decode DER, raw or protobuf hex
    pub fn decode(encoded: &str) -> Result<Self, KeyError> {
        let message = key_message_from_encoded(encoded)?;
        Self::from_message(&message)
    }

    pub fn from_message(message: &KeyMessage) -> Result<Self, KeyError> {
        match &message.key {
            Some(key_message::Key::Ed25519(bytes)) => {
                strip_prefix_bytes(bytes, KeyAlgorithm::Ed25519).map(Self::Single)
            }
            Some(key_message::Key::EcdsaSecp256k1(bytes)) => {
                strip_prefix_bytes(bytes, KeyAlgorithm::EcdsaSecp256k1).map(Self::Single)
            }
            Some(key_message::Key::KeyList(list)) => Ok(Self::List {
                threshold: None,
                keys: list
                    .keys
                    .iter()
                    .map(Self::from_message)
                    .collect::<Result<_, _>>()?,
            }),
            Some(key_message::Key::ThresholdKey(threshold)) => Ok(Self::List {
                threshold: Some(threshold.threshold),
                keys: threshold
                    .keys
                    .iter()
                    .flat_map(|list| list.keys.iter())
                    .map(Self::from_message)
                    .collect::<Result<_, _>>()?,
            }),
            None => Err(KeyError::EmptyKey),
        }
    }

    pub fn to_message(&self) -> KeyMessage {
        match self {
            Self::Single(view) => KeyMessage::single(view),
            Self::List { threshold, keys } => {
                KeyMessage::list(keys.iter().map(Self::to_message).collect(), *threshold)
            }
        }
    }

    /// Network encoding: DER hex for single keys, protobuf hex for lists
    pub fn encode(&self) -> String {
        match self {
            Self::Single(view) => encode_public_der(view),
            Self::List { .. } => self.to_message().to_hex(),
        }
    }

    /// Structural comparison with the suffix rule applied at every leaf
    pub fn matches(&self, other: &KeyTree) -> bool {
        match (self, other) {
            (Self::Single(a), Self::Single(b)) => a.matches(b),
            (
                Self::List {
                    threshold: ta,
                    keys: ka,
                },
                Self::List {
                    threshold: tb,
                    keys: kb,
                },
            ) => ta == tb && ka.len() == kb.len() && ka.iter().zip(kb).all(|(a, b)| a.matches(b)),
            _ => false,
        }
    }

    /// Number of single keys at any depth
    pub fn leaf_count(&self) -> usize {
        match self {
            Self::Single(_) => 1,
            Self::List { keys, .. } => keys.iter().map(Self::leaf_count).sum(),
        }
    }

    pub fn depth(&self) -> usize {
        match self {
            Self::Single(_) => 0,
            Self::List { keys, .. } => 1 + keys.iter().map(Self::depth).max().unwrap_or(0),
        }
    }
}

impl fmt::Debug for KeyTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single(view) => write!(f, "{:?}", view),
            Self::List {
                threshold: Some(threshold),
                keys,
            } => write!(f, "Threshold({}, {:?})", threshold, keys),
            Self::List {
                threshold: None,
                keys,
            } => write!(f, "KeyList({:?})", keys),
        }
    }
}
