//! Protobuf `Key` container used by the network for composite keys.
//!
//! Only the variants the harness produces are modelled:
//! `ed25519 = 2`, `thresholdKey = 5`, `keyList = 6`, `ECDSA_secp256k1 = 7`.

use prost::Message;

use super::{decode_hex, detect_public_key, KeyAlgorithm, KeyError, RawKeyView};

#[derive(Clone, PartialEq, Message)]
pub struct KeyMessage {
    #[prost(oneof = "key_message::Key", tags = "2, 5, 6, 7")]
    pub key: Option<key_message::Key>,
}

pub mod key_message {
    #[derive(Clone, PartialEq, prost::Oneof)]
    pub enum Key {
        #[prost(bytes = "vec", tag = "2")]
        Ed25519(Vec<u8>),
        #[prost(message, tag = "5")]
        ThresholdKey(super::ThresholdKeyMessage),
        #[prost(message, tag = "6")]
        KeyList(super::KeyListMessage),
        #[prost(bytes = "vec", tag = "7")]
        EcdsaSecp256k1(Vec<u8>),
    }
}

#[derive(Clone, PartialEq, Message)]
pub struct KeyListMessage {
    #[prost(message, repeated, tag = "1")]
    pub keys: Vec<KeyMessage>,
}

#[derive(Clone, PartialEq, Message)]
pub struct ThresholdKeyMessage {
    #[prost(uint32, tag = "1")]
    pub threshold: u32,
    #[prost(message, optional, tag = "2")]
    pub keys: Option<KeyListMessage>,
}

impl KeyMessage {
    pub fn single(view: &RawKeyView) -> Self {
        let bytes = view.as_bytes().to_vec();
        let key = match view.algorithm() {
            KeyAlgorithm::Ed25519 => key_message::Key::Ed25519(bytes),
            KeyAlgorithm::EcdsaSecp256k1 => key_message::Key::EcdsaSecp256k1(bytes),
        };
        Self { key: Some(key) }
    }

    /// Key list, or threshold key when `threshold` is set
    pub fn list(keys: Vec<KeyMessage>, threshold: Option<u32>) -> Self {
        let list = KeyListMessage { keys };
        let key = match threshold {
            Some(threshold) => key_message::Key::ThresholdKey(ThresholdKeyMessage {
                threshold,
                keys: Some(list),
            }),
            None => key_message::Key::KeyList(list),
        };
        Self { key: Some(key) }
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.encode_to_vec())
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, KeyError> {
        Self::decode(bytes).map_err(|e| KeyError::InvalidProtobuf(e.to_string()))
    }
}

/// Parse any encoded key into its protobuf form.
///
/// DER and raw single keys are recognized first; everything else must be
/// a protobuf `Key`. A DER key always starts with a SEQUENCE tag (0x30),
/// which no protobuf `Key` field tag uses.
pub fn key_message_from_encoded(encoded: &str) -> Result<KeyMessage, KeyError> {
    let bytes = decode_hex(encoded)?;
    if looks_like_single_key(&bytes) {
        let view = detect_public_key(&bytes)?;
        return Ok(KeyMessage::single(&view));
    }
    KeyMessage::from_bytes(&bytes)
}

fn looks_like_single_key(bytes: &[u8]) -> bool {
    match bytes.first() {
        Some(0x30) => true,
        Some(0x02 | 0x03) if bytes.len() == super::ECDSA_PUBLIC_KEY_SIZE => true,
        Some(_) => bytes.len() == super::ED25519_PUBLIC_KEY_SIZE,
        None => false,
    }
}

/// One child of a decoded key list
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyListEntry {
    Key(RawKeyView),
    /// Hex of a nested list or threshold key, to be decoded by the caller
    Nested(String),
}

/// One level of a key list or threshold key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedKeyList {
    pub threshold: Option<u32>,
    pub entries: Vec<KeyListEntry>,
}

impl DecodedKeyList {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Decode a hex key list or threshold key into its direct children
pub fn decode_list_keys(encoded: &str) -> Result<DecodedKeyList, KeyError> {
    let message = KeyMessage::from_bytes(&decode_hex(encoded)?)?;
    let (threshold, list) = match message.key {
        Some(key_message::Key::KeyList(list)) => (None, list),
        Some(key_message::Key::ThresholdKey(threshold)) => (
            Some(threshold.threshold),
            threshold.keys.unwrap_or_default(),
        ),
        Some(_) => return Err(KeyError::NotAList),
        None => return Err(KeyError::EmptyKey),
    };

    let entries = list
        .keys
        .into_iter()
        .map(|child| match child.key {
            Some(key_message::Key::Ed25519(bytes)) => {
                super::strip_prefix_bytes(&bytes, KeyAlgorithm::Ed25519).map(KeyListEntry::Key)
            }
            Some(key_message::Key::EcdsaSecp256k1(bytes)) => {
                super::strip_prefix_bytes(&bytes, KeyAlgorithm::EcdsaSecp256k1)
                    .map(KeyListEntry::Key)
            }
            Some(_) => Ok(KeyListEntry::Nested(child.to_hex())),
            None => Err(KeyError::EmptyKey),
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(DecodedKeyList { threshold, entries })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ed(byte: u8) -> RawKeyView {
        RawKeyView::new(KeyAlgorithm::Ed25519, vec![byte; 32])
    }

    fn ecdsa(byte: u8) -> RawKeyView {
        let mut bytes = vec![byte; 33];
        bytes[0] = 0x02;
        RawKeyView::new(KeyAlgorithm::EcdsaSecp256k1, bytes)
    }

    #[test]
    fn test_empty_list_encoding() {
        let empty = KeyMessage::list(Vec::new(), None);
        assert_eq!(empty.to_hex(), "3200");

        let decoded = decode_list_keys("3200").unwrap();
        assert!(decoded.is_empty());
        assert_eq!(decoded.threshold, None);
    }

    #[test]
    fn test_single_key_field_tags() {
        let hex = KeyMessage::single(&ed(1)).to_hex();
        assert!(hex.starts_with("1220"));
        let hex = KeyMessage::single(&ecdsa(1)).to_hex();
        assert!(hex.starts_with("3a21"));
    }

    #[test]
    fn test_decode_keeps_order_and_threshold() {
        let keys = vec![
            KeyMessage::single(&ed(1)),
            KeyMessage::single(&ecdsa(2)),
            KeyMessage::single(&ed(3)),
        ];
        let threshold = KeyMessage::list(keys.clone(), Some(2));
        assert!(threshold.to_hex().starts_with("2a"));

        let decoded = decode_list_keys(&threshold.to_hex()).unwrap();
        assert_eq!(decoded.threshold, Some(2));
        assert_eq!(
            decoded.entries,
            vec![
                KeyListEntry::Key(ed(1)),
                KeyListEntry::Key(ecdsa(2)),
                KeyListEntry::Key(ed(3)),
            ]
        );

        let plain = KeyMessage::list(keys, None);
        assert_ne!(plain.to_hex(), threshold.to_hex());
        assert_eq!(decode_list_keys(&plain.to_hex()).unwrap().threshold, None);
    }

    #[test]
    fn test_nested_lists_unwrap_one_level() {
        let inner = KeyMessage::list(vec![KeyMessage::single(&ed(9))], Some(1));
        let outer = KeyMessage::list(vec![KeyMessage::single(&ed(1)), inner.clone()], None);

        let decoded = decode_list_keys(&outer.to_hex()).unwrap();
        assert_eq!(decoded.len(), 2);
        match &decoded.entries[1] {
            KeyListEntry::Nested(hex) => {
                assert_eq!(hex, &inner.to_hex());
                let nested = decode_list_keys(hex).unwrap();
                assert_eq!(nested.entries, vec![KeyListEntry::Key(ed(9))]);
            }
            other => panic!("expected nested entry, got {other:?}"),
        }
    }

    #[test]
    fn test_single_key_is_not_a_list() {
        let single = KeyMessage::single(&ed(4)).to_hex();
        assert_eq!(decode_list_keys(&single), Err(KeyError::NotAList));
    }

    #[test]
    fn test_garbage_is_decode_error() {
        assert!(matches!(
            decode_list_keys("ffffffff"),
            Err(KeyError::InvalidProtobuf(_))
        ));
        assert!(matches!(decode_list_keys("3g"), Err(KeyError::InvalidHex(_))));
        assert_eq!(decode_list_keys(""), Err(KeyError::EmptyKey));
    }

    #[test]
    fn test_wrong_leaf_length_is_decode_error() {
        let bad = KeyMessage {
            key: Some(key_message::Key::KeyList(KeyListMessage {
                keys: vec![KeyMessage {
                    key: Some(key_message::Key::Ed25519(vec![1; 31])),
                }],
            })),
        };
        assert!(matches!(
            decode_list_keys(&bad.to_hex()),
            Err(KeyError::UnrecognizedLength { len: 31, .. })
        ));
    }

    #[test]
    fn test_key_message_from_der_and_protobuf() {
        let der = super::super::encode_public_der(&ecdsa(5));
        assert_eq!(
            key_message_from_encoded(&der).unwrap(),
            KeyMessage::single(&ecdsa(5))
        );

        let list = KeyMessage::list(vec![KeyMessage::single(&ed(6))], None);
        assert_eq!(key_message_from_encoded(&list.to_hex()).unwrap(), list);
    }
}
