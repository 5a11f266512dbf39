use ed25519_dalek::SigningKey;
use k256::elliptic_curve::sec1::ToEncodedPoint;

use super::{decode_hex, KeyAlgorithm, KeyError, RawKeyView};

/// Size of an Ed25519 public key in bytes.
pub const ED25519_PUBLIC_KEY_SIZE: usize = 32;

/// Size of a compressed secp256k1 public key in bytes.
pub const ECDSA_PUBLIC_KEY_SIZE: usize = 33;

/// Size of a private scalar/seed for both algorithms.
pub const PRIVATE_KEY_SIZE: usize = 32;

// SubjectPublicKeyInfo headers
pub const ED25519_PUBLIC_DER_PREFIX: [u8; 12] = [
    0x30, 0x2a, 0x30, 0x05, 0x06, 0x03, 0x2b, 0x65, 0x70, 0x03, 0x21, 0x00,
];
pub const ECDSA_PUBLIC_DER_PREFIX: [u8; 14] = [
    0x30, 0x2d, 0x30, 0x07, 0x06, 0x05, 0x2b, 0x81, 0x04, 0x00, 0x0a, 0x03, 0x22, 0x00,
];

// PrivateKeyInfo headers
pub const ED25519_PRIVATE_DER_PREFIX: [u8; 16] = [
    0x30, 0x2e, 0x02, 0x01, 0x00, 0x30, 0x05, 0x06, 0x03, 0x2b, 0x65, 0x70, 0x04, 0x22, 0x04, 0x20,
];
pub const ECDSA_PRIVATE_DER_PREFIX: [u8; 18] = [
    0x30, 0x30, 0x02, 0x01, 0x00, 0x30, 0x07, 0x06, 0x05, 0x2b, 0x81, 0x04, 0x00, 0x0a, 0x04, 0x22,
    0x04, 0x20,
];

/// Strip the DER prefix of a hex-encoded public key.
///
/// A key already at raw length is returned as is.
pub fn strip_prefix(encoded: &str, algorithm: KeyAlgorithm) -> Result<RawKeyView, KeyError> {
    let bytes = decode_hex(encoded)?;
    strip_prefix_bytes(&bytes, algorithm)
}

pub fn strip_prefix_bytes(bytes: &[u8], algorithm: KeyAlgorithm) -> Result<RawKeyView, KeyError> {
    let size = algorithm.public_key_size();
    let prefix = algorithm.public_der_prefix();

    let raw = if bytes.len() == size {
        bytes
    } else if bytes.len() == prefix.len() + size {
        let (head, tail) = bytes.split_at(prefix.len());
        if head != prefix {
            return Err(KeyError::PrefixMismatch {
                algorithm,
                prefix: hex::encode(head),
            });
        }
        tail
    } else {
        return Err(KeyError::UnrecognizedLength {
            algorithm,
            len: bytes.len(),
        });
    };

    if algorithm == KeyAlgorithm::EcdsaSecp256k1 && !matches!(raw[0], 0x02 | 0x03) {
        return Err(KeyError::InvalidMaterial {
            algorithm,
            reason: format!("not a compressed point (tag {:#04x})", raw[0]),
        });
    }

    Ok(RawKeyView::new(algorithm, raw.to_vec()))
}

/// Recognize a single public key encoding (DER or raw) of either algorithm
pub fn detect_public_key(bytes: &[u8]) -> Result<RawKeyView, KeyError> {
    match bytes.len() {
        n if n == ED25519_PUBLIC_KEY_SIZE || n == ED25519_PUBLIC_DER_PREFIX.len() + ED25519_PUBLIC_KEY_SIZE => {
            strip_prefix_bytes(bytes, KeyAlgorithm::Ed25519)
        }
        n if n == ECDSA_PUBLIC_KEY_SIZE || n == ECDSA_PUBLIC_DER_PREFIX.len() + ECDSA_PUBLIC_KEY_SIZE => {
            strip_prefix_bytes(bytes, KeyAlgorithm::EcdsaSecp256k1)
        }
        n => Err(KeyError::UnknownEncoding(n)),
    }
}

/// DER hex of a public key
pub fn encode_public_der(view: &RawKeyView) -> String {
    let mut out = view.algorithm().public_der_prefix().to_vec();
    out.extend_from_slice(view.as_bytes());
    hex::encode(out)
}

/// DER hex of a 32-byte private key
pub fn encode_private_der(algorithm: KeyAlgorithm, secret: &[u8; PRIVATE_KEY_SIZE]) -> String {
    let mut out = algorithm.private_der_prefix().to_vec();
    out.extend_from_slice(secret);
    hex::encode(out)
}

/// Parse a hex private key in DER or raw form
pub fn parse_private_key(
    encoded: &str,
    algorithm: KeyAlgorithm,
) -> Result<[u8; PRIVATE_KEY_SIZE], KeyError> {
    let bytes = decode_hex(encoded)?;
    let prefix = algorithm.private_der_prefix();

    let raw = if bytes.len() == PRIVATE_KEY_SIZE {
        &bytes[..]
    } else if bytes.len() == prefix.len() + PRIVATE_KEY_SIZE {
        let (head, tail) = bytes.split_at(prefix.len());
        if head != prefix {
            return Err(KeyError::PrefixMismatch {
                algorithm,
                prefix: hex::encode(head),
            });
        }
        tail
    } else {
        return Err(KeyError::UnrecognizedLength {
            algorithm,
            len: bytes.len(),
        });
    };

    let mut secret = [0u8; PRIVATE_KEY_SIZE];
    secret.copy_from_slice(raw);
    Ok(secret)
}

/// Derive the raw public key of a hex private key
pub fn public_key_from_private(
    algorithm: KeyAlgorithm,
    encoded: &str,
) -> Result<RawKeyView, KeyError> {
    let secret = parse_private_key(encoded, algorithm)?;
    let public = match algorithm {
        KeyAlgorithm::Ed25519 => SigningKey::from_bytes(&secret)
            .verifying_key()
            .to_bytes()
            .to_vec(),
        KeyAlgorithm::EcdsaSecp256k1 => {
            let secret_key =
                k256::SecretKey::from_slice(&secret).map_err(|e| KeyError::InvalidMaterial {
                    algorithm,
                    reason: e.to_string(),
                })?;
            secret_key
                .public_key()
                .to_encoded_point(true)
                .as_bytes()
                .to_vec()
        }
    };
    Ok(RawKeyView::new(algorithm, public))
}
