use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt};
use log::debug;
use serde::{Deserialize, Serialize};
use tck_common::{
    crypto::{
        encode_public_der, public_key_from_private, strip_prefix, KeyAlgorithm, KeyError,
        KeyMessage, RawKeyView,
    },
    rpc::{RpcClient, RpcError},
    TestContext,
};
use thiserror::Error;

use super::{GeneratedKey, KeyMaterial, KeySpec};

/// Backend method that returns a new private key
pub const GENERATE_KEY_METHOD: &str = "generateKey";

/// Failure while materializing a [`KeySpec`]
#[derive(Debug, Error)]
pub enum GenerateError {
    /// The backend call failed or was not implemented
    #[error(transparent)]
    Rpc(#[from] RpcError),
    /// Supplied or returned key material could not be decoded
    #[error(transparent)]
    Key(#[from] KeyError),
}

impl GenerateError {
    /// True when the backend does not implement key generation
    pub fn is_not_implemented(&self) -> bool {
        matches!(self, Self::Rpc(e) if e.is_not_implemented())
    }
}

#[derive(Serialize)]
struct GenerateKeyParams {
    #[serde(rename = "type")]
    key_type: &'static str,
}

#[derive(Deserialize)]
struct GenerateKeyResult {
    key: String,
}

// Key of one subtree: protobuf form for the parent plus the flat output
struct Materialized {
    message: KeyMessage,
    encoded: String,
    signing_keys: Vec<String>,
}

fn private_key_type(algorithm: KeyAlgorithm) -> &'static str {
    match algorithm {
        KeyAlgorithm::Ed25519 => "ed25519PrivateKey",
        KeyAlgorithm::EcdsaSecp256k1 => "ecdsaSecp256k1PrivateKey",
    }
}

/// Turns a [`KeySpec`] into concrete key material.
///
/// Only fresh leaves reach the backend; public keys are derived and lists
/// are encoded in-process, so a spec with `n` fresh leaves costs exactly
/// `n` round trips.
pub struct KeySpecGenerator {
    client: Arc<RpcClient>,
}

impl KeySpecGenerator {
    /// Generator issuing its round trips through `client`
    pub fn new(client: Arc<RpcClient>) -> Self {
        Self { client }
    }

    /// Materialize `spec`, children before parents.
    ///
    /// The first failing leaf aborts the whole call.
    pub async fn generate(
        &self,
        ctx: &TestContext,
        spec: &KeySpec,
    ) -> Result<GeneratedKey, GenerateError> {
        let key = self.materialize(ctx, spec).await?;
        debug!(
            "[{}] generated key with {} signing key(s)",
            ctx.scenario(),
            key.signing_keys.len()
        );
        Ok(GeneratedKey {
            encoded: key.encoded,
            signing_keys: key.signing_keys,
        })
    }

    fn materialize<'a>(
        &'a self,
        ctx: &'a TestContext,
        spec: &'a KeySpec,
    ) -> BoxFuture<'a, Result<Materialized, GenerateError>> {
        async move {
            match spec {
                KeySpec::Single {
                    algorithm,
                    material,
                } => self.single(ctx, *algorithm, material).await,
                KeySpec::List {
                    children,
                    threshold,
                } => {
                    let mut messages = Vec::with_capacity(children.len());
                    let mut signing_keys = Vec::new();
                    for child in children {
                        let key = self.materialize(ctx, child).await?;
                        messages.push(key.message);
                        signing_keys.extend(key.signing_keys);
                    }
                    let message = KeyMessage::list(messages, *threshold);
                    Ok(Materialized {
                        encoded: message.to_hex(),
                        message,
                        signing_keys,
                    })
                }
            }
        }
        .boxed()
    }

    async fn single(
        &self,
        ctx: &TestContext,
        algorithm: KeyAlgorithm,
        material: &KeyMaterial,
    ) -> Result<Materialized, GenerateError> {
        match material {
            KeyMaterial::PublicKey(encoded) => {
                let view = strip_prefix(encoded, algorithm)?;
                Ok(Materialized {
                    message: KeyMessage::single(&view),
                    encoded: encoded.clone(),
                    signing_keys: Vec::new(),
                })
            }
            KeyMaterial::PrivateKey(private_key) => {
                let view = public_key_from_private(algorithm, private_key)?;
                Ok(from_private(view, private_key.clone()))
            }
            KeyMaterial::Fresh => {
                let params = GenerateKeyParams {
                    key_type: private_key_type(algorithm),
                };
                debug!("[{}] requesting fresh {} key", ctx.scenario(), algorithm);
                let result: GenerateKeyResult = self
                    .client
                    .call_as(ctx, GENERATE_KEY_METHOD, &params)
                    .await?;
                let view = public_key_from_private(algorithm, &result.key)?;
                Ok(from_private(view, result.key))
            }
        }
    }
}

fn from_private(view: RawKeyView, private_key: String) -> Materialized {
    Materialized {
        message: KeyMessage::single(&view),
        encoded: encode_public_der(&view),
        signing_keys: vec![private_key],
    }
}
