//! In-process stand-ins for the SDK backend and the mirror.
//!
//! [`LocalKeyBackend`] answers the JSON-RPC methods the kit issues with
//! locally generated keys and an in-memory ledger. [`LaggingMirror`] serves
//! the same data after a configurable number of polls, which is how the
//! mirror's indexing delay shows up to an assertion.

use std::collections::{HashMap, HashSet};

use anyhow::Result;
use async_trait::async_trait;
use log::debug;
use parking_lot::Mutex;
use serde_json::{json, Map, Value};
use tck_common::{
    crypto::{
        encode_private_der, public_key_from_private, KeyAlgorithm, KeyError, KeyTree,
        PRIVATE_KEY_SIZE,
    },
    rpc::{
        RpcError, RpcErrorObject, RpcRequest, RpcResponse, Transport, INTERNAL_ERROR,
        INVALID_PARAMS, METHOD_NOT_FOUND,
    },
};

use crate::fees::{
    AssessmentMethod, CustomFee, CustomFeeKind, MirrorCustomFees, MirrorFallbackFee,
    MirrorFixedFee, MirrorFraction, MirrorFractionalFee, MirrorRoyaltyFee,
};
use crate::keys::GENERATE_KEY_METHOD;
use crate::orchestrator::TestRng;
use crate::readers::{EntityId, MirrorReader, MirrorRecord, ObservedKey};

#[derive(Default)]
struct BackendState {
    generate_calls: usize,
    fail_generate_after: Option<usize>,
    disabled: HashSet<String>,
    entity_keys: HashMap<EntityId, String>,
    token_fees: HashMap<String, Vec<CustomFee>>,
    methods: Vec<String>,
}

/// JSON-RPC backend that runs entirely in memory.
///
/// Keys come from a seeded [`TestRng`], so a run can be replayed.
pub struct LocalKeyBackend {
    rng: TestRng,
    state: Mutex<BackendState>,
}

impl LocalKeyBackend {
    /// Backend drawing key material from `seed`
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(TestRng::with_seed(seed))
    }

    /// Backend drawing key material from `rng`
    pub fn with_rng(rng: TestRng) -> Self {
        Self {
            rng,
            state: Mutex::new(BackendState::default()),
        }
    }

    /// Number of `generateKey` requests received
    pub fn generate_calls(&self) -> usize {
        self.state.lock().generate_calls
    }

    /// Methods received so far, in order
    pub fn methods(&self) -> Vec<String> {
        self.state.lock().methods.clone()
    }

    /// Fail every `generateKey` request after the first `n`
    pub fn fail_generate_after(&self, n: usize) {
        self.state.lock().fail_generate_after = Some(n);
    }

    /// Answer `method` with "method not found"
    pub fn disable_method(&self, method: &str) {
        self.state.lock().disabled.insert(method.to_string());
    }

    /// Key reported by the `get*Info` method of `entity`
    pub fn set_entity_key(&self, entity: &EntityId, encoded: &str) {
        self.state
            .lock()
            .entity_keys
            .insert(entity.clone(), encoded.to_string());
    }

    /// Fee schedule reported by `getTokenInfo`
    pub fn set_token_fees(&self, token_id: &str, fees: &[CustomFee]) {
        self.state
            .lock()
            .token_fees
            .insert(token_id.to_string(), fees.to_vec());
    }

    /// Random DER private key of `algorithm`
    pub fn new_private_key(&self, algorithm: KeyAlgorithm) -> String {
        loop {
            let mut secret = [0u8; PRIVATE_KEY_SIZE];
            self.rng.fill_bytes(&mut secret);
            let der = encode_private_der(algorithm, &secret);
            // Out-of-range secp256k1 scalars are redrawn
            if public_key_from_private(algorithm, &der).is_ok() {
                return der;
            }
        }
    }

    fn generate_key(&self, params: &Value) -> Result<Value, RpcErrorObject> {
        let calls = {
            let mut state = self.state.lock();
            state.generate_calls += 1;
            if matches!(state.fail_generate_after, Some(n) if state.generate_calls > n) {
                return Err(RpcErrorObject::new(INTERNAL_ERROR, "Key generation failed")
                    .with_status("INVALID_KEY_ENCODING"));
            }
            state.generate_calls
        };

        let algorithm = match params.get("type").and_then(Value::as_str) {
            Some("ed25519PrivateKey") => KeyAlgorithm::Ed25519,
            Some("ecdsaSecp256k1PrivateKey") => KeyAlgorithm::EcdsaSecp256k1,
            other => {
                return Err(RpcErrorObject::new(
                    INVALID_PARAMS,
                    format!("Unsupported key type {:?}", other),
                ))
            }
        };
        debug!("generateKey #{} ({})", calls, algorithm);
        Ok(json!({ "key": self.new_private_key(algorithm) }))
    }

    fn entity_info(&self, entity: &EntityId) -> Value {
        let state = self.state.lock();
        let (key_field, _) = entity.key_fields();
        let mut info = Map::new();
        info.insert(entity.consensus_param().to_string(), json!(entity.id()));
        info.insert(
            key_field.to_string(),
            state
                .entity_keys
                .get(entity)
                .map_or(Value::Null, |key| json!(key)),
        );
        if let EntityId::Token(id) = entity {
            let fees = state.token_fees.get(id).cloned().unwrap_or_default();
            info.insert("customFees".to_string(), json!(fees));
        }
        Value::Object(info)
    }

    fn handle(&self, request: &RpcRequest) -> Result<Value, RpcErrorObject> {
        if self.state.lock().disabled.contains(&request.method) {
            return Err(method_not_found(&request.method));
        }

        match request.method.as_str() {
            GENERATE_KEY_METHOD => self.generate_key(&request.params),
            "setup" => Ok(json!({
                "message": "Successfully setup client",
                "status": "SUCCESS",
                "sessionId": format!("session-{:08x}", self.rng.gen::<u32>()),
            })),
            "reset" => Ok(json!({ "status": "SUCCESS" })),
            method => match entity_for(method, &request.params) {
                Some(Ok(entity)) => Ok(self.entity_info(&entity)),
                Some(Err(e)) => Err(e),
                None => Err(method_not_found(method)),
            },
        }
    }
}

fn method_not_found(method: &str) -> RpcErrorObject {
    RpcErrorObject::new(METHOD_NOT_FOUND, format!("Method not found: {}", method))
}

fn entity_for(method: &str, params: &Value) -> Option<Result<EntityId, RpcErrorObject>> {
    let (constructor, param): (fn(String) -> EntityId, &str) = match method {
        "getAccountInfo" => (EntityId::Account, "accountId"),
        "getTokenInfo" => (EntityId::Token, "tokenId"),
        "getTopicInfo" => (EntityId::Topic, "topicId"),
        "getContractInfo" => (EntityId::Contract, "contractId"),
        _ => return None,
    };
    Some(
        params
            .get(param)
            .and_then(Value::as_str)
            .map(|id| constructor(id.to_string()))
            .ok_or_else(|| RpcErrorObject::new(INVALID_PARAMS, format!("Missing '{}'", param))),
    )
}

#[async_trait]
impl Transport for LocalKeyBackend {
    async fn send(&self, request: &RpcRequest) -> Result<RpcResponse, RpcError> {
        self.state.lock().methods.push(request.method.clone());
        Ok(match self.handle(request) {
            Ok(result) => RpcResponse::success(request.id, result),
            Err(error) => RpcResponse::failure(Value::from(request.id), error),
        })
    }
}

#[derive(Default)]
struct MirrorState {
    keys: HashMap<EntityId, Option<ObservedKey>>,
    fees: HashMap<String, MirrorCustomFees>,
    key_polls: HashMap<EntityId, u32>,
    fee_polls: HashMap<String, u32>,
}

/// Mirror that reports an entity as not indexed for its first `lag` polls
pub struct LaggingMirror {
    lag: u32,
    outage: u32,
    state: Mutex<MirrorState>,
}

impl LaggingMirror {
    /// Mirror hiding each record for `lag` polls
    pub fn new(lag: u32) -> Self {
        Self {
            lag,
            outage: 0,
            state: Mutex::new(MirrorState::default()),
        }
    }

    /// Answer the first `polls` polls of each record as unavailable,
    /// before the `lag` polls start
    pub fn with_outage(mut self, polls: u32) -> Self {
        self.outage = polls;
        self
    }

    fn gate<T>(&self, polls: u32) -> Option<MirrorRecord<T>> {
        if polls <= self.outage {
            Some(MirrorRecord::Unavailable("HTTP 503 Service Unavailable".into()))
        } else if polls - self.outage <= self.lag {
            Some(MirrorRecord::NotIndexed)
        } else {
            None
        }
    }

    /// Record the key the mirror will eventually report for `entity`
    pub fn set_entity_key(&self, entity: &EntityId, key: Option<ObservedKey>) {
        self.state.lock().keys.insert(entity.clone(), key);
    }

    /// Record the fees the mirror will eventually report for `token_id`
    pub fn set_token_fees(&self, token_id: &str, fees: &[CustomFee]) {
        self.state
            .lock()
            .fees
            .insert(token_id.to_string(), mirror_fees_for(token_id, fees));
    }

    /// Key polls received for `entity`
    pub fn key_polls(&self, entity: &EntityId) -> u32 {
        self.state.lock().key_polls.get(entity).copied().unwrap_or(0)
    }

    /// Fee polls received for `token_id`
    pub fn fee_polls(&self, token_id: &str) -> u32 {
        self.state.lock().fee_polls.get(token_id).copied().unwrap_or(0)
    }
}

#[async_trait]
impl MirrorReader for LaggingMirror {
    async fn entity_key(&self, entity: &EntityId) -> Result<MirrorRecord<Option<ObservedKey>>> {
        let mut state = self.state.lock();
        let polls = state.key_polls.entry(entity.clone()).or_insert(0);
        *polls += 1;
        if let Some(record) = self.gate(*polls) {
            return Ok(record);
        }
        Ok(state
            .keys
            .get(entity)
            .cloned()
            .map_or(MirrorRecord::NotIndexed, MirrorRecord::Found))
    }

    async fn token_custom_fees(&self, token_id: &str) -> Result<MirrorRecord<MirrorCustomFees>> {
        let mut state = self.state.lock();
        let polls = state.fee_polls.entry(token_id.to_string()).or_insert(0);
        *polls += 1;
        if let Some(record) = self.gate(*polls) {
            return Ok(record);
        }
        Ok(state
            .fees
            .get(token_id)
            .cloned()
            .map_or(MirrorRecord::NotIndexed, MirrorRecord::Found))
    }
}

/// Mirror-style rendering of an encoded key: raw hex for single keys,
/// `ProtobufEncoded` for lists
pub fn observed_key_for(encoded: &str) -> Result<ObservedKey, KeyError> {
    Ok(match KeyTree::decode(encoded)? {
        KeyTree::Single(view) => ObservedKey {
            key_type: view.algorithm().to_string(),
            key: view.to_hex(),
        },
        tree @ KeyTree::List { .. } => ObservedKey {
            key_type: ObservedKey::PROTOBUF_ENCODED.to_string(),
            key: tree.encode(),
        },
    })
}

/// How the mirror indexes a consensus fee schedule of `token_id`
pub fn mirror_fees_for(token_id: &str, fees: &[CustomFee]) -> MirrorCustomFees {
    let mut mirror = MirrorCustomFees::default();
    for fee in fees {
        let collector = Some(fee.fee_collector_account_id.clone());
        let exempt = fee.fee_collectors_exempt;
        match &fee.kind {
            CustomFeeKind::FixedFee(fixed) => mirror.fixed_fees.push(MirrorFixedFee {
                all_collectors_are_exempt: exempt,
                amount: fixed.amount,
                collector_account_id: collector,
                denominating_token_id: fixed.denominating_token_id.clone(),
            }),
            CustomFeeKind::FractionalFee(fractional) => {
                mirror.fractional_fees.push(MirrorFractionalFee {
                    all_collectors_are_exempt: exempt,
                    amount: MirrorFraction {
                        numerator: fractional.numerator,
                        denominator: fractional.denominator,
                    },
                    collector_account_id: collector,
                    denominating_token_id: Some(token_id.to_string()),
                    maximum: fractional.maximum_amount,
                    minimum: fractional.minimum_amount,
                    net_of_transfers: fractional.assessment_method == AssessmentMethod::Exclusive,
                })
            }
            CustomFeeKind::RoyaltyFee(royalty) => mirror.royalty_fees.push(MirrorRoyaltyFee {
                all_collectors_are_exempt: exempt,
                amount: MirrorFraction {
                    numerator: royalty.numerator,
                    denominator: royalty.denominator,
                },
                collector_account_id: collector,
                fallback_fee: royalty.fallback_fee.as_ref().map(|fallback| MirrorFallbackFee {
                    amount: fallback.amount,
                    denominating_token_id: fallback.denominating_token_id.clone(),
                }),
            }),
        }
    }
    mirror
}
