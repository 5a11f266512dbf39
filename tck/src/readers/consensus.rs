use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tck_common::{rpc::RpcClient, TestContext};

use super::{ConsensusReader, EntityId};
use crate::fees::CustomFee;

/// Consensus reads through the SDK's `get*Info` methods
pub struct RpcConsensusReader {
    client: Arc<RpcClient>,
}

impl RpcConsensusReader {
    /// Reader issuing its queries through `client`
    pub fn new(client: Arc<RpcClient>) -> Self {
        Self { client }
    }

    async fn info(&self, ctx: &TestContext, entity: &EntityId) -> Result<Value> {
        let mut params = Map::new();
        params.insert(entity.consensus_param().to_string(), json!(entity.id()));
        self.client
            .call(ctx, entity.consensus_method(), Value::Object(params))
            .await
            .with_context(|| format!("Failed to query {}", entity))
    }
}

#[async_trait]
impl ConsensusReader for RpcConsensusReader {
    async fn entity_key(&self, ctx: &TestContext, entity: &EntityId) -> Result<Option<String>> {
        let info = self.info(ctx, entity).await?;
        let (field, _) = entity.key_fields();
        match info.get(field) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(key)) => Ok(Some(key.clone())),
            Some(other) => anyhow::bail!("Unexpected {} '{}' value: {}", entity, field, other),
        }
    }

    async fn token_custom_fees(&self, ctx: &TestContext, token_id: &str) -> Result<Vec<CustomFee>> {
        let entity = EntityId::Token(token_id.to_string());
        let mut info = self.info(ctx, &entity).await?;
        match info.get_mut("customFees").map(Value::take) {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(fees) => serde_json::from_value(fees)
                .with_context(|| format!("Invalid customFees of {}", entity)),
        }
    }
}
