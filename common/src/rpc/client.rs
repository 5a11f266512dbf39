use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use async_trait::async_trait;
use log::{debug, trace};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;

use super::{RpcError, RpcRequest, RpcResponse};
use crate::context::TestContext;

/// Delivers one request and returns the backend's structured response.
///
/// Implementations return `RpcError::Transport` when nothing structured
/// came back; classification of the `error` member is left to the client.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &RpcRequest) -> Result<RpcResponse, RpcError>;
}

/// Parameters of the backend `setup` method
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SetupParams {
    pub operator_account_id: String,
    pub operator_private_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_ip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_account_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mirror_network_ip: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SetupResponse {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
}

/// JSON-RPC gateway to the SDK under test.
///
/// Owns its correlation-id counter: ids start at 1 and increase by one per
/// call, and every response must echo the id of its request.
pub struct RpcClient {
    transport: Arc<dyn Transport>,
    next_id: AtomicU64,
}

impl RpcClient {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            next_id: AtomicU64::new(0),
        }
    }

    /// Client talking JSON over HTTP POST to `address`
    #[cfg(feature = "rpc-client")]
    pub fn http(address: &str, config: &super::RpcClientConfig) -> Result<Self, RpcError> {
        let transport = super::HttpTransport::new(address, config)?;
        Ok(Self::new(Arc::new(transport)))
    }

    fn allocate_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Id of the most recently issued request, 0 if none was sent yet
    pub fn last_id(&self) -> u64 {
        self.next_id.load(Ordering::SeqCst)
    }

    /// Call `method` and return the raw `result` member
    pub async fn call(
        &self,
        ctx: &TestContext,
        method: &str,
        params: Value,
    ) -> Result<Value, RpcError> {
        let params = attach_session(ctx, method, params)?;
        let id = self.allocate_id();
        let request = RpcRequest::new(id, method, params);
        debug!("[{}] -> {} (id {})", ctx.scenario(), method, id);
        trace!("request: {:?}", request);

        let response = self.transport.send(&request).await?;

        // A server that could not parse the request answers with a null id
        let id_matches = response.id == Value::from(id);
        if !id_matches && !(response.id.is_null() && response.error.is_some()) {
            return Err(RpcError::MismatchedId {
                expected: id,
                got: response.id,
            });
        }

        if let Some(error) = response.error {
            let error = RpcError::from_error_object(method, error);
            debug!("[{}] <- {} (id {}) failed: {}", ctx.scenario(), method, id, error);
            return Err(error);
        }

        debug!("[{}] <- {} (id {}) ok", ctx.scenario(), method, id);
        Ok(response.result.unwrap_or(Value::Null))
    }

    /// Typed variant of [`RpcClient::call`]
    pub async fn call_as<P, R>(
        &self,
        ctx: &TestContext,
        method: &str,
        params: &P,
    ) -> Result<R, RpcError>
    where
        P: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let params = serde_json::to_value(params)
            .map_err(|e| RpcError::InvalidResponse(format!("Cannot encode params: {}", e)))?;
        let result = self.call(ctx, method, params).await?;
        serde_json::from_value(result).map_err(|e| {
            RpcError::InvalidResponse(format!("Unexpected result for '{}': {}", method, e))
        })
    }

    /// Open a backend session with the given operator.
    ///
    /// The caller stores the returned session id into its own context.
    pub async fn setup(
        &self,
        ctx: &TestContext,
        params: &SetupParams,
    ) -> Result<SetupResponse, RpcError> {
        self.call_as(ctx, "setup", params).await
    }

    /// Release the backend session of `ctx`
    pub async fn reset(&self, ctx: &TestContext) -> Result<(), RpcError> {
        self.call(ctx, "reset", Value::Object(Default::default()))
            .await
            .map(|_| ())
    }
}

// A session-bound call must carry its session id, so only object or
// missing params can be sent under a session
fn attach_session(ctx: &TestContext, method: &str, params: Value) -> Result<Value, RpcError> {
    let Some(session_id) = ctx.session_id() else {
        return Ok(params);
    };

    let mut map = match params {
        Value::Object(map) => map,
        Value::Null => serde_json::Map::new(),
        other => {
            return Err(RpcError::InvalidParams(format!(
                "'{}' is session-bound but its params are not an object: {}",
                method, other
            )));
        }
    };
    map.insert(
        "sessionId".to_string(),
        Value::String(session_id.to_string()),
    );
    Ok(Value::Object(map))
}
