use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use url::Url;

use super::{RpcError, RpcRequest, RpcResponse, Transport};

/// Timeouts for the HTTP transport
#[derive(Debug, Clone)]
pub struct RpcClientConfig {
    pub request_timeout: Duration,
    pub connection_timeout: Duration,
}

impl Default for RpcClientConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            connection_timeout: Duration::from_secs(10),
        }
    }
}

/// JSON-RPC over HTTP POST
pub struct HttpTransport {
    client: Client,
    url: Url,
    config: RpcClientConfig,
}

impl HttpTransport {
    pub fn new(address: &str, config: &RpcClientConfig) -> Result<Self, RpcError> {
        let url = if address.starts_with("http://") || address.starts_with("https://") {
            Url::parse(address)
        } else {
            Url::parse(&format!("http://{}", address))
        }
        .map_err(|e| RpcError::transport(format!("Invalid RPC address '{}': {}", address, e)))?;

        let client = Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connection_timeout)
            .build()
            .map_err(|e| RpcError::transport(format!("Cannot build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url,
            config: config.clone(),
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &RpcRequest) -> Result<RpcResponse, RpcError> {
        let response = self
            .client
            .post(self.url.clone())
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    RpcError::transport(format!(
                        "Request timeout after {:?}",
                        self.config.request_timeout
                    ))
                } else if e.is_connect() {
                    RpcError::transport(format!("Connection failed: {}", e))
                } else {
                    RpcError::transport(format!("Network error: {}", e))
                }
            })?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| RpcError::transport(format!("Failed to read response body: {}", e)))?;

        match serde_json::from_slice::<RpcResponse>(&body) {
            Ok(parsed) if status.is_success() || parsed.error.is_some() => Ok(parsed),
            Ok(_) | Err(_) if !status.is_success() => {
                debug!("HTTP {} without a JSON-RPC error body", status.as_u16());
                Err(RpcError::transport(format!(
                    "HTTP error {}: {}",
                    status.as_u16(),
                    status.canonical_reason().unwrap_or("Unknown error")
                )))
            }
            Ok(parsed) => Ok(parsed),
            Err(e) => Err(RpcError::InvalidResponse(format!(
                "Failed to parse JSON response: {}",
                e
            ))),
        }
    }
}
