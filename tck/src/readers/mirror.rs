use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use log::{debug, warn};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use url::Url;

use super::{EntityId, MirrorReader, MirrorRecord, ObservedKey};
use crate::fees::MirrorCustomFees;

/// REST prefix of every mirror query
pub const MIRROR_API_PREFIX: &str = "api/v1/";

/// Mirror reads over the REST API.
///
/// A 404 means the entity is not indexed yet and is reported as
/// [`MirrorRecord::NotIndexed`]. Server errors, refused connections and
/// timeouts are [`MirrorRecord::Unavailable`] so a warming-up mirror is
/// polled again. Every other failure is an error.
pub struct MirrorRestClient {
    client: Client,
    base_url: Url,
}

impl MirrorRestClient {
    /// Client for the mirror at `address`, `http://` assumed without a scheme
    pub fn new(address: &str, timeout: Duration) -> Result<Self> {
        let address = if address.starts_with("http://") || address.starts_with("https://") {
            address.to_string()
        } else {
            format!("http://{}", address)
        };
        let mut base_url =
            Url::parse(&address).with_context(|| format!("Invalid mirror URL '{}'", address))?;
        // Keep any path prefix when joining relative paths
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build mirror HTTP client")?;

        Ok(Self { client, base_url })
    }

    /// Base URL queries are resolved against
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Full URL of an entity record
    pub fn entity_url(&self, entity: &EntityId) -> Result<Url> {
        self.base_url
            .join(MIRROR_API_PREFIX)
            .and_then(|api| api.join(&entity.mirror_path()))
            .with_context(|| format!("Cannot build mirror URL for {}", entity))
    }

    async fn record(&self, entity: &EntityId) -> Result<MirrorRecord<Value>> {
        let url = self.entity_url(entity)?;
        debug!("GET {}", url);

        let response = match self.client.get(url.clone()).send().await {
            Ok(response) => response,
            Err(e) if e.is_connect() || e.is_timeout() => {
                warn!("Mirror unreachable at {}: {}", url, e);
                return Ok(MirrorRecord::Unavailable(e.to_string()));
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Mirror request to {} failed", url));
            }
        };

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            debug!("{} not indexed yet", entity);
            return Ok(MirrorRecord::NotIndexed);
        }
        if status.is_server_error() {
            warn!("Mirror returned HTTP {} for {}", status, url);
            return Ok(MirrorRecord::Unavailable(format!("HTTP {}", status)));
        }
        if !status.is_success() {
            anyhow::bail!("Mirror returned HTTP {} for {}", status, url);
        }

        let body = response
            .json::<Value>()
            .await
            .with_context(|| format!("Invalid mirror response from {}", url))?;
        Ok(MirrorRecord::Found(body))
    }
}

#[async_trait]
impl MirrorReader for MirrorRestClient {
    async fn entity_key(&self, entity: &EntityId) -> Result<MirrorRecord<Option<ObservedKey>>> {
        let (_, field) = entity.key_fields();
        let mut body = match self.record(entity).await? {
            MirrorRecord::Found(body) => body,
            MirrorRecord::NotIndexed => return Ok(MirrorRecord::NotIndexed),
            MirrorRecord::Unavailable(reason) => return Ok(MirrorRecord::Unavailable(reason)),
        };
        let key = match body.get_mut(field).map(Value::take) {
            None | Some(Value::Null) => None,
            Some(key) => Some(
                serde_json::from_value(key)
                    .with_context(|| format!("Invalid {} of {}", field, entity))?,
            ),
        };
        Ok(MirrorRecord::Found(key))
    }

    async fn token_custom_fees(&self, token_id: &str) -> Result<MirrorRecord<MirrorCustomFees>> {
        let entity = EntityId::Token(token_id.to_string());
        let mut body = match self.record(&entity).await? {
            MirrorRecord::Found(body) => body,
            MirrorRecord::NotIndexed => return Ok(MirrorRecord::NotIndexed),
            MirrorRecord::Unavailable(reason) => return Ok(MirrorRecord::Unavailable(reason)),
        };
        let fees = match body.get_mut("custom_fees").map(Value::take) {
            None | Some(Value::Null) => MirrorCustomFees::default(),
            Some(fees) => serde_json::from_value(fees)
                .with_context(|| format!("Invalid custom_fees of {}", entity))?,
        };
        Ok(MirrorRecord::Found(fees))
    }
}
