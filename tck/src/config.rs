//! Harness configuration, loaded from YAML.
//!
//! Every field has a default so an empty file is a valid configuration
//! pointing at a local SDK server and a local mirror.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use tck_common::rpc::{RpcClient, RpcClientConfig, SetupParams};
use thiserror::Error;
use url::Url;

use crate::consistency::RetryBudget;
use crate::readers::MirrorRestClient;

/// Default values and accepted ranges
pub mod defaults {
    /// JSON-RPC endpoint of the SDK under test
    pub const RPC_URL: &str = "http://localhost:8544";
    /// Mirror REST endpoint
    pub const MIRROR_URL: &str = "http://127.0.0.1:5551";

    /// Per-request timeout
    pub const REQUEST_TIMEOUT_SECS: u64 = 30;
    /// TCP connect timeout
    pub const CONNECTION_TIMEOUT_SECS: u64 = 10;
    /// Mirror request timeout
    pub const MIRROR_TIMEOUT_SECS: u64 = 10;
    /// Probes per consistency check
    pub const CONSISTENCY_ATTEMPTS: u32 = 10;
    /// Delay between probes
    pub const CONSISTENCY_INTERVAL_MS: u64 = 1000;

    /// Shortest accepted timeout
    pub const MIN_TIMEOUT_SECS: u64 = 1;
    /// Longest accepted timeout
    pub const MAX_TIMEOUT_SECS: u64 = 300;
    /// Largest accepted number of probes
    pub const MAX_CONSISTENCY_ATTEMPTS: u32 = 120;
    /// Shortest accepted probe interval
    pub const MIN_CONSISTENCY_INTERVAL_MS: u64 = 10;
    /// Longest accepted probe interval
    pub const MAX_CONSISTENCY_INTERVAL_MS: u64 = 60_000;
}

/// Rejected configuration values
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// URL that does not parse
    #[error("Invalid {field}: '{value}'")]
    InvalidUrl {
        /// Field name
        field: &'static str,
        /// Offending value
        value: String,
    },
    /// Number outside its accepted range
    #[error("{field} must be between {min} and {max}, got {value}")]
    OutOfRange {
        /// Field name
        field: &'static str,
        /// Offending value
        value: u64,
        /// Lower bound
        min: u64,
        /// Upper bound
        max: u64,
    },
    /// Operator account without its key, or the reverse
    #[error("operator_account_id and operator_private_key must be set together")]
    IncompleteOperator,
}

/// Harness settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TckConfig {
    /// JSON-RPC endpoint of the SDK under test
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,

    /// Mirror REST endpoint
    #[serde(default = "default_mirror_url")]
    pub mirror_url: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// TCP connect timeout in seconds
    #[serde(default = "default_connection_timeout_secs")]
    pub connection_timeout_secs: u64,

    /// Mirror request timeout in seconds
    #[serde(default = "default_mirror_timeout_secs")]
    pub mirror_timeout_secs: u64,

    /// Probes per consistency check
    #[serde(default = "default_consistency_attempts")]
    pub consistency_attempts: u32,

    /// Delay between probes in milliseconds
    #[serde(default = "default_consistency_interval_ms")]
    pub consistency_interval_ms: u64,

    /// Operator paying for the scenario's transactions
    #[serde(default)]
    pub operator_account_id: Option<String>,

    /// DER hex private key of the operator
    #[serde(default)]
    pub operator_private_key: Option<String>,

    /// Consensus node address passed to `setup`
    #[serde(default)]
    pub node_ip: Option<String>,

    /// Consensus node account passed to `setup`
    #[serde(default)]
    pub node_account_id: Option<String>,

    /// Mirror address passed to `setup`
    #[serde(default)]
    pub mirror_network_ip: Option<String>,
}

fn default_rpc_url() -> String {
    defaults::RPC_URL.to_string()
}
fn default_mirror_url() -> String {
    defaults::MIRROR_URL.to_string()
}
fn default_request_timeout_secs() -> u64 {
    defaults::REQUEST_TIMEOUT_SECS
}
fn default_connection_timeout_secs() -> u64 {
    defaults::CONNECTION_TIMEOUT_SECS
}
fn default_mirror_timeout_secs() -> u64 {
    defaults::MIRROR_TIMEOUT_SECS
}
fn default_consistency_attempts() -> u32 {
    defaults::CONSISTENCY_ATTEMPTS
}
fn default_consistency_interval_ms() -> u64 {
    defaults::CONSISTENCY_INTERVAL_MS
}

impl Default for TckConfig {
    fn default() -> Self {
        Self {
            rpc_url: default_rpc_url(),
            mirror_url: default_mirror_url(),
            request_timeout_secs: default_request_timeout_secs(),
            connection_timeout_secs: default_connection_timeout_secs(),
            mirror_timeout_secs: default_mirror_timeout_secs(),
            consistency_attempts: default_consistency_attempts(),
            consistency_interval_ms: default_consistency_interval_ms(),
            operator_account_id: None,
            operator_private_key: None,
            node_ip: None,
            node_account_id: None,
            mirror_network_ip: None,
        }
    }
}

impl TckConfig {
    /// Read and validate a YAML configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config = Self::from_yaml(&content)
            .with_context(|| format!("Failed to load config file: {}", path.display()))?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Parse and validate YAML text
    pub fn from_yaml(content: &str) -> Result<Self> {
        // An empty document deserializes to unit, not to an empty mapping
        let config: Self = if content.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml::from_str(content).context("Failed to parse configuration")?
        };
        config.validate()?;
        Ok(config)
    }

    /// Check URLs, ranges and operator completeness
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_url("rpc_url", &self.rpc_url)?;
        validate_url("mirror_url", &self.mirror_url)?;

        let timeouts = [
            ("request_timeout_secs", self.request_timeout_secs),
            ("connection_timeout_secs", self.connection_timeout_secs),
            ("mirror_timeout_secs", self.mirror_timeout_secs),
        ];
        for (field, value) in timeouts {
            check_range(
                field,
                value,
                defaults::MIN_TIMEOUT_SECS,
                defaults::MAX_TIMEOUT_SECS,
            )?;
        }
        check_range(
            "consistency_attempts",
            self.consistency_attempts as u64,
            1,
            defaults::MAX_CONSISTENCY_ATTEMPTS as u64,
        )?;
        check_range(
            "consistency_interval_ms",
            self.consistency_interval_ms,
            defaults::MIN_CONSISTENCY_INTERVAL_MS,
            defaults::MAX_CONSISTENCY_INTERVAL_MS,
        )?;

        if self.operator_account_id.is_some() != self.operator_private_key.is_some() {
            return Err(ConfigError::IncompleteOperator);
        }
        if self.connection_timeout_secs > self.request_timeout_secs {
            warn!(
                "connection_timeout_secs ({}) exceeds request_timeout_secs ({})",
                self.connection_timeout_secs, self.request_timeout_secs
            );
        }
        Ok(())
    }

    /// Timeouts of the JSON-RPC gateway
    pub fn rpc_client_config(&self) -> RpcClientConfig {
        RpcClientConfig {
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            connection_timeout: Duration::from_secs(self.connection_timeout_secs),
        }
    }

    /// Budget of the consistency verifier
    pub fn retry_budget(&self) -> Result<RetryBudget, ConfigError> {
        RetryBudget::new(
            self.consistency_attempts,
            Duration::from_millis(self.consistency_interval_ms),
        )
        .map_err(|_| ConfigError::OutOfRange {
            field: "consistency_attempts",
            value: self.consistency_attempts as u64,
            min: 1,
            max: defaults::MAX_CONSISTENCY_ATTEMPTS as u64,
        })
    }

    /// Gateway to the SDK under test
    pub fn rpc_client(&self) -> Result<RpcClient> {
        RpcClient::http(&self.rpc_url, &self.rpc_client_config())
            .with_context(|| format!("Failed to create RPC client for {}", self.rpc_url))
    }

    /// REST client of the mirror
    pub fn mirror_client(&self) -> Result<MirrorRestClient> {
        MirrorRestClient::new(
            &self.mirror_url,
            Duration::from_secs(self.mirror_timeout_secs),
        )
    }

    /// Parameters of the backend `setup` call, when an operator is set
    pub fn setup_params(&self) -> Option<SetupParams> {
        Some(SetupParams {
            operator_account_id: self.operator_account_id.clone()?,
            operator_private_key: self.operator_private_key.clone()?,
            node_ip: self.node_ip.clone(),
            node_account_id: self.node_account_id.clone(),
            mirror_network_ip: self.mirror_network_ip.clone(),
        })
    }
}

fn validate_url(field: &'static str, value: &str) -> Result<(), ConfigError> {
    let candidate = if value.starts_with("http://") || value.starts_with("https://") {
        value.to_string()
    } else {
        format!("http://{}", value)
    };
    match Url::parse(&candidate) {
        Ok(url) if url.host().is_some() => Ok(()),
        _ => Err(ConfigError::InvalidUrl {
            field,
            value: value.to_string(),
        }),
    }
}

fn check_range(field: &'static str, value: u64, min: u64, max: u64) -> Result<(), ConfigError> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            field,
            value,
            min,
            max,
        })
    }
}
