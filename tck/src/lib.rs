//! # SDK TCK: Technology Compatibility Kit
//!
//! Core of a harness that checks an SDK against a live ledger by talking
//! to it over JSON-RPC.
//!
//! ## Architecture Overview
//!
//! - **keys**: declarative key shapes, materialized through `generateKey`
//! - **consistency**: bounded polling until the consensus and mirror
//!   sources agree
//! - **fees**: custom fee schedules and their cross-source comparison
//! - **readers**: consensus (JSON-RPC) and mirror (REST) views
//! - **assertions**: key and fee checks built from the pieces above
//!
//! The wire-level gateway and key codec live in `tck_common`.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use sdk_tck::prelude::*;
//!
//! #[tokio::test(start_paused = true)]
//! async fn test_account_key() -> Result<()> {
//!     let config = TckConfig::default();
//!     let client = Arc::new(config.rpc_client()?);
//!     let ctx = TestContext::new("account key");
//!
//!     let spec = KeySpec::key_list(vec![KeySpec::ed25519(), KeySpec::ecdsa_secp256k1()]);
//!     let key = KeySpecGenerator::new(client.clone()).generate(&ctx, &spec).await?;
//!
//!     // ... create the account with `key.encoded`, sign with `key.signing_keys` ...
//!
//!     let verifier = ConsistencyVerifier::new(Arc::new(SystemClock), config.retry_budget()?);
//!     verify_entity_key(
//!         &ctx,
//!         &verifier,
//!         &RpcConsensusReader::new(client),
//!         &config.mirror_client()?,
//!         &EntityId::Account(account_id),
//!         &key.encoded,
//!     )
//!     .await
//! }
//! ```
//!
//! ## Design Principles
//!
//! 1. **Deterministic**: waiting goes through `Clock`, randomness through `TestRng`
//! 2. **Bounded**: every mirror read has an attempt budget
//! 3. **Framing-free**: keys are compared as trees, never as encoded strings

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::result_large_err)]

/// Clock and seeded RNG
pub mod orchestrator;

/// Key specs and their generator
pub mod keys;

/// Consensus/mirror convergence checks
pub mod consistency;

/// Custom fee models and comparison
pub mod fees;

/// Consensus and mirror readers
pub mod readers;

/// Composed key and fee assertions
pub mod assertions;

/// YAML harness configuration
pub mod config;

/// In-process backend and mirror for tests
pub mod test_utils;

/// Convenient re-exports for common usage
pub mod prelude;

// =============================================================================
// Re-exports
// =============================================================================

pub use assertions::{skip_unsupported, verify_custom_fees, verify_entity_key};
pub use config::TckConfig;
pub use consistency::{
    ConsistencyCheck, ConsistencyError, ConsistencyVerifier, RetryBudget, ZeroAttempts,
};
pub use keys::{GenerateError, GeneratedKey, KeyMaterial, KeySpec, KeySpecGenerator};
pub use orchestrator::{Clock, PausedClock, SystemClock, TestRng};

/// TCK version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
