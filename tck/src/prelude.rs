//! Prelude module for convenient imports
//!
//! ```rust,ignore
//! use sdk_tck::prelude::*;
//! ```

pub use crate::assertions::{skip_unsupported, verify_custom_fees, verify_entity_key};
pub use crate::config::TckConfig;
pub use crate::consistency::{
    ConsistencyCheck, ConsistencyError, ConsistencyVerifier, RetryBudget, ZeroAttempts,
};
pub use crate::fees::{
    consensus_fee_matches, fee_schedules_agree, mirror_fee_matches, AssessmentMethod, CustomFee,
    CustomFeeKind, MirrorCustomFees,
};
pub use crate::keys::{GeneratedKey, KeyMaterial, KeySpec, KeySpecGenerator};
pub use crate::orchestrator::{Clock, PausedClock, SystemClock, TestRng};
pub use crate::readers::{
    ConsensusReader, EntityId, MirrorReader, MirrorRecord, MirrorRestClient, ObservedKey,
    RpcConsensusReader,
};

pub use tck_common::crypto::{KeyAlgorithm, KeyTree, RawKeyView};
pub use tck_common::rpc::{RpcClient, RpcError};
pub use tck_common::TestContext;

// Re-export commonly used external types
pub use anyhow::{anyhow, Context, Result};
pub use std::sync::Arc;
pub use tokio::time::Duration;
