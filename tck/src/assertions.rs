//! Assertions that compare what a scenario wrote against both data sources.
//!
//! The consensus source is checked once, right away; the mirror source is
//! only ever read through a [`ConsistencyCheck`].

use anyhow::{Context, Result};
use log::info;
use tck_common::{crypto::KeyTree, rpc::RpcError, TestContext};

use crate::consistency::{ConsistencyCheck, ConsistencyVerifier};
use crate::fees::{consensus_fees_match, fee_schedules_agree, CustomFee, MirrorCustomFees};
use crate::readers::{ConsensusReader, EntityId, MirrorReader, MirrorRecord};

/// Turn "method not implemented" into a skip.
///
/// Returns `Ok(None)` when the SDK under test does not implement the
/// method, so the caller can end the scenario as skipped instead of failed.
pub fn skip_unsupported<T>(result: Result<T, RpcError>) -> Result<Option<T>, RpcError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(RpcError::NotImplemented { method, message }) => {
            info!(
                "Skipping: '{}' is not implemented ({})",
                method,
                message.as_deref().unwrap_or("no message")
            );
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

// An entity without a key is expected only when the empty list was set
fn key_matches(expected: &KeyTree, observed: Option<&KeyTree>) -> bool {
    match observed {
        Some(tree) => expected.matches(tree),
        None => matches!(expected, KeyTree::List { keys, .. } if keys.is_empty()),
    }
}

fn decode_optional(encoded: Option<&str>) -> Result<Option<KeyTree>> {
    encoded
        .map(KeyTree::decode)
        .transpose()
        .context("Failed to decode consensus key")
}

/// Check that `entity` carries `expected_encoded` on both sources.
///
/// Fails immediately if the consensus source disagrees, then polls until
/// the mirror has indexed the same key.
pub async fn verify_entity_key(
    ctx: &TestContext,
    verifier: &ConsistencyVerifier,
    consensus: &dyn ConsensusReader,
    mirror: &dyn MirrorReader,
    entity: &EntityId,
    expected_encoded: &str,
) -> Result<()> {
    let expected = KeyTree::decode(expected_encoded).context("Failed to decode expected key")?;

    let observed = consensus.entity_key(ctx, entity).await?;
    let observed = decode_optional(observed.as_deref())?;
    if !key_matches(&expected, observed.as_ref()) {
        anyhow::bail!(
            "Consensus key of {} is {:?}, expected {:?}",
            entity,
            observed,
            expected
        );
    }

    let probe = move || async move {
        let consensus_key = consensus.entity_key(ctx, entity).await?;
        let consensus_tree = decode_optional(consensus_key.as_deref())?;
        let mirror_tree = match mirror.entity_key(entity).await? {
            MirrorRecord::NotIndexed => MirrorRecord::NotIndexed,
            MirrorRecord::Unavailable(reason) => MirrorRecord::Unavailable(reason),
            MirrorRecord::Found(key) => MirrorRecord::Found(
                key.map(|key| key.tree())
                    .transpose()
                    .context("Failed to decode mirror key")?,
            ),
        };
        Ok::<_, anyhow::Error>((consensus_tree, mirror_tree))
    };
    let equals = |consensus: &Option<KeyTree>, mirror: &MirrorRecord<Option<KeyTree>>| {
        key_matches(&expected, consensus.as_ref())
            && matches!(mirror, MirrorRecord::Found(tree) if key_matches(&expected, tree.as_ref()))
    };

    verifier
        .retry_until(ctx, ConsistencyCheck::new(format!("{} key", entity), probe, equals))
        .await?;
    Ok(())
}

/// Check that token `token_id` carries exactly `expected` on both sources
pub async fn verify_custom_fees(
    ctx: &TestContext,
    verifier: &ConsistencyVerifier,
    consensus: &dyn ConsensusReader,
    mirror: &dyn MirrorReader,
    token_id: &str,
    expected: &[CustomFee],
) -> Result<()> {
    let observed = consensus.token_custom_fees(ctx, token_id).await?;
    if !consensus_fees_match(expected, &observed) {
        anyhow::bail!(
            "Consensus fees of token {} are {:?}, expected {:?}",
            token_id,
            observed,
            expected
        );
    }

    let probe = move || async move {
        let consensus_fees = consensus.token_custom_fees(ctx, token_id).await?;
        let mirror_fees = mirror.token_custom_fees(token_id).await?;
        Ok::<_, anyhow::Error>((consensus_fees, mirror_fees))
    };
    let equals = |consensus: &Vec<CustomFee>, mirror: &MirrorRecord<MirrorCustomFees>| {
        consensus_fees_match(expected, consensus)
            && matches!(mirror, MirrorRecord::Found(fees) if fee_schedules_agree(consensus, fees))
    };

    verifier
        .retry_until(
            ctx,
            ConsistencyCheck::new(format!("token {} custom fees", token_id), probe, equals),
        )
        .await?;
    Ok(())
}
