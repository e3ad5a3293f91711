//! Merge rule for concurrent edits against a shared baseline.
//!
//! Two pending edits derived from the same baseline are replayed in document
//! order of their start positions:
//!
//! | Case | Order |
//! |------|-------|
//! | no local edit | remote only |
//! | remote start >= local start | local, then remote |
//! | remote start < local start | remote, then local |
//!
//! Positions are not remapped between the two replays. This is a heuristic
//! rather than an operational transform: edits that are well separated merge
//! cleanly, overlapping or adjacent ones may not. Equal start positions are
//! broken in favor of the remote edit, which is applied second.

use crate::action::{apply, ActionError, EditAction};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// What happens to an un-broadcast local edit once a remote edit is merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PendingPolicy {
    /// Fold the local edit into the new baseline; it is never sent on its own.
    #[default]
    Fold,
    /// Advance the baseline by the remote edit only, so the local edit stays
    /// pending and goes out with the next tick.
    Rebroadcast,
}

impl FromStr for PendingPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fold" => Ok(Self::Fold),
            "rebroadcast" => Ok(Self::Rebroadcast),
            other => Err(format!("unknown pending policy '{other}'")),
        }
    }
}

/// Which edit was replayed first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOrder {
    /// Only the remote edit was applied
    RemoteOnly,
    /// Local edit first, remote second
    LocalFirst,
    /// Remote edit first, local second
    RemoteFirst,
}

/// Pick the replay order for two edits against the same baseline.
#[must_use]
pub fn merge_order(local: &EditAction, remote: &EditAction) -> MergeOrder {
    match (local.start_position(), remote.start_position()) {
        (None, _) => MergeOrder::RemoteOnly,
        (Some(local), Some(remote)) if remote < local => MergeOrder::RemoteFirst,
        _ => MergeOrder::LocalFirst,
    }
}

/// Combine a pending local edit with a remote edit against `baseline`.
///
/// # Errors
///
/// Returns [`ActionError::OutOfRange`] if either replay does not fit the text
/// it is applied to. The caller should treat the merge as aborted.
pub fn merge(
    baseline: &str,
    local: &EditAction,
    remote: &EditAction,
) -> Result<String, ActionError> {
    let order = merge_order(local, remote);
    let merged = match order {
        MergeOrder::RemoteOnly => apply(baseline, remote)?,
        MergeOrder::LocalFirst => apply(&apply(baseline, local)?, remote)?,
        MergeOrder::RemoteFirst => apply(&apply(baseline, remote)?, local)?,
    };

    tracing::debug!(?order, %local, %remote, "Merged concurrent edits");
    Ok(merged)
}
