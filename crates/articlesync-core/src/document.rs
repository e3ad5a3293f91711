//! Article identity and per-document reconciliation state.
//!
//! [`ReconciliationState`] holds the two texts an editing session diffs:
//! - `live_text`: what the local user currently sees and edits
//! - `baseline`: the last snapshot known to be shared with peers
//!
//! `classify(baseline, live_text)` is always the pending local edit.

use crate::action::{apply, classify, ActionError, EditAction};
use crate::merge::{merge, merge_order, MergeOrder, PendingPolicy};
use serde::{Deserialize, Serialize};

/// Unique identifier of an article being edited.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DocId(String);

impl DocId {
    /// Create a new document ID.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The raw article identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Generate a hash for MQTT topic sharding.
    ///
    /// FNV-1a, so every peer derives the same shard for the same article
    /// regardless of platform or build.
    #[must_use]
    pub fn topic_hash(&self) -> String {
        const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
        const PRIME: u64 = 0x0000_0100_0000_01b3;

        let hash = self
            .0
            .bytes()
            .fold(OFFSET, |acc, b| (acc ^ u64::from(b)).wrapping_mul(PRIME));
        format!("{hash:016x}")
    }
}

impl std::fmt::Display for DocId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for DocId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Result of merging a remote edit into the state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    /// The local edit that was pending when the remote edit arrived
    pub local: EditAction,
    /// Order in which the two edits were replayed
    pub order: MergeOrder,
    /// Whether `live_text` changed
    pub live_changed: bool,
}

/// Texts tracked for one open document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconciliationState {
    live_text: String,
    baseline: String,
}

impl ReconciliationState {
    /// Seed both texts with the fetched article content.
    #[must_use]
    pub fn new(seed: impl Into<String>) -> Self {
        let seed = seed.into();
        Self {
            live_text: seed.clone(),
            baseline: seed,
        }
    }

    /// The text shown to the local user.
    #[must_use]
    pub fn live_text(&self) -> &str {
        &self.live_text
    }

    /// The last snapshot shared with peers.
    #[must_use]
    pub fn baseline(&self) -> &str {
        &self.baseline
    }

    /// Replace the live text with what the user typed.
    pub fn set_live_text(&mut self, text: impl Into<String>) {
        self.live_text = text.into();
    }

    /// Whether there is an edit not yet broadcast.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.live_text != self.baseline
    }

    /// The pending local edit.
    #[must_use]
    pub fn pending(&self) -> EditAction {
        classify(&self.baseline, &self.live_text)
    }

    /// Advance the baseline to `snapshot` after it was broadcast.
    ///
    /// `snapshot` is the live text the broadcast action was classified
    /// against, not necessarily the current one.
    pub fn mark_flushed(&mut self, snapshot: impl Into<String>) {
        self.baseline = snapshot.into();
    }

    /// Merge an edit received from a peer.
    ///
    /// On error neither text is modified.
    ///
    /// # Errors
    ///
    /// Returns [`ActionError::OutOfRange`] if the remote or local edit does not
    /// fit the text it is replayed against.
    pub fn merge_remote(
        &mut self,
        remote: &EditAction,
        policy: PendingPolicy,
    ) -> Result<MergeOutcome, ActionError> {
        let local = self.pending();
        let order = merge_order(&local, remote);
        let merged = merge(&self.baseline, &local, remote)?;

        let baseline = match (policy, order) {
            (_, MergeOrder::RemoteOnly) | (PendingPolicy::Fold, _) => merged.clone(),
            (PendingPolicy::Rebroadcast, _) => apply(&self.baseline, remote)?,
        };

        let live_changed = merged != self.live_text;
        self.live_text = merged;
        self.baseline = baseline;

        Ok(MergeOutcome {
            local,
            order,
            live_changed,
        })
    }
}
