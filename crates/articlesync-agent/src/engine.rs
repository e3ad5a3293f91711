//! Reconciliation engine for one open document.
//!
//! The engine reacts to two events:
//! - **tick**: classify the pending local edit and broadcast it
//! - **remote receive**: decode a peer's action and merge it with the pending
//!   local edit
//!
//! Both take `&mut self`, so a single owner processes them strictly one at a
//! time. The baseline only advances after the transport accepted the action;
//! a failed send leaves the edit pending for the next tick.

use crate::transport::{Transport, TransportError};
use articlesync_core::{
    ActionError, DocId, EditAction, EditStamp, MergeOutcome, PendingPolicy, ReconciliationState,
    Rejection, SequenceTracker, StampIssuer,
};
use articlesync_proto::{ActionEnvelope, MessageError};
use uuid::Uuid;

/// Result of a tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// Nothing to send
    Idle,
    /// An action was handed to the transport
    Sent {
        /// Stamp of the broadcast
        stamp: EditStamp,
        /// The broadcast action
        action: EditAction,
    },
}

/// Why an inbound message was skipped without touching the state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// The message belongs to another document
    WrongDocument,
    /// Our own broadcast came back
    OwnEcho,
    /// Already seen from that peer
    Duplicate,
}

/// Result of receiving a remote message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReceiveOutcome {
    /// The remote action was merged
    Merged(MergeOutcome),
    /// The message was skipped
    Ignored(IgnoreReason),
}

/// Errors from a single engine event. None of them are fatal.
#[derive(Debug, Clone, thiserror::Error)]
pub enum EngineError {
    /// The inbound envelope could not be decoded
    #[error("decode error: {0}")]
    Decode(String),
    /// A local action could not be encoded
    #[error("encode error: {0}")]
    Encode(String),
    /// The merge did not fit the current texts
    #[error(transparent)]
    OutOfRange(#[from] ActionError),
    /// The transport rejected the send
    #[error(transparent)]
    TransportUnavailable(#[from] TransportError),
}

impl From<MessageError> for EngineError {
    fn from(err: MessageError) -> Self {
        match err {
            MessageError::Serialize(msg) => Self::Encode(msg),
            MessageError::Deserialize(msg) => Self::Decode(msg),
        }
    }
}

/// Reconciliation engine for one document.
pub struct Engine<T> {
    doc_id: DocId,
    state: ReconciliationState,
    issuer: StampIssuer,
    tracker: SequenceTracker,
    policy: PendingPolicy,
    transport: T,
}

impl<T: Transport> Engine<T> {
    /// Create an engine seeded with the fetched article body.
    ///
    /// `actor_id` must be unique per editing session.
    #[must_use]
    pub fn new(
        doc_id: DocId,
        seed: impl Into<String>,
        actor_id: Uuid,
        policy: PendingPolicy,
        transport: T,
    ) -> Self {
        Self {
            doc_id,
            state: ReconciliationState::new(seed),
            issuer: StampIssuer::new(actor_id),
            tracker: SequenceTracker::new(actor_id),
            policy,
            transport,
        }
    }

    /// The document this engine reconciles.
    #[must_use]
    pub fn doc_id(&self) -> &DocId {
        &self.doc_id
    }

    /// Current texts.
    #[must_use]
    pub fn state(&self) -> &ReconciliationState {
        &self.state
    }

    /// Record what the local user typed.
    pub fn set_live_text(&mut self, text: impl Into<String>) {
        self.state.set_live_text(text);
    }

    /// Broadcast the pending local edit, if any.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::TransportUnavailable`] if the send failed; the
    /// edit stays pending.
    pub async fn tick(&mut self) -> Result<TickOutcome, EngineError> {
        if !self.state.is_dirty() {
            return Ok(TickOutcome::Idle);
        }

        let snapshot = self.state.live_text().to_string();
        let action = self.state.pending();
        if action.is_no_action() {
            self.state.mark_flushed(snapshot);
            return Ok(TickOutcome::Idle);
        }

        let stamp = self.issuer.peek();
        let payload = ActionEnvelope::new(&self.doc_id, stamp, &action)
            .map_err(|e| EngineError::Encode(e.to_string()))?
            .to_cbor()?;

        if let Err(err) = self.transport.send(&self.doc_id, payload).await {
            tracing::warn!(
                doc_id = %self.doc_id,
                error = %err,
                %action,
                "Send failed, keeping edit pending"
            );
            return Err(err.into());
        }

        self.issuer.commit();
        self.state.mark_flushed(snapshot);
        tracing::debug!(doc_id = %self.doc_id, %stamp, %action, "Broadcast local edit");

        Ok(TickOutcome::Sent { stamp, action })
    }

    /// Merge an encoded action received from a peer.
    ///
    /// On error the state is unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Decode`] for malformed payloads and
    /// [`EngineError::OutOfRange`] if the merge does not fit.
    pub fn remote_receive(&mut self, payload: &[u8]) -> Result<ReceiveOutcome, EngineError> {
        let envelope = ActionEnvelope::from_cbor(payload)?;

        if envelope.doc_id() != self.doc_id {
            tracing::debug!(
                doc_id = %self.doc_id,
                other = %envelope.doc_id,
                "Ignoring action for another document"
            );
            return Ok(ReceiveOutcome::Ignored(IgnoreReason::WrongDocument));
        }

        let stamp = envelope.stamp()?;
        let remote = envelope
            .action()
            .map_err(|e| EngineError::Decode(e.to_string()))?;

        match self.tracker.check(stamp) {
            Ok(()) => {}
            Err(Rejection::OwnEcho) => {
                return Ok(ReceiveOutcome::Ignored(IgnoreReason::OwnEcho));
            }
            Err(Rejection::Duplicate { last_seen }) => {
                tracing::debug!(
                    doc_id = %self.doc_id,
                    %stamp,
                    last_seen,
                    "Ignoring duplicate action"
                );
                return Ok(ReceiveOutcome::Ignored(IgnoreReason::Duplicate));
            }
        }

        let outcome = self.state.merge_remote(&remote, self.policy)?;
        self.tracker.record(stamp);
        tracing::debug!(
            doc_id = %self.doc_id,
            %stamp,
            %remote,
            local = %outcome.local,
            order = ?outcome.order,
            "Merged remote action"
        );

        Ok(ReceiveOutcome::Merged(outcome))
    }

    /// Tear down the engine, returning its final state.
    #[must_use]
    pub fn into_state(self) -> ReconciliationState {
        self.state
    }
}
