//! Edit stamps for outbound actions.
//!
//! Every action an editor broadcasts carries an [`EditStamp`]: the editor's
//! actor ID plus a per-session sequence number. Receivers use a
//! [`SequenceTracker`] to drop their own echoes and any duplicate or stale
//! redelivery from the transport.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

const STAMP_LEN: usize = 24;

/// Identity of one broadcast edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EditStamp {
    /// Editor that produced the edit
    pub actor_id: Uuid,
    /// Position in that editor's outbound sequence, starting at 1
    pub seq: u64,
}

impl EditStamp {
    /// Serialize to bytes for wire transmission.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(STAMP_LEN);
        bytes.extend_from_slice(self.actor_id.as_bytes());
        bytes.extend_from_slice(&self.seq.to_be_bytes());
        bytes
    }

    /// Deserialize from bytes.
    ///
    /// # Errors
    ///
    /// Returns error if fewer than 24 bytes are given.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, StampError> {
        let insufficient = || StampError::InsufficientBytes {
            expected: STAMP_LEN,
            actual: bytes.len(),
        };

        let actor: [u8; 16] = bytes
            .get(0..16)
            .and_then(|b| b.try_into().ok())
            .ok_or_else(insufficient)?;
        let seq: [u8; 8] = bytes
            .get(16..STAMP_LEN)
            .and_then(|b| b.try_into().ok())
            .ok_or_else(insufficient)?;

        Ok(Self {
            actor_id: Uuid::from_bytes(actor),
            seq: u64::from_be_bytes(seq),
        })
    }
}

impl std::fmt::Display for EditStamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.actor_id, self.seq)
    }
}

/// Issues stamps for one editor's outbound actions.
#[derive(Debug, Clone)]
pub struct StampIssuer {
    actor_id: Uuid,
    next_seq: u64,
}

impl StampIssuer {
    /// Create an issuer for the given editor.
    #[must_use]
    pub fn new(actor_id: Uuid) -> Self {
        Self {
            actor_id,
            next_seq: 1,
        }
    }

    /// Stamp the next action without consuming the sequence number.
    ///
    /// The number is only consumed by [`StampIssuer::commit`], so a failed
    /// send reuses it on retry.
    #[must_use]
    pub fn peek(&self) -> EditStamp {
        EditStamp {
            actor_id: self.actor_id,
            seq: self.next_seq,
        }
    }

    /// Mark the peeked stamp as sent.
    pub fn commit(&mut self) {
        self.next_seq = self.next_seq.saturating_add(1);
    }
}

/// Why an inbound stamp was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// The message is our own broadcast coming back
    OwnEcho,
    /// The sequence number was already seen for that editor
    Duplicate {
        /// Highest sequence number seen so far
        last_seen: u64,
    },
}

/// Tracks the highest sequence number seen per remote editor.
#[derive(Debug, Clone)]
pub struct SequenceTracker {
    local_actor: Uuid,
    last_seen: HashMap<Uuid, u64>,
}

impl SequenceTracker {
    /// Create a tracker that treats `local_actor` as ourselves.
    #[must_use]
    pub fn new(local_actor: Uuid) -> Self {
        Self {
            local_actor,
            last_seen: HashMap::new(),
        }
    }

    /// Check whether an inbound stamp should be applied.
    ///
    /// Nothing is recorded; call [`SequenceTracker::record`] once the action
    /// was applied.
    ///
    /// # Errors
    ///
    /// Returns the [`Rejection`] reason if the stamp should be dropped.
    pub fn check(&self, stamp: EditStamp) -> Result<(), Rejection> {
        if stamp.actor_id == self.local_actor {
            return Err(Rejection::OwnEcho);
        }

        let last = self.last_seen.get(&stamp.actor_id).copied().unwrap_or(0);
        if stamp.seq <= last {
            return Err(Rejection::Duplicate { last_seen: last });
        }
        Ok(())
    }

    /// Record an applied stamp.
    pub fn record(&mut self, stamp: EditStamp) {
        let last = self.last_seen.entry(stamp.actor_id).or_insert(0);
        *last = (*last).max(stamp.seq);
    }
}

/// Errors that can occur with stamp decoding.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StampError {
    /// Insufficient bytes for deserialization
    #[error("insufficient bytes: expected {expected}, got {actual}")]
    InsufficientBytes {
        /// Expected byte count
        expected: usize,
        /// Actual byte count
        actual: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stamp_bytes_roundtrip() {
        let stamp = EditStamp {
            actor_id: Uuid::new_v4(),
            seq: 42,
        };

        let decoded = EditStamp::from_bytes(&stamp.to_bytes()).unwrap();
        assert_eq!(stamp, decoded);
    }

    #[test]
    fn short_stamp_is_rejected() {
        let err = EditStamp::from_bytes(&[0u8; 10]).unwrap_err();
        assert!(matches!(
            err,
            StampError::InsufficientBytes {
                expected: 24,
                actual: 10
            }
        ));
    }

    #[test]
    fn issuer_only_advances_on_commit() {
        let mut issuer = StampIssuer::new(Uuid::new_v4());

        assert_eq!(issuer.peek().seq, 1);
        assert_eq!(issuer.peek().seq, 1);
        issuer.commit();
        assert_eq!(issuer.peek().seq, 2);
    }

    #[test]
    fn tracker_drops_echo_and_duplicates() {
        let local = Uuid::new_v4();
        let peer = Uuid::new_v4();
        let mut tracker = SequenceTracker::new(local);

        assert_eq!(
            tracker.check(EditStamp {
                actor_id: local,
                seq: 1
            }),
            Err(Rejection::OwnEcho)
        );

        for seq in [1, 3] {
            let stamp = EditStamp { actor_id: peer, seq };
            assert!(tracker.check(stamp).is_ok());
            tracker.record(stamp);
        }
        assert_eq!(
            tracker.check(EditStamp { actor_id: peer, seq: 2 }),
            Err(Rejection::Duplicate { last_seen: 3 })
        );
    }

    #[test]
    fn unrecorded_stamp_is_not_a_duplicate() {
        let peer = Uuid::new_v4();
        let tracker = SequenceTracker::new(Uuid::new_v4());
        let stamp = EditStamp { actor_id: peer, seq: 1 };

        assert!(tracker.check(stamp).is_ok());
        assert!(tracker.check(stamp).is_ok());
    }
}
