//! Protocol messages for action replication.

use crate::codec::{self, CodecError, WireAction};
use articlesync_core::{DocId, EditAction, EditStamp};
use serde::{Deserialize, Serialize};

/// One broadcast edit, routed by document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionEnvelope {
    /// Article identifier
    pub doc_id: String,
    /// Edit stamp bytes (actor ID + sequence number)
    pub stamp: Vec<u8>,
    /// The edit itself
    pub action: WireAction,
}

impl ActionEnvelope {
    /// Wrap an action for broadcast.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::NoAction`] if `action` is `NoAction`.
    pub fn new(doc_id: &DocId, stamp: EditStamp, action: &EditAction) -> Result<Self, CodecError> {
        Ok(Self {
            doc_id: doc_id.to_string(),
            stamp: stamp.to_bytes(),
            action: codec::encode(action)?,
        })
    }

    /// The routing document ID.
    #[must_use]
    pub fn doc_id(&self) -> DocId {
        DocId::new(self.doc_id.as_str())
    }

    /// Get the stamp from its bytes.
    ///
    /// # Errors
    ///
    /// Returns error if deserialization fails.
    pub fn stamp(&self) -> Result<EditStamp, MessageError> {
        EditStamp::from_bytes(&self.stamp).map_err(|e| MessageError::Deserialize(e.to_string()))
    }

    /// Decode the carried action.
    ///
    /// # Errors
    ///
    /// Returns error if the wire action is malformed.
    pub fn action(&self) -> Result<EditAction, CodecError> {
        codec::decode(self.action.clone())
    }

    /// Serialize to CBOR bytes.
    ///
    /// # Errors
    ///
    /// Returns error if serialization fails.
    pub fn to_cbor(&self) -> Result<Vec<u8>, MessageError> {
        let mut bytes = Vec::new();
        ciborium::into_writer(self, &mut bytes)
            .map_err(|e| MessageError::Serialize(e.to_string()))?;
        Ok(bytes)
    }

    /// Deserialize from CBOR bytes.
    ///
    /// # Errors
    ///
    /// Returns error if deserialization fails.
    pub fn from_cbor(bytes: &[u8]) -> Result<Self, MessageError> {
        ciborium::from_reader(bytes).map_err(|e| MessageError::Deserialize(e.to_string()))
    }

    /// Serialize to pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns error if serialization fails.
    pub fn to_json(&self) -> Result<String, MessageError> {
        serde_json::to_string_pretty(self).map_err(|e| MessageError::Serialize(e.to_string()))
    }

    /// Deserialize from JSON.
    ///
    /// # Errors
    ///
    /// Returns error if deserialization fails.
    pub fn from_json(json: &str) -> Result<Self, MessageError> {
        serde_json::from_str(json).map_err(|e| MessageError::Deserialize(e.to_string()))
    }
}

/// Errors for message serialization/deserialization.
#[derive(Debug, Clone, thiserror::Error)]
pub enum MessageError {
    /// Serialization failed
    #[error("serialization failed: {0}")]
    Serialize(String),
    /// Deserialization failed
    #[error("deserialization failed: {0}")]
    Deserialize(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn stamp() -> EditStamp {
        EditStamp {
            actor_id: Uuid::new_v4(),
            seq: 7,
        }
    }

    #[test]
    fn envelope_cbor_roundtrip() {
        let doc = DocId::new("article-1");
        let stamp = stamp();
        let action = EditAction::insertion(4, "text");

        let envelope = ActionEnvelope::new(&doc, stamp, &action).unwrap();
        let bytes = envelope.to_cbor().unwrap();
        let decoded = ActionEnvelope::from_cbor(&bytes).unwrap();

        assert_eq!(decoded.doc_id(), doc);
        assert_eq!(decoded.stamp().unwrap(), stamp);
        assert_eq!(decoded.action().unwrap(), action);
    }

    #[test]
    fn envelope_json_roundtrip() {
        let envelope =
            ActionEnvelope::new(&DocId::new("a"), stamp(), &EditAction::deletion(1, 2)).unwrap();

        let json = envelope.to_json().unwrap();
        assert_eq!(ActionEnvelope::from_json(&json).unwrap(), envelope);
    }

    #[test]
    fn no_action_envelope_is_refused() {
        let result = ActionEnvelope::new(&DocId::new("a"), stamp(), &EditAction::NoAction);
        assert_eq!(result, Err(CodecError::NoAction));
    }

    #[test]
    fn garbage_bytes_fail_to_decode() {
        assert!(ActionEnvelope::from_cbor(&[0xff, 0x00, 0x13]).is_err());
    }
}
