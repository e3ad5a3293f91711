//! Action codec: [`EditAction`] to and from its wire form.
//!
//! The wire form is a flat record with a discriminator:
//!
//! ```json
//! { "kind": "insert", "position": 2, "text": "X" }
//! { "kind": "delete", "position": 3, "length": 4 }
//! ```
//!
//! `NoAction` has no wire form; callers filter it out before encoding.

use articlesync_core::EditAction;
use serde::{Deserialize, Serialize};

/// Discriminator of a wire action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    /// An insertion
    Insert,
    /// A deletion
    Delete,
}

/// Serializable form of an edit action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireAction {
    /// Insert or delete
    pub kind: ActionKind,
    /// Character offset in the baseline
    pub position: u64,
    /// Inserted text (inserts only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Deleted character count (deletes only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<u64>,
}

/// Encode an action for transmission.
///
/// # Errors
///
/// Returns [`CodecError::NoAction`] for [`EditAction::NoAction`].
pub fn encode(action: &EditAction) -> Result<WireAction, CodecError> {
    match action {
        EditAction::NoAction => Err(CodecError::NoAction),
        EditAction::Insertion { position, text } => Ok(WireAction {
            kind: ActionKind::Insert,
            position: to_u64(*position),
            text: Some(text.clone()),
            length: None,
        }),
        EditAction::Deletion { position, length } => Ok(WireAction {
            kind: ActionKind::Delete,
            position: to_u64(*position),
            text: None,
            length: Some(to_u64(*length)),
        }),
    }
}

/// Decode a received wire action.
///
/// # Errors
///
/// Returns [`CodecError::Invalid`] if the fields do not match the kind: an
/// insert needs non-empty `text` and no `length`, a delete needs a positive
/// `length` and no `text`. Offsets that do not fit `usize` are rejected too.
pub fn decode(wire: WireAction) -> Result<EditAction, CodecError> {
    let position = usize::try_from(wire.position)
        .map_err(|_| CodecError::Invalid(format!("position {} too large", wire.position)))?;

    match (wire.kind, wire.text, wire.length) {
        (ActionKind::Insert, Some(text), None) if !text.is_empty() => {
            Ok(EditAction::Insertion { position, text })
        }
        (ActionKind::Insert, Some(_), None) => {
            Err(CodecError::Invalid("insert with empty text".to_string()))
        }
        (ActionKind::Delete, None, Some(length)) if length > 0 => {
            let length = usize::try_from(length)
                .map_err(|_| CodecError::Invalid(format!("length {length} too large")))?;
            Ok(EditAction::Deletion { position, length })
        }
        (ActionKind::Delete, None, Some(_)) => {
            Err(CodecError::Invalid("delete with zero length".to_string()))
        }
        (kind, text, length) => Err(CodecError::Invalid(format!(
            "{kind:?} with text={} length={}",
            text.is_some(),
            length.is_some()
        ))),
    }
}

fn to_u64(value: usize) -> u64 {
    u64::try_from(value).unwrap_or(u64::MAX)
}

/// Errors for the action codec.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    /// `NoAction` is never transmitted
    #[error("no-action has no wire form")]
    NoAction,
    /// The wire value does not describe a valid action
    #[error("invalid wire action: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn actions_roundtrip() {
        let actions = [
            EditAction::insertion(0, "hello"),
            EditAction::insertion(17, "naïve ✓"),
            EditAction::deletion(3, 1),
            EditAction::deletion(0, 4096),
        ];

        for action in actions {
            let wire = encode(&action).unwrap();
            assert_eq!(decode(wire).unwrap(), action);
        }
    }

    #[test]
    fn no_action_is_not_encoded() {
        assert_eq!(encode(&EditAction::NoAction), Err(CodecError::NoAction));
    }

    #[test]
    fn json_shape() {
        let wire = encode(&EditAction::insertion(2, "X")).unwrap();
        let json = serde_json::to_value(&wire).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "kind": "insert", "position": 2, "text": "X" })
        );

        let wire = encode(&EditAction::deletion(3, 4)).unwrap();
        let json = serde_json::to_value(&wire).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "kind": "delete", "position": 3, "length": 4 })
        );
    }

    #[test]
    fn malformed_actions_are_rejected() {
        let cases = [
            serde_json::json!({ "kind": "insert", "position": 0 }),
            serde_json::json!({ "kind": "insert", "position": 0, "text": "" }),
            serde_json::json!({ "kind": "delete", "position": 0, "length": 0 }),
            serde_json::json!({ "kind": "delete", "position": 0, "text": "x", "length": 1 }),
            serde_json::json!({ "kind": "insert", "position": 0, "text": "x", "length": 1 }),
        ];

        for json in cases {
            let wire: WireAction = serde_json::from_value(json.clone()).unwrap();
            assert!(
                matches!(decode(wire), Err(CodecError::Invalid(_))),
                "accepted {json}"
            );
        }
    }

    #[test]
    fn unknown_kind_fails_to_deserialize() {
        let json = serde_json::json!({ "kind": "replace", "position": 0, "text": "x" });
        assert!(serde_json::from_value::<WireAction>(json).is_err());
    }
}
