//! Edit actions: classification and application.
//!
//! An [`EditAction`] describes how one snapshot of an article was turned into
//! another as a single contiguous insertion or deletion. Offsets and lengths
//! count Unicode scalar values (`char`s), not bytes.
//!
//! [`classify`] derives an action from two snapshots and [`apply`] replays it
//! against a baseline. For pure insertions and pure deletions the two are exact
//! inverses: `apply(b, &classify(b, t)) == Ok(t)`.
//!
//! Replacements (both changed regions non-empty) cannot be expressed exactly by
//! a single tagged action. They are classified by comparing region lengths: a
//! target region at least as long as the baseline region becomes an
//! [`EditAction::Insertion`], a shorter one becomes an [`EditAction::Deletion`].

use serde::{Deserialize, Serialize};

/// A structured description of a single edit against a baseline snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EditAction {
    /// Baseline and target are identical.
    NoAction,
    /// `text` was inserted at `position` in the baseline.
    Insertion {
        /// Character offset of the insertion point
        position: usize,
        /// Inserted text, never empty
        text: String,
    },
    /// `length` characters were removed starting at `position`.
    Deletion {
        /// Character offset of the first removed character
        position: usize,
        /// Number of removed characters, never zero
        length: usize,
    },
}

impl EditAction {
    /// Create an insertion, collapsing empty text to [`EditAction::NoAction`].
    #[must_use]
    pub fn insertion(position: usize, text: impl Into<String>) -> Self {
        let text = text.into();
        if text.is_empty() {
            Self::NoAction
        } else {
            Self::Insertion { position, text }
        }
    }

    /// Create a deletion, collapsing a zero length to [`EditAction::NoAction`].
    #[must_use]
    pub fn deletion(position: usize, length: usize) -> Self {
        if length == 0 {
            Self::NoAction
        } else {
            Self::Deletion { position, length }
        }
    }

    /// Offset at which the action starts, or `None` for [`EditAction::NoAction`].
    #[must_use]
    pub fn start_position(&self) -> Option<usize> {
        match self {
            Self::NoAction => None,
            Self::Insertion { position, .. } | Self::Deletion { position, .. } => Some(*position),
        }
    }

    /// Whether this is [`EditAction::NoAction`].
    #[must_use]
    pub fn is_no_action(&self) -> bool {
        matches!(self, Self::NoAction)
    }
}

impl std::fmt::Display for EditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoAction => write!(f, "no-action"),
            Self::Insertion { position, text } => {
                write!(f, "insert@{position}({} chars)", text.chars().count())
            }
            Self::Deletion { position, length } => write!(f, "delete@{position}({length} chars)"),
        }
    }
}

/// Derive the single contiguous edit that turns `baseline` into `target`.
///
/// Scattered edits made within one comparison window collapse into one
/// action spanning from the first to the last differing character.
#[must_use]
pub fn classify(baseline: &str, target: &str) -> EditAction {
    if baseline == target {
        return EditAction::NoAction;
    }

    let old: Vec<char> = baseline.chars().collect();
    let new: Vec<char> = target.chars().collect();

    let prefix = old
        .iter()
        .zip(new.iter())
        .take_while(|(a, b)| a == b)
        .count();

    // The suffix scan stops at the prefix so the two never overlap.
    let max_suffix = old.len().min(new.len()) - prefix;
    let suffix = old
        .iter()
        .rev()
        .zip(new.iter().rev())
        .take(max_suffix)
        .take_while(|(a, b)| a == b)
        .count();

    let old_region = old.len() - prefix - suffix;
    let new_region = &new[prefix..new.len() - suffix];

    let action = if new_region.len() >= old_region {
        EditAction::insertion(prefix, new_region.iter().collect::<String>())
    } else {
        EditAction::deletion(prefix, old_region)
    };

    tracing::trace!(
        baseline_len = old.len(),
        target_len = new.len(),
        %action,
        "Classified edit"
    );
    action
}

/// Replay `action` against `baseline`.
///
/// # Errors
///
/// Returns [`ActionError::OutOfRange`] if the insertion point lies past the end
/// of `baseline`, or if a deleted span does not fit inside it. Nothing is
/// clamped.
pub fn apply(baseline: &str, action: &EditAction) -> Result<String, ActionError> {
    match action {
        EditAction::NoAction => Ok(baseline.to_string()),
        EditAction::Insertion { position, text } => {
            let at = byte_offset(baseline, *position).ok_or(ActionError::OutOfRange {
                position: *position,
                length: 0,
                len: baseline.chars().count(),
            })?;

            let mut result = String::with_capacity(baseline.len() + text.len());
            result.push_str(&baseline[..at]);
            result.push_str(text);
            result.push_str(&baseline[at..]);
            Ok(result)
        }
        EditAction::Deletion { position, length } => {
            let out_of_range = || ActionError::OutOfRange {
                position: *position,
                length: *length,
                len: baseline.chars().count(),
            };
            let end = position.checked_add(*length).ok_or_else(out_of_range)?;
            let start_byte = byte_offset(baseline, *position).ok_or_else(out_of_range)?;
            let end_byte = byte_offset(baseline, end).ok_or_else(out_of_range)?;

            let mut result = String::with_capacity(baseline.len() - (end_byte - start_byte));
            result.push_str(&baseline[..start_byte]);
            result.push_str(&baseline[end_byte..]);
            Ok(result)
        }
    }
}

/// Byte offset of the `chars`-th character, allowing the one-past-the-end offset.
fn byte_offset(text: &str, chars: usize) -> Option<usize> {
    text.char_indices()
        .map(|(idx, _)| idx)
        .chain(std::iter::once(text.len()))
        .nth(chars)
}

/// Errors raised when replaying an action.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ActionError {
    /// The action does not fit the baseline it was applied to
    #[error("action out of range: position {position}, length {length}, baseline has {len} chars")]
    OutOfRange {
        /// Start offset of the action
        position: usize,
        /// Span length (zero for insertions)
        length: usize,
        /// Length of the baseline in chars
        len: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_snapshots_are_no_action() {
        assert_eq!(classify("", ""), EditAction::NoAction);
        assert_eq!(classify("abc", "abc"), EditAction::NoAction);
        assert_eq!(apply("abc", &EditAction::NoAction).unwrap(), "abc");
    }

    #[test]
    fn classify_insertion() {
        assert_eq!(
            classify("abcdef", "abXcdef"),
            EditAction::Insertion {
                position: 2,
                text: "X".to_string()
            }
        );
        assert_eq!(
            classify("", "hello"),
            EditAction::Insertion {
                position: 0,
                text: "hello".to_string()
            }
        );
        assert_eq!(
            classify("abc", "abcdef"),
            EditAction::Insertion {
                position: 3,
                text: "def".to_string()
            }
        );
    }

    #[test]
    fn classify_deletion() {
        assert_eq!(
            classify("abcdef", "abef"),
            EditAction::Deletion {
                position: 2,
                length: 2
            }
        );
        assert_eq!(
            classify("hello", ""),
            EditAction::Deletion {
                position: 0,
                length: 5
            }
        );
    }

    #[test]
    fn classify_repeated_characters_does_not_overlap() {
        // "aa" -> "aaa": prefix covers both chars, suffix must not reuse them.
        assert_eq!(
            classify("aa", "aaa"),
            EditAction::Insertion {
                position: 2,
                text: "a".to_string()
            }
        );
        assert_eq!(
            classify("aaa", "a"),
            EditAction::Deletion {
                position: 1,
                length: 2
            }
        );
    }

    #[test]
    fn classify_replacement_emits_insertion() {
        assert_eq!(
            classify("abcdef", "abXYef"),
            EditAction::Insertion {
                position: 2,
                text: "XY".to_string()
            }
        );
    }

    #[test]
    fn classify_shrinking_replacement_emits_deletion() {
        assert_eq!(
            classify("abcdef", "abXf"),
            EditAction::Deletion {
                position: 2,
                length: 3
            }
        );
    }

    #[test]
    fn classifier_and_applier_are_inverse() {
        let cases = [
            ("", "x"),
            ("x", ""),
            ("abcdef", "abXcdef"),
            ("abcdef", "abf"),
            ("hello world", "hello brave new world"),
            ("the quick brown fox", "the fox"),
            ("aaaa", "aaaaaa"),
            ("tail", "tail!"),
            ("!head", "head"),
        ];

        for (baseline, target) in cases {
            let action = classify(baseline, target);
            assert_eq!(
                apply(baseline, &action).unwrap(),
                target,
                "{baseline:?} -> {target:?} via {action:?}"
            );
        }
    }

    #[test]
    fn positions_count_chars_not_bytes() {
        let action = classify("héllo", "héXllo");
        assert_eq!(
            action,
            EditAction::Insertion {
                position: 2,
                text: "X".to_string()
            }
        );
        assert_eq!(apply("héllo", &action).unwrap(), "héXllo");

        let action = classify("naïve café", "naïve");
        assert_eq!(apply("naïve café", &action).unwrap(), "naïve");
    }

    #[test]
    fn apply_insertion_at_end() {
        let action = EditAction::insertion(3, "!");
        assert_eq!(apply("abc", &action).unwrap(), "abc!");
    }

    #[test]
    fn apply_insertion_out_of_range() {
        let action = EditAction::insertion(4, "!");
        assert_eq!(
            apply("abc", &action),
            Err(ActionError::OutOfRange {
                position: 4,
                length: 0,
                len: 3
            })
        );
    }

    #[test]
    fn apply_deletion_out_of_range() {
        let action = EditAction::deletion(3, 10);
        assert_eq!(
            apply("abcdef", &action),
            Err(ActionError::OutOfRange {
                position: 3,
                length: 10,
                len: 6
            })
        );
    }

    #[test]
    fn apply_deletion_overflow_is_out_of_range() {
        let action = EditAction::deletion(usize::MAX, 2);
        assert!(apply("abc", &action).is_err());
    }

    #[test]
    fn constructors_collapse_empty_edits() {
        assert_eq!(EditAction::insertion(3, ""), EditAction::NoAction);
        assert_eq!(EditAction::deletion(3, 0), EditAction::NoAction);
        assert_eq!(EditAction::NoAction.start_position(), None);
        assert_eq!(EditAction::deletion(4, 1).start_position(), Some(4));
    }
}
