//! # Article Sync Core
//!
//! Edit classification, replay, and merge semantics for collaborative
//! article editing.
//!
//! This crate provides:
//! - Edit actions derived from two text snapshots (single contiguous diff)
//! - Exact replay of an action against a baseline, with range checking
//! - A position-ordered merge rule for a pending local edit and a remote edit
//! - Per-document reconciliation state (live text + shared baseline)
//! - Edit stamps for echo suppression and duplicate detection
//!
//! Everything here is pure and synchronous; transport and scheduling live in
//! the agent crate.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod action;
pub mod document;
pub mod merge;
pub mod stamp;

pub use action::{apply, classify, ActionError, EditAction};
pub use document::{DocId, MergeOutcome, ReconciliationState};
pub use merge::{merge, merge_order, MergeOrder, PendingPolicy};
pub use stamp::{EditStamp, Rejection, SequenceTracker, StampIssuer};
