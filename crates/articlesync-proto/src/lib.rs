//! # Article Sync Protocol
//!
//! Wire protocol definitions and MQTT topic scheme for edit replication.
//!
//! ## Messages
//!
//! - `WireAction`: the serialized form of a single insert or delete
//! - `ActionEnvelope`: a stamped action routed by document ID
//!
//! ## MQTT Topics
//!
//! Topic scheme: `articlesync/v1/{tenant}/{doc_hash}/{message_type}`

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod codec;
pub mod messages;
pub mod topics;

pub use codec::{decode, encode, ActionKind, CodecError, WireAction};
pub use messages::{ActionEnvelope, MessageError};
pub use topics::TopicScheme;
