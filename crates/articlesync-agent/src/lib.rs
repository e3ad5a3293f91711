//! # Article Sync Agent
//!
//! Collaborative editing agent for articles.
//!
//! ## Architecture
//!
//! Each opened article gets its own session task:
//! 1. **Seed**: the article body is fetched once from the article API
//! 2. **Tick**: local edits are classified against the baseline and broadcast
//! 3. **Receive**: remote actions are merged with the pending local edit
//! 4. **Close**: the converged body is optionally saved back to the API
//!
//! The runtime owns the MQTT connection and routes inbound actions to the
//! session of their document.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod engine;
pub mod replication;
pub mod runtime;
pub mod session;
pub mod transport;

pub use config::AgentConfig;
pub use engine::{Engine, EngineError, IgnoreReason, ReceiveOutcome, TickOutcome};
pub use replication::{ReplicationError, ReplicationManager};
pub use runtime::Agent;
pub use session::{SessionConfig, SessionEvent, SessionHandle, WorkingCopy};
pub use transport::{ChannelTransport, Outbound, Transport, TransportError};
