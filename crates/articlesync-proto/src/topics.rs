//! MQTT topic scheme for action replication.
//!
//! Topic structure: `articlesync/v1/{tenant}/{doc_hash}/{message_type}`

use serde::{Deserialize, Serialize};

/// Protocol version for topic scheme.
pub const PROTOCOL_VERSION: &str = "v1";

const DEFAULT_PREFIX: &str = "articlesync";

/// Topic scheme configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicScheme {
    /// Tenant identifier
    pub tenant: String,
    /// Topic prefix (default: "articlesync")
    pub prefix: String,
}

impl Default for TopicScheme {
    fn default() -> Self {
        Self::new("default")
    }
}

impl TopicScheme {
    /// Create a new topic scheme with the given tenant.
    #[must_use]
    pub fn new(tenant: impl Into<String>) -> Self {
        Self {
            tenant: tenant.into(),
            prefix: DEFAULT_PREFIX.to_string(),
        }
    }

    fn tenant_base(&self) -> String {
        format!("{}/{}/{}", self.prefix, PROTOCOL_VERSION, self.tenant)
    }

    /// Topic for edit actions on a document.
    #[must_use]
    pub fn action(&self, doc_hash: &str) -> String {
        format!("{}/{doc_hash}/action", self.tenant_base())
    }

    /// Wildcard subscription for all messages of a document.
    #[must_use]
    pub fn doc_wildcard(&self, doc_hash: &str) -> String {
        format!("{}/{doc_hash}/#", self.tenant_base())
    }

    /// Wildcard subscription for all messages in the tenant.
    #[must_use]
    pub fn tenant_wildcard(&self) -> String {
        format!("{}/#", self.tenant_base())
    }

    /// Parse a topic to extract components.
    ///
    /// Returns `(doc_hash, message_type)` if valid.
    #[must_use]
    pub fn parse(&self, topic: &str) -> Option<(String, MessageType)> {
        let remainder = topic
            .strip_prefix(&self.tenant_base())?
            .strip_prefix('/')?;
        let (doc_hash, kind) = remainder.split_once('/')?;

        if doc_hash.is_empty() {
            return None;
        }

        let msg_type = match kind {
            "action" => MessageType::Action,
            _ => return None,
        };

        Some((doc_hash.to_string(), msg_type))
    }
}

/// Message types in the protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    /// Edit action broadcast
    Action,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topic_generation() {
        let scheme = TopicScheme::new("newsroom");

        assert_eq!(
            scheme.action("abc123def456"),
            "articlesync/v1/newsroom/abc123def456/action"
        );
    }

    #[test]
    fn topic_parsing() {
        let scheme = TopicScheme::new("newsroom");

        let (doc_hash, msg_type) = scheme
            .parse("articlesync/v1/newsroom/abc123/action")
            .unwrap();

        assert_eq!(doc_hash, "abc123");
        assert_eq!(msg_type, MessageType::Action);
    }

    #[test]
    fn foreign_topics_are_ignored() {
        let scheme = TopicScheme::new("newsroom");

        assert!(scheme.parse("articlesync/v1/other/abc123/action").is_none());
        assert!(scheme.parse("articlesync/v1/newsroom/abc123/cursor").is_none());
        assert!(scheme.parse("articlesync/v1/newsroom//action").is_none());
        assert!(scheme.parse("articlesync/v1/newsroomX/abc/action").is_none());
    }

    #[test]
    fn wildcard_topics() {
        let scheme = TopicScheme::new("tenant1");

        assert_eq!(
            scheme.doc_wildcard("doc1"),
            "articlesync/v1/tenant1/doc1/#"
        );
        assert_eq!(scheme.tenant_wildcard(), "articlesync/v1/tenant1/#");
    }
}
