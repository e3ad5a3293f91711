//! MQTT replication layer for edit actions.

use crate::transport::{Transport, TransportError};
use articlesync_core::DocId;
use articlesync_proto::TopicScheme;
use rumqttc::{AsyncClient, EventLoop, MqttOptions, QoS};
use std::time::Duration;
use url::Url;

/// Replication manager for action dissemination.
///
/// Cheap to clone; every clone publishes through the same connection.
#[derive(Clone)]
pub struct ReplicationManager {
    client: AsyncClient,
    topic_scheme: TopicScheme,
}

impl ReplicationManager {
    /// Create a new replication manager.
    ///
    /// The returned [`EventLoop`] must be polled for any traffic to flow.
    ///
    /// # Errors
    ///
    /// Returns error if the broker URL is invalid.
    pub fn new(
        mqtt_broker: &str,
        client_id: &str,
        topic_scheme: TopicScheme,
    ) -> Result<(Self, EventLoop), ReplicationError> {
        let (host, port) = parse_mqtt_url(mqtt_broker)?;

        let mut mqtt_options = MqttOptions::new(client_id, host, port);
        mqtt_options.set_keep_alive(Duration::from_secs(30));

        let (client, eventloop) = AsyncClient::new(mqtt_options, 100);

        Ok((
            Self {
                client,
                topic_scheme,
            },
            eventloop,
        ))
    }

    /// The topic scheme in use.
    #[must_use]
    pub fn topic_scheme(&self) -> &TopicScheme {
        &self.topic_scheme
    }

    /// Subscribe to all topics of a document.
    ///
    /// # Errors
    ///
    /// Returns error if subscription fails.
    pub async fn subscribe(&self, doc_id: &DocId) -> Result<(), ReplicationError> {
        let topic = self.topic_scheme.doc_wildcard(&doc_id.topic_hash());

        tracing::info!(topic, %doc_id, "Subscribing to replication topic");

        self.client
            .subscribe(&topic, QoS::AtLeastOnce)
            .await
            .map_err(|e| ReplicationError::Subscribe(e.to_string()))
    }

    /// Drop the subscription of a document.
    ///
    /// # Errors
    ///
    /// Returns error if the request cannot be queued.
    pub async fn unsubscribe(&self, doc_id: &DocId) -> Result<(), ReplicationError> {
        let topic = self.topic_scheme.doc_wildcard(&doc_id.topic_hash());

        tracing::debug!(topic, %doc_id, "Unsubscribing from replication topic");

        self.client
            .unsubscribe(&topic)
            .await
            .map_err(|e| ReplicationError::Subscribe(e.to_string()))
    }

    /// Publish an encoded action envelope.
    ///
    /// # Errors
    ///
    /// Returns error if the outgoing request queue is closed or full. The
    /// request is never awaited, so a stalled connection surfaces as an error
    /// instead of blocking the caller's tick.
    pub fn publish_action(&self, doc_id: &DocId, payload: Vec<u8>) -> Result<(), ReplicationError> {
        let topic = self.topic_scheme.action(&doc_id.topic_hash());

        tracing::debug!(topic, payload_len = payload.len(), "Publishing action");

        self.client
            .try_publish(&topic, QoS::AtLeastOnce, false, payload)
            .map_err(|e| ReplicationError::Publish(e.to_string()))
    }

    /// Disconnect from the broker.
    ///
    /// # Errors
    ///
    /// Returns error if the request cannot be queued.
    pub async fn disconnect(&self) -> Result<(), ReplicationError> {
        self.client
            .disconnect()
            .await
            .map_err(|e| ReplicationError::Publish(e.to_string()))
    }
}

impl Transport for ReplicationManager {
    async fn send(&self, doc_id: &DocId, payload: Vec<u8>) -> Result<(), TransportError> {
        self.publish_action(doc_id, payload)
            .map_err(|e| TransportError::Unavailable(e.to_string()))
    }
}

/// Parse MQTT URL into host and port.
pub(crate) fn parse_mqtt_url(input: &str) -> Result<(String, u16), ReplicationError> {
    if input.contains("://") {
        let url = Url::parse(input)
            .map_err(|e| ReplicationError::InvalidBrokerUrl(format!("{input}: {e}")))?;

        match url.scheme() {
            "tcp" | "mqtt" => {}
            scheme => {
                return Err(ReplicationError::InvalidBrokerUrl(format!(
                    "{input}: unsupported scheme '{scheme}'"
                )));
            }
        }

        let host = url
            .host_str()
            .ok_or_else(|| ReplicationError::InvalidBrokerUrl(format!("{input}: missing host")))?;
        let port = url.port().unwrap_or(1883);

        return Ok((host.to_string(), port));
    }

    let mut parts = input.split(':');
    let host = parts
        .next()
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ReplicationError::InvalidBrokerUrl(format!("{input}: missing host")))?;
    let port = match parts.next() {
        None => 1883,
        Some(port) => port.parse().map_err(|_| {
            ReplicationError::InvalidBrokerUrl(format!("{input}: invalid port '{port}'"))
        })?,
    };
    if parts.next().is_some() {
        return Err(ReplicationError::InvalidBrokerUrl(format!(
            "{input}: too many ':' separators"
        )));
    }

    Ok((host.to_string(), port))
}

/// Errors for replication operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ReplicationError {
    /// Subscription failed
    #[error("subscription error: {0}")]
    Subscribe(String),
    /// Invalid MQTT broker URL
    #[error("invalid MQTT broker URL: {0}")]
    InvalidBrokerUrl(String),
    /// Publish failed
    #[error("publish error: {0}")]
    Publish(String),
}
