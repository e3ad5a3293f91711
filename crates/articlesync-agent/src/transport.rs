//! Outbound transport seam.
//!
//! The engine only needs to push encoded actions for a document; inbound
//! delivery is routed to it by the runtime. [`crate::replication::ReplicationManager`]
//! implements this over MQTT, [`ChannelTransport`] over an in-process channel.

use articlesync_core::DocId;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Sends encoded actions to peers editing the same document.
pub trait Transport: Send + Sync {
    /// Send one encoded action envelope for `doc_id`.
    ///
    /// Completion means the message was handed to the transport, not that
    /// any peer received it.
    fn send(
        &self,
        doc_id: &DocId,
        payload: Vec<u8>,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;
}

/// Errors raised by a transport.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    /// The transport cannot accept messages right now
    #[error("transport unavailable: {0}")]
    Unavailable(String),
}

/// A message captured by [`ChannelTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outbound {
    /// Routing document
    pub doc_id: DocId,
    /// Encoded envelope
    pub payload: Vec<u8>,
}

/// In-process transport that forwards every send into a channel.
///
/// Useful for wiring peers together without a broker. Sends can be made to
/// fail with [`ChannelTransport::set_available`].
#[derive(Debug, Clone)]
pub struct ChannelTransport {
    tx: mpsc::UnboundedSender<Outbound>,
    available: Arc<AtomicBool>,
}

impl ChannelTransport {
    /// Create a transport and the receiver its sends arrive on.
    #[must_use]
    pub fn pair() -> (Self, mpsc::UnboundedReceiver<Outbound>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                tx,
                available: Arc::new(AtomicBool::new(true)),
            },
            rx,
        )
    }

    /// Toggle whether sends succeed.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }
}

impl Transport for ChannelTransport {
    async fn send(&self, doc_id: &DocId, payload: Vec<u8>) -> Result<(), TransportError> {
        if !self.available.load(Ordering::SeqCst) {
            return Err(TransportError::Unavailable("channel offline".to_string()));
        }

        self.tx
            .send(Outbound {
                doc_id: doc_id.clone(),
                payload,
            })
            .map_err(|_| TransportError::Unavailable("receiver dropped".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn channel_transport_forwards() {
        let (transport, mut rx) = ChannelTransport::pair();
        let doc = DocId::new("a");

        transport.send(&doc, vec![1, 2, 3]).await.unwrap();

        let out = rx.recv().await.unwrap();
        assert_eq!(out.doc_id, doc);
        assert_eq!(out.payload, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn offline_channel_transport_fails() {
        let (transport, mut rx) = ChannelTransport::pair();
        transport.set_available(false);

        let err = transport.send(&DocId::new("a"), vec![]).await.unwrap_err();
        assert!(matches!(err, TransportError::Unavailable(_)));
        assert!(rx.try_recv().is_err());
    }
}
