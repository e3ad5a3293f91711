//! Agent runtime orchestration.

use crate::config::AgentConfig;
use crate::replication::ReplicationManager;
use crate::session::{self, SessionConfig, SessionEvent, SessionHandle};
use anyhow::{Context, Result};
use articlesync_adapter_api::{Article, ArticleClient, ArticleClientConfig};
use articlesync_core::DocId;
use articlesync_proto::topics::MessageType;
use articlesync_proto::TopicScheme;
use rumqttc::{Event, EventLoop, Packet};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use uuid::Uuid;

const DISCONNECT_GRACE: Duration = Duration::from_secs(2);

/// An opened article and the session editing it.
struct OpenArticle {
    article: Article,
    session: SessionHandle,
}

/// The main agent runtime.
pub struct Agent {
    config: AgentConfig,
    editor_id: Uuid,
    client: ArticleClient,
}

impl Agent {
    /// Create a new agent.
    ///
    /// # Errors
    ///
    /// Returns error if the article API client cannot be created.
    pub fn new(config: AgentConfig, editor_id: Uuid) -> Result<Self> {
        let client = ArticleClient::new(ArticleClientConfig {
            base_url: config.api.base_url.clone(),
            timeout: config.api.timeout,
            bearer_token: config.api.bearer_token.clone(),
            ca_cert_path: config.api.ca_cert_path.clone(),
        })
        .context("Failed to create article API client")?;

        Ok(Self {
            config,
            editor_id,
            client,
        })
    }

    /// Run the agent until Ctrl+C.
    ///
    /// # Errors
    ///
    /// Returns error if the replication layer cannot be set up.
    pub async fn run(self) -> Result<()> {
        tracing::info!(editor_id = %self.editor_id, "Starting agent runtime");

        let (replication, mut eventloop) = ReplicationManager::new(
            &self.config.replication.mqtt_broker,
            &format!("articlesync-{}", self.editor_id),
            TopicScheme::new(self.config.replication.tenant.as_str()),
        )
        .context("Failed to create replication manager")?;

        if let Some(dir) = &self.config.session.workdir {
            tokio::fs::create_dir_all(dir)
                .await
                .with_context(|| format!("Failed to create workdir {}", dir.display()))?;
        }

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let mut open = Vec::new();
        let mut routes = HashMap::<String, mpsc::Sender<SessionEvent>>::new();

        for article_id in &self.config.articles {
            let article = match self.client.fetch_article(article_id).await {
                Ok(article) => article,
                Err(err) => {
                    tracing::error!(article_id, error = %err, "Failed to fetch article, skipping");
                    continue;
                }
            };

            let doc_id = DocId::new(article_id.as_str());
            replication.subscribe(&doc_id).await?;

            let session = session::spawn(
                doc_id.clone(),
                article.body.clone(),
                replication.clone(),
                self.session_config(&doc_id),
                shutdown_rx.clone(),
            );
            routes.insert(doc_id.topic_hash(), session.sender());
            open.push(OpenArticle { article, session });
        }

        if open.is_empty() {
            tracing::warn!("No articles opened");
        }

        tracing::info!(articles = open.len(), "Agent running, press Ctrl+C to stop");

        loop {
            tokio::select! {
                event = eventloop.poll() => {
                    match event {
                        Ok(Event::Incoming(Packet::Publish(publish))) => {
                            route_publish(replication.topic_scheme(), &mut routes, &publish.topic, publish.payload.to_vec()).await;
                        }
                        Ok(_) => {}
                        Err(e) => {
                            tracing::error!(error = %e, "MQTT error");
                            tokio::time::sleep(Duration::from_secs(5)).await;
                        }
                    }
                }

                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Shutdown signal received");
                    break;
                }
            }
        }

        // Sessions flush on shutdown; keep the event loop turning so those
        // final publishes reach the broker.
        let _ = shutdown_tx.send(true);
        drop(routes);

        let closing = tokio::spawn(async move {
            let mut closed = Vec::with_capacity(open.len());
            for OpenArticle { article, session } in open {
                let doc_id = session.doc_id().clone();
                match session.join().await {
                    Ok(state) => closed.push((doc_id, article, state.live_text().to_string())),
                    Err(err) => tracing::error!(%doc_id, error = %err, "Session task failed"),
                }
            }
            closed
        });
        let closed = drive_until(&mut eventloop, closing).await?;

        for (doc_id, _, _) in &closed {
            if let Err(err) = replication.unsubscribe(doc_id).await {
                tracing::warn!(%doc_id, error = %err, "Failed to unsubscribe");
            }
        }

        if self.config.session.save_on_close {
            for (doc_id, mut article, body) in closed {
                article.body = body;
                match self.client.save_article(&article).await {
                    Ok(()) => tracing::info!(%doc_id, "Saved article"),
                    Err(err) => tracing::warn!(%doc_id, error = %err, "Failed to save article"),
                }
            }
        }

        if let Err(err) = replication.disconnect().await {
            tracing::debug!(error = %err, "Disconnect request failed");
        }
        let _ = tokio::time::timeout(DISCONNECT_GRACE, async {
            while eventloop.poll().await.is_ok() {}
        })
        .await;

        tracing::info!("Agent stopped");
        Ok(())
    }

    fn session_config(&self, doc_id: &DocId) -> SessionConfig {
        SessionConfig {
            tick_interval: self.config.session.tick_interval,
            pending_policy: self.config.session.pending_policy,
            working_copy: self
                .config
                .session
                .workdir
                .as_ref()
                .map(|dir| dir.join(format!("{}.md", doc_id.topic_hash()))),
        }
    }
}

/// Hand an inbound publish to the session owning its document.
async fn route_publish(
    topic_scheme: &TopicScheme,
    routes: &mut HashMap<String, mpsc::Sender<SessionEvent>>,
    topic: &str,
    payload: Vec<u8>,
) {
    tracing::debug!(topic, payload_len = payload.len(), "Received replication message");

    let Some((doc_hash, MessageType::Action)) = topic_scheme.parse(topic) else {
        return;
    };

    let Some(sender) = routes.get(&doc_hash) else {
        tracing::debug!(doc_hash, "No open session for document");
        return;
    };

    if sender.send(SessionEvent::Remote(payload)).await.is_err() {
        tracing::warn!(doc_hash, "Session closed, dropping route");
        routes.remove(&doc_hash);
    }
}

/// Poll the MQTT event loop until `task` completes.
async fn drive_until<T>(eventloop: &mut EventLoop, task: tokio::task::JoinHandle<T>) -> Result<T> {
    tokio::pin!(task);
    loop {
        tokio::select! {
            result = &mut task => return result.context("Session shutdown task failed"),
            event = eventloop.poll() => {
                if let Err(e) = event {
                    tracing::debug!(error = %e, "MQTT error during shutdown");
                    tokio::time::sleep(Duration::from_millis(100)).await;
                }
            }
        }
    }
}
