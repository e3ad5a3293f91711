//! Agent configuration.

use anyhow::{bail, Context, Result};
use articlesync_core::PendingPolicy;
use std::path::PathBuf;
use std::time::Duration;
use uuid::Uuid;

/// Agent configuration.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Editor identifier, used for the MQTT client ID
    pub editor_id: Option<Uuid>,

    /// Article API configuration
    pub api: ApiConfig,

    /// Replication configuration
    pub replication: ReplicationConfig,

    /// Editing session configuration
    pub session: SessionSettings,

    /// Articles to open for editing
    pub articles: Vec<String>,
}

/// Article API configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Base URL of the article API
    pub base_url: String,

    /// Bearer token for authentication
    pub bearer_token: Option<String>,

    /// Request timeout
    pub timeout: Duration,

    /// Custom CA certificate for HTTPS endpoints (PEM)
    pub ca_cert_path: Option<PathBuf>,
}

/// Replication configuration.
#[derive(Debug, Clone)]
pub struct ReplicationConfig {
    /// MQTT broker URL for action replication
    pub mqtt_broker: String,

    /// Tenant identifier
    pub tenant: String,
}

/// Editing session configuration.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// Local edit detection period
    pub tick_interval: Duration,

    /// Directory holding one working copy file per article
    pub workdir: Option<PathBuf>,

    /// Handling of un-broadcast edits on remote merge
    pub pending_policy: PendingPolicy,

    /// Save the converged body back to the API when a session ends
    pub save_on_close: bool,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            editor_id: None,
            api: ApiConfig {
                base_url: "http://localhost:8080/api".to_string(),
                bearer_token: None,
                timeout: Duration::from_secs(30),
                ca_cert_path: None,
            },
            replication: ReplicationConfig {
                mqtt_broker: "tcp://localhost:1883".to_string(),
                tenant: "default".to_string(),
            },
            session: SessionSettings {
                tick_interval: Duration::from_millis(500),
                workdir: None,
                pending_policy: PendingPolicy::Fold,
                save_on_close: false,
            },
            articles: Vec::new(),
        }
    }
}

impl AgentConfig {
    /// Load configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `ARTICLESYNC_EDITOR_ID`: Editor UUID
    /// - `ARTICLESYNC_API_URL`: Article API base URL
    /// - `ARTICLESYNC_BEARER_TOKEN`: Article API token
    /// - `ARTICLESYNC_CA_CERT`: PEM file trusted for the article API
    /// - `ARTICLESYNC_MQTT_BROKER`: MQTT broker URL
    /// - `ARTICLESYNC_TENANT`: Tenant identifier
    /// - `ARTICLESYNC_TICK_MS`: Tick period in milliseconds
    /// - `ARTICLESYNC_WORKDIR`: Working copy directory
    /// - `ARTICLESYNC_PENDING_POLICY`: "fold" or "rebroadcast"
    /// - `ARTICLESYNC_SAVE_ON_CLOSE`: "true" to save on shutdown
    /// - `ARTICLESYNC_ARTICLES`: JSON array of article IDs
    ///
    /// # Errors
    ///
    /// Returns error if a variable is present but malformed.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns error if a value is present but malformed.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(id) = lookup("ARTICLESYNC_EDITOR_ID") {
            config.editor_id =
                Some(Uuid::parse_str(&id).context("Invalid ARTICLESYNC_EDITOR_ID")?);
        }

        if let Some(url) = lookup("ARTICLESYNC_API_URL") {
            config.api.base_url = url;
        }

        if let Some(token) = lookup("ARTICLESYNC_BEARER_TOKEN") {
            config.api.bearer_token = Some(token);
        }

        if let Some(path) = lookup("ARTICLESYNC_CA_CERT") {
            config.api.ca_cert_path = Some(PathBuf::from(path));
        }

        if let Some(mqtt) = lookup("ARTICLESYNC_MQTT_BROKER") {
            config.replication.mqtt_broker = mqtt;
        }

        if let Some(tenant) = lookup("ARTICLESYNC_TENANT") {
            config.replication.tenant = tenant;
        }

        if let Some(ms) = lookup("ARTICLESYNC_TICK_MS") {
            let ms = ms.parse::<u64>().context("Invalid ARTICLESYNC_TICK_MS")?;
            if ms == 0 {
                bail!("ARTICLESYNC_TICK_MS must be positive");
            }
            config.session.tick_interval = Duration::from_millis(ms);
        }

        if let Some(dir) = lookup("ARTICLESYNC_WORKDIR") {
            config.session.workdir = Some(PathBuf::from(dir));
        }

        if let Some(policy) = lookup("ARTICLESYNC_PENDING_POLICY") {
            config.session.pending_policy = policy
                .parse::<PendingPolicy>()
                .map_err(anyhow::Error::msg)
                .context("Invalid ARTICLESYNC_PENDING_POLICY")?;
        }

        if let Some(flag) = lookup("ARTICLESYNC_SAVE_ON_CLOSE") {
            config.session.save_on_close = flag
                .parse::<bool>()
                .context("Invalid ARTICLESYNC_SAVE_ON_CLOSE")?;
        }

        if let Some(articles_json) = lookup("ARTICLESYNC_ARTICLES") {
            config.articles = serde_json::from_str(&articles_json)
                .context("Invalid ARTICLESYNC_ARTICLES JSON")?;
        }

        Ok(config)
    }
}
