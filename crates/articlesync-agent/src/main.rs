//! Article sync agent binary.

use anyhow::Result;
use articlesync_agent::{Agent, AgentConfig};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting article sync agent"
    );

    let config = AgentConfig::from_env()?;

    let editor_id = config.editor_id.unwrap_or_else(Uuid::new_v4);
    tracing::info!(%editor_id, articles = config.articles.len(), "Agent initialized");

    let agent = Agent::new(config, editor_id)?;
    agent.run().await?;

    Ok(())
}
