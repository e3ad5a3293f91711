//! Per-document editing session.
//!
//! A session owns one [`Engine`] and runs it on its own task. Ticks, remote
//! payloads and local edits are funneled through a single `select!` loop, so
//! no two events for the same document are ever processed concurrently.
//! Sessions share nothing mutable with each other.

use crate::engine::{Engine, ReceiveOutcome, TickOutcome};
use crate::transport::Transport;
use articlesync_core::{DocId, PendingPolicy, ReconciliationState};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use uuid::Uuid;

const EVENT_QUEUE: usize = 256;

/// Session settings.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Period of the local-edit detection tick
    pub tick_interval: Duration,
    /// What to do with a pending local edit when a remote edit is merged
    pub pending_policy: PendingPolicy,
    /// Optional file mirroring the live text
    pub working_copy: Option<PathBuf>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(500),
            pending_policy: PendingPolicy::Fold,
            working_copy: None,
        }
    }
}

/// Events delivered to a session.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// Encoded action envelope from the transport
    Remote(Vec<u8>),
    /// New live text typed by the local user
    LocalEdit(String),
}

/// Handle to a running session.
pub struct SessionHandle {
    doc_id: DocId,
    events: mpsc::Sender<SessionEvent>,
    task: JoinHandle<ReconciliationState>,
}

impl SessionHandle {
    /// The document the session edits.
    #[must_use]
    pub fn doc_id(&self) -> &DocId {
        &self.doc_id
    }

    /// A sender for feeding events into the session queue.
    #[must_use]
    pub fn sender(&self) -> mpsc::Sender<SessionEvent> {
        self.events.clone()
    }

    /// Queue an event.
    ///
    /// Returns `false` if the session has already ended.
    pub async fn deliver(&self, event: SessionEvent) -> bool {
        self.events.send(event).await.is_ok()
    }

    /// Wait for the session to end and return its final texts.
    ///
    /// The session ends when the shutdown signal fires or every sender,
    /// including this handle's, is dropped.
    ///
    /// # Errors
    ///
    /// Returns error if the session task panicked.
    pub async fn join(self) -> Result<ReconciliationState, tokio::task::JoinError> {
        drop(self.events);
        self.task.await
    }
}

/// Start a session on a new task.
///
/// `seed` is the article body fetched at open time. The session stops when
/// `shutdown` becomes `true`, flushing any pending edit once before exiting.
pub fn spawn<T>(
    doc_id: DocId,
    seed: String,
    transport: T,
    config: SessionConfig,
    shutdown: watch::Receiver<bool>,
) -> SessionHandle
where
    T: Transport + 'static,
{
    let (tx, rx) = mpsc::channel(EVENT_QUEUE);
    let engine = Engine::new(
        doc_id.clone(),
        seed,
        Uuid::new_v4(),
        config.pending_policy,
        transport,
    );

    let task = tokio::spawn(run(engine, config, rx, shutdown));

    SessionHandle {
        doc_id,
        events: tx,
        task,
    }
}

async fn run<T: Transport>(
    mut engine: Engine<T>,
    config: SessionConfig,
    mut events: mpsc::Receiver<SessionEvent>,
    mut shutdown: watch::Receiver<bool>,
) -> ReconciliationState {
    let doc_id = engine.doc_id().clone();
    let working_copy = config.working_copy.as_deref().map(WorkingCopy::new);

    if let Some(copy) = &working_copy {
        copy.store(engine.state().live_text()).await;
    }

    let mut ticker = tokio::time::interval(config.tick_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    tracing::info!(%doc_id, tick_ms = config.tick_interval.as_millis(), "Session started");

    loop {
        tokio::select! {
            biased;

            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }

            _ = ticker.tick() => {
                if let Some(copy) = &working_copy {
                    if let Some(text) = copy.load().await {
                        engine.set_live_text(text);
                    }
                }
                flush(&mut engine).await;
            }

            event = events.recv() => {
                match event {
                    Some(SessionEvent::Remote(payload)) => {
                        handle_remote(&mut engine, &payload, working_copy.as_ref()).await;
                    }
                    Some(SessionEvent::LocalEdit(text)) => engine.set_live_text(text),
                    None => break,
                }
            }
        }
    }

    // Pick up a last edit from the working copy, then a final flush.
    if let Some(copy) = &working_copy {
        if let Some(text) = copy.load().await {
            engine.set_live_text(text);
        }
    }
    flush(&mut engine).await;

    tracing::info!(%doc_id, "Session closed");
    engine.into_state()
}

async fn flush<T: Transport>(engine: &mut Engine<T>) {
    match engine.tick().await {
        Ok(TickOutcome::Idle) => {}
        Ok(TickOutcome::Sent { stamp, action }) => {
            tracing::trace!(doc_id = %engine.doc_id(), %stamp, %action, "Tick sent");
        }
        Err(err) => {
            tracing::warn!(doc_id = %engine.doc_id(), error = %err, "Tick failed, retrying next tick");
        }
    }
}

async fn handle_remote<T: Transport>(
    engine: &mut Engine<T>,
    payload: &[u8],
    working_copy: Option<&WorkingCopy>,
) {
    // The file may hold keystrokes newer than the last tick.
    if let Some(copy) = working_copy {
        if let Some(text) = copy.load().await {
            engine.set_live_text(text);
        }
    }

    match engine.remote_receive(payload) {
        Ok(ReceiveOutcome::Merged(outcome)) => {
            if outcome.live_changed {
                if let Some(copy) = working_copy {
                    copy.store(engine.state().live_text()).await;
                }
            }
        }
        Ok(ReceiveOutcome::Ignored(reason)) => {
            tracing::trace!(doc_id = %engine.doc_id(), ?reason, "Remote payload ignored");
        }
        Err(err) => {
            tracing::warn!(doc_id = %engine.doc_id(), error = %err, "Dropped remote action");
        }
    }
}

/// File mirroring a session's live text.
///
/// The user edits the file; the session reads it every tick and writes the
/// merged text back after each remote edit.
#[derive(Debug, Clone)]
pub struct WorkingCopy {
    path: PathBuf,
}

impl WorkingCopy {
    /// Wrap a path.
    #[must_use]
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    /// Read the current file contents, or `None` if unreadable.
    pub async fn load(&self) -> Option<String> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => Some(text),
            Err(err) => {
                tracing::warn!(path = %self.path.display(), error = %err, "Failed to read working copy");
                None
            }
        }
    }

    /// Overwrite the file contents.
    pub async fn store(&self, text: &str) {
        if let Err(err) = tokio::fs::write(&self.path, text).await {
            tracing::warn!(path = %self.path.display(), error = %err, "Failed to write working copy");
        }
    }
}
