//! Live session wiring
//!
//! A `LiveSession` owns one poll store and one live feed. Starting it spawns
//! both tasks; tearing it down stops the store first so nothing that arrives
//! afterwards can touch state, then closes the connection.

use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::adapters::{PollApiClient, PollFeed};
use crate::config::AppConfig;
use crate::error::{QuickPollError, Result};
use crate::service::PollService;

use super::store::{PollStore, PollStoreHandle};

/// Feed channel capacity
const FEED_CHANNEL_CAPACITY: usize = 256;

pub struct LiveSession {
    id: Uuid,
    handle: PollStoreHandle,
    shutdown_tx: watch::Sender<bool>,
    store_task: JoinHandle<()>,
    feed_task: JoinHandle<Result<()>>,
}

impl LiveSession {
    /// Start against the HTTP service named in `config`
    pub fn start(config: &AppConfig) -> Result<Self> {
        let client = PollApiClient::from_config(config)?;
        Ok(Self::start_with(config, Arc::new(client)))
    }

    /// Start with a caller-supplied service; the live feed still uses `config`
    pub fn start_with(config: &AppConfig, service: Arc<dyn PollService>) -> Self {
        let id = Uuid::new_v4();
        let span = info_span!("live_session", session_id = %id);

        let (feed_tx, feed_rx) = mpsc::channel(FEED_CHANNEL_CAPACITY);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let (store, handle) = PollStore::new(service, feed_rx);
        let feed = PollFeed::from_config(config, feed_tx);

        let store_task = tokio::spawn(store.run().instrument(span.clone()));
        let feed_task = tokio::spawn(feed.run(shutdown_rx).instrument(span));

        info!(session_id = %id, "live session started");

        Self {
            id,
            handle,
            shutdown_tx,
            store_task,
            feed_task,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn handle(&self) -> PollStoreHandle {
        self.handle.clone()
    }

    /// Stop the session and wait for both tasks
    pub async fn teardown(self) -> Result<()> {
        info!(session_id = %self.id, "tearing down live session");

        if let Err(e) = self.handle.shutdown().await {
            warn!("Poll store already stopped: {}", e);
        }
        self.store_task
            .await
            .map_err(|e| QuickPollError::Internal(format!("poll store task failed: {}", e)))?;

        let _ = self.shutdown_tx.send(true);
        let feed_result = self
            .feed_task
            .await
            .map_err(|e| QuickPollError::Internal(format!("live feed task failed: {}", e)))?;

        info!(session_id = %self.id, "live session stopped");
        feed_result
    }
}
