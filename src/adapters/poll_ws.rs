//! Live event stream adapter
//!
//! Holds the single WebSocket connection to the poll service and forwards
//! what happens on it as `FeedMessage`s: connection lifecycle signals and
//! decoded `LiveEvent`s, in arrival order. Malformed frames are dropped here
//! and never reach the store.

use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::{interval_at, timeout, Instant};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, warn};
use url::Url;

use crate::config::{AppConfig, ReconnectConfig};
use crate::domain::LiveEvent;
use crate::error::{QuickPollError, Result};

/// How much of a dropped frame to include in the log line
const LOG_PREVIEW_CHARS: usize = 200;

/// What the transport reports to the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedMessage {
    /// A connection attempt started
    Connecting,
    /// Handshake completed
    Opened,
    /// A decoded live event
    Event(LiveEvent),
    /// Connection errored or was closed
    Closed { reason: String },
}

/// Why a connected session ended without an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionEnd {
    Shutdown,
    RemoteClosed,
}

/// WebSocket client for the live poll stream
pub struct PollFeed {
    ws_url: String,
    connect_timeout: Duration,
    ping_interval: Duration,
    reconnect: ReconnectConfig,
    feed_tx: mpsc::Sender<FeedMessage>,
}

impl PollFeed {
    pub fn new(ws_url: &str, feed_tx: mpsc::Sender<FeedMessage>) -> Self {
        let defaults = crate::config::ConnectionConfig::default();
        Self {
            ws_url: ws_url.to_string(),
            connect_timeout: defaults.connect_timeout(),
            ping_interval: defaults.ping_interval(),
            reconnect: defaults.reconnect,
            feed_tx,
        }
    }

    pub fn from_config(config: &AppConfig, feed_tx: mpsc::Sender<FeedMessage>) -> Self {
        Self {
            ws_url: config.server.ws_url.clone(),
            connect_timeout: config.connection.connect_timeout(),
            ping_interval: config.connection.ping_interval(),
            reconnect: config.connection.reconnect.clone(),
            feed_tx,
        }
    }

    /// Override the reconnect policy
    pub fn with_reconnect(mut self, reconnect: ReconnectConfig) -> Self {
        self.reconnect = reconnect;
        self
    }

    /// Forward a message to the store. `false` means the store is gone.
    async fn emit(&self, msg: FeedMessage) -> bool {
        self.feed_tx.send(msg).await.is_ok()
    }

    /// Run the connection until `shutdown` flips to `true` (or its sender is
    /// dropped), reconnecting according to the configured policy.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        let mut attempt: u32 = 0;

        loop {
            if *shutdown.borrow() {
                return Ok(());
            }

            if !self.emit(FeedMessage::Connecting).await {
                debug!("Feed receiver dropped; stopping live feed");
                return Ok(());
            }

            let reason = match self.connect_and_stream(&mut shutdown).await {
                Ok(SessionEnd::Shutdown) => {
                    let _ = self
                        .emit(FeedMessage::Closed {
                            reason: "client teardown".to_string(),
                        })
                        .await;
                    return Ok(());
                }
                Ok(SessionEnd::RemoteClosed) => {
                    info!("Live connection closed by server");
                    attempt = 0;
                    "connection closed".to_string()
                }
                Err(e) => {
                    attempt = attempt.saturating_add(1);
                    error!("Live connection error (attempt {}): {}", attempt, e);
                    e.to_string()
                }
            };

            if !self.emit(FeedMessage::Closed { reason }).await {
                return Ok(());
            }

            if !self.reconnect.enabled {
                info!("Reconnect disabled; live feed stopped");
                return Ok(());
            }

            let delay = self.reconnect.delay_for_attempt(attempt) + jitter(attempt);
            warn!("Reconnecting in {:?} (attempt {})", delay, attempt);

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = shutdown.changed() => {
                    return Ok(());
                }
            }
        }
    }

    /// Connect, then pump frames until the session ends
    async fn connect_and_stream(&self, shutdown: &mut watch::Receiver<bool>) -> Result<SessionEnd> {
        let url = Url::parse(&self.ws_url)
            .map_err(|e| QuickPollError::Internal(format!("Invalid WebSocket URL: {}", e)))?;

        info!("Connecting to live stream: {}", url);

        let (ws_stream, _) = timeout(self.connect_timeout, connect_async(url.as_str()))
            .await
            .map_err(|_| QuickPollError::Internal("WebSocket connection timeout".to_string()))?
            .map_err(QuickPollError::WebSocket)?;

        info!("Live stream connected");

        if !self.emit(FeedMessage::Opened).await {
            return Ok(SessionEnd::Shutdown);
        }

        let (mut write, mut read) = ws_stream.split();
        let mut ping_interval =
            interval_at(Instant::now() + self.ping_interval, self.ping_interval);

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        debug!("Teardown requested; closing live stream");
                        let _ = write.send(Message::Close(None)).await;
                        return Ok(SessionEnd::Shutdown);
                    }
                }
                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            if !self.handle_message(&text).await {
                                return Ok(SessionEnd::Shutdown);
                            }
                        }
                        Some(Ok(Message::Ping(data))) => {
                            write.send(Message::Pong(data)).await?;
                        }
                        Some(Ok(Message::Close(_))) => {
                            info!("Received close frame");
                            return Ok(SessionEnd::RemoteClosed);
                        }
                        Some(Err(e)) => {
                            return Err(e.into());
                        }
                        None => {
                            return Ok(SessionEnd::RemoteClosed);
                        }
                        _ => {}
                    }
                }
                _ = ping_interval.tick() => {
                    write.send(Message::Ping(vec![])).await?;
                    debug!("Sent ping");
                }
            }
        }
    }

    /// Decode one text frame and forward it.
    ///
    /// Returns `false` only when the store has gone away.
    async fn handle_message(&self, text: &str) -> bool {
        match LiveEvent::from_json(text) {
            Ok(event) => {
                debug!("Live event received: {}", event);
                self.emit(FeedMessage::Event(event)).await
            }
            Err(e) => {
                let preview: String = text.chars().take(LOG_PREVIEW_CHARS).collect();
                warn!("Dropping live frame ({}): {}", e, preview);
                true
            }
        }
    }
}

/// Up to 250ms of extra delay per attempt, derived from the clock
fn jitter(attempt: u32) -> Duration {
    use std::time::{SystemTime, UNIX_EPOCH};

    let range_ms = 250u64 * attempt.max(1) as u64;
    let seed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64;
    Duration::from_millis(seed % range_ms)
}
