//! Poll store: single owner of the live poll state
//!
//! The store actor owns the poll collection, the action ledger and the
//! connection state. Everything that changes them arrives as a message and is
//! handled to completion before the next one:
//!   - feed messages from the live connection (lifecycle signals, events)
//!   - commands from `PollStoreHandle` (vote, like, resync, shutdown)
//!   - completions of vote/like requests running in background tasks
//!
//! After every change the store publishes a fresh `PollView` on a watch
//! channel; readers never mutate state.

use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info, warn};

use crate::adapters::FeedMessage;
use crate::domain::{
    ActionKind, ActionLedger, ConnectionState, LiveEvent, NewPoll, OptionId, PollCollection,
    PollId,
};
use crate::error::{QuickPollError, Result};
use crate::service::PollService;

use super::lifecycle::ConnectionLifecycle;
use super::reconciler::{apply_in_place, Applied};
use super::snapshot::load_snapshot;

/// Command channel capacity
const COMMAND_CHANNEL_CAPACITY: usize = 64;

/// Read-only state published after every change
#[derive(Debug, Clone)]
pub struct PollView {
    pub polls: PollCollection,
    pub connection: ConnectionState,
    pub ledger: ActionLedger,
    /// Vote/like requests awaiting the service's answer
    pub pending: BTreeSet<(ActionKind, PollId)>,
    pub last_synced_at: Option<DateTime<Utc>>,
    pub last_sync_error: Option<String>,
    pub events_applied: u64,
    pub events_dropped: u64,
    /// Successful handshakes since the session started
    pub connections_opened: u64,
}

impl Default for PollView {
    fn default() -> Self {
        Self {
            polls: PollCollection::new(),
            connection: ConnectionState::Closed,
            ledger: ActionLedger::new(),
            pending: BTreeSet::new(),
            last_synced_at: None,
            last_sync_error: None,
            events_applied: 0,
            events_dropped: 0,
            connections_opened: 0,
        }
    }
}

impl PollView {
    /// Live/offline indicator
    pub fn is_live(&self) -> bool {
        self.connection.is_live()
    }

    pub fn can_vote(&self, poll_id: PollId) -> bool {
        self.ledger.can_vote(poll_id) && !self.pending.contains(&(ActionKind::Vote, poll_id))
    }

    pub fn can_like(&self, poll_id: PollId) -> bool {
        self.ledger.can_like(poll_id) && !self.pending.contains(&(ActionKind::Like, poll_id))
    }
}

/// A one-time action on a poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Vote { poll_id: PollId, option_id: OptionId },
    Like { poll_id: PollId },
}

impl Action {
    pub fn kind(&self) -> ActionKind {
        match self {
            Action::Vote { .. } => ActionKind::Vote,
            Action::Like { .. } => ActionKind::Like,
        }
    }

    pub fn poll_id(&self) -> PollId {
        match self {
            Action::Vote { poll_id, .. } | Action::Like { poll_id } => *poll_id,
        }
    }
}

/// How a submitted action ended when it did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionOutcome {
    /// Service confirmed; now in the ledger
    Recorded,
    /// Ledger already holds this action; nothing was sent
    AlreadyRecorded,
    /// Same action for this poll still awaiting the service; nothing was sent
    InFlight,
}

#[derive(Debug)]
enum StoreCommand {
    Submit {
        action: Action,
        reply: oneshot::Sender<Result<ActionOutcome>>,
    },
    Resync {
        reply: oneshot::Sender<Result<usize>>,
    },
    Shutdown,
}

/// Result of a background action request, routed back into the actor
#[derive(Debug)]
struct Completion {
    action: Action,
    result: Result<()>,
    reply: oneshot::Sender<Result<ActionOutcome>>,
}

/// Clonable handle for UI code: read the view, request actions
#[derive(Clone)]
pub struct PollStoreHandle {
    cmd_tx: mpsc::Sender<StoreCommand>,
    view_rx: watch::Receiver<PollView>,
    service: Arc<dyn PollService>,
}

impl PollStoreHandle {
    /// Receiver that yields every published view
    pub fn subscribe(&self) -> watch::Receiver<PollView> {
        self.view_rx.clone()
    }

    /// Latest published view
    pub fn view(&self) -> PollView {
        self.view_rx.borrow().clone()
    }

    async fn submit(&self, action: Action) -> Result<ActionOutcome> {
        let (reply, rx) = oneshot::channel();
        self.cmd_tx
            .send(StoreCommand::Submit { action, reply })
            .await
            .map_err(|_| QuickPollError::ChannelClosed("poll store stopped".into()))?;
        rx.await.map_err(|_| QuickPollError::Cancelled)?
    }

    /// Vote once on `poll_id`. The ledger is updated only after the service
    /// confirms; a failed request leaves it untouched so the user may retry.
    pub async fn vote(&self, poll_id: PollId, option_id: OptionId) -> Result<ActionOutcome> {
        self.submit(Action::Vote { poll_id, option_id }).await
    }

    /// Like `poll_id` once, same rules as `vote`
    pub async fn like(&self, poll_id: PollId) -> Result<ActionOutcome> {
        self.submit(Action::Like { poll_id }).await
    }

    /// Replace the collection with a fresh snapshot; returns the poll count.
    pub async fn resync(&self) -> Result<usize> {
        let (reply, rx) = oneshot::channel();
        self.cmd_tx
            .send(StoreCommand::Resync { reply })
            .await
            .map_err(|_| QuickPollError::ChannelClosed("poll store stopped".into()))?;
        rx.await.map_err(|_| QuickPollError::Cancelled)?
    }

    /// Validate and submit a new poll.
    ///
    /// The poll shows up locally only once its `poll_created` event arrives.
    pub async fn create_poll<S: AsRef<str>>(&self, title: &str, options: &[S]) -> Result<()> {
        let poll = NewPoll::new(title, options)?;
        self.service.create_poll(&poll).await?;
        info!("Poll '{}' submitted", poll.title);
        Ok(())
    }

    /// Stop the store. No feed message or late completion is applied afterwards.
    pub async fn shutdown(&self) -> Result<()> {
        self.cmd_tx
            .send(StoreCommand::Shutdown)
            .await
            .map_err(|_| QuickPollError::ChannelClosed("poll store stopped".into()))
    }
}

/// The actor. Create with `PollStore::new`, then drive with `run`.
pub struct PollStore {
    service: Arc<dyn PollService>,
    state: PollView,
    lifecycle: ConnectionLifecycle,
    cmd_rx: mpsc::Receiver<StoreCommand>,
    feed_rx: mpsc::Receiver<FeedMessage>,
    completion_tx: mpsc::UnboundedSender<Completion>,
    completion_rx: mpsc::UnboundedReceiver<Completion>,
    view_tx: watch::Sender<PollView>,
}

impl PollStore {
    pub fn new(
        service: Arc<dyn PollService>,
        feed_rx: mpsc::Receiver<FeedMessage>,
    ) -> (Self, PollStoreHandle) {
        let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
        let (completion_tx, completion_rx) = mpsc::unbounded_channel();
        let (view_tx, view_rx) = watch::channel(PollView::default());

        let handle = PollStoreHandle {
            cmd_tx,
            view_rx,
            service: Arc::clone(&service),
        };

        let store = Self {
            service,
            state: PollView::default(),
            lifecycle: ConnectionLifecycle::new(),
            cmd_rx,
            feed_rx,
            completion_tx,
            completion_rx,
            view_tx,
        };

        (store, handle)
    }

    /// Main loop. Returns after `shutdown` or once every handle is dropped.
    pub async fn run(mut self) {
        info!("poll store starting");
        let _ = self.resync("startup").await;

        loop {
            tokio::select! {
                biased;

                cmd = self.cmd_rx.recv() => {
                    match cmd {
                        Some(StoreCommand::Shutdown) | None => break,
                        Some(cmd) => self.handle_command(cmd).await,
                    }
                }

                Some(done) = self.completion_rx.recv() => {
                    self.handle_completion(done);
                }

                Some(msg) = self.feed_rx.recv() => {
                    self.handle_feed(msg).await;
                }
            }
        }

        // Late completions and feed messages now hit closed channels.
        self.feed_rx.close();
        self.completion_rx.close();
        info!(
            applied = self.state.events_applied,
            dropped = self.state.events_dropped,
            "poll store stopped"
        );
    }

    fn publish(&self) {
        self.view_tx.send_replace(self.state.clone());
    }

    async fn handle_command(&mut self, cmd: StoreCommand) {
        match cmd {
            StoreCommand::Submit { action, reply } => self.submit(action, reply),
            StoreCommand::Resync { reply } => {
                let result = self.resync("requested").await;
                let _ = reply.send(result);
            }
            StoreCommand::Shutdown => {}
        }
    }

    async fn handle_feed(&mut self, msg: FeedMessage) {
        match msg {
            FeedMessage::Connecting => {
                self.set_connection(ConnectionState::Connecting, "connection attempt");
            }
            FeedMessage::Opened => {
                let resync_needed = self
                    .lifecycle
                    .observe(ConnectionState::Open, "handshake complete")
                    .map(|t| t.requires_resync())
                    .unwrap_or(false);
                self.state.connection = self.lifecycle.state();
                self.state.connections_opened = self.lifecycle.opened_count();
                self.publish();

                // Events broadcast while offline are gone; only a full load recovers them.
                if resync_needed {
                    let _ = self.resync("connection opened").await;
                }
            }
            FeedMessage::Event(event) => self.apply(event),
            FeedMessage::Closed { reason } => {
                self.set_connection(ConnectionState::Closed, &reason);
            }
        }
    }

    fn set_connection(&mut self, to: ConnectionState, reason: &str) {
        if self.lifecycle.observe(to, reason).is_some() {
            self.state.connection = self.lifecycle.state();
            self.publish();
        }
    }

    fn apply(&mut self, event: LiveEvent) {
        if !self.state.is_live() {
            self.state.events_dropped += 1;
            debug!("Dropping {} received while {}", event, self.state.connection);
            self.publish();
            return;
        }

        match apply_in_place(&mut self.state.polls, &event) {
            Applied::Inserted | Applied::Replaced | Applied::Updated => {
                self.state.events_applied += 1;
                debug!("Applied {}", event);
            }
            Applied::UnknownPoll(poll_id) => {
                self.state.events_dropped += 1;
                debug!("Dropping {}: poll {} not present", event, poll_id);
            }
            Applied::UnknownOption(poll_id, option_id) => {
                self.state.events_dropped += 1;
                debug!(
                    "Dropping {}: option {} not part of poll {}",
                    event, option_id, poll_id
                );
            }
        }
        self.publish();
    }

    async fn resync(&mut self, trigger: &str) -> Result<usize> {
        match load_snapshot(self.service.as_ref()).await {
            Ok(collection) => {
                let count = collection.len();
                self.state.polls = collection;
                self.state.last_synced_at = Some(Utc::now());
                self.state.last_sync_error = None;
                self.publish();
                info!(trigger, polls = count, "resync complete");
                Ok(count)
            }
            Err(e) => {
                warn!(
                    trigger,
                    "resync failed; keeping {} cached polls: {}",
                    self.state.polls.len(),
                    e
                );
                self.state.last_sync_error = Some(e.to_string());
                self.publish();
                Err(e)
            }
        }
    }

    fn submit(&mut self, action: Action, reply: oneshot::Sender<Result<ActionOutcome>>) {
        let kind = action.kind();
        let poll_id = action.poll_id();

        if !self.state.ledger.can(kind, poll_id) {
            debug!("{} on poll {} already recorded", kind, poll_id);
            let _ = reply.send(Ok(ActionOutcome::AlreadyRecorded));
            return;
        }

        if !self.state.pending.insert((kind, poll_id)) {
            debug!("{} on poll {} already in flight", kind, poll_id);
            let _ = reply.send(Ok(ActionOutcome::InFlight));
            return;
        }
        self.publish();

        let service = Arc::clone(&self.service);
        let completion_tx = self.completion_tx.clone();
        tokio::spawn(async move {
            let result = match action {
                Action::Vote { poll_id, option_id } => service.vote(poll_id, option_id).await,
                Action::Like { poll_id } => service.like(poll_id).await,
            };
            // Store gone means teardown; the reply is dropped and the caller sees Cancelled.
            let _ = completion_tx.send(Completion {
                action,
                result,
                reply,
            });
        });
    }

    fn handle_completion(&mut self, done: Completion) {
        let kind = done.action.kind();
        let poll_id = done.action.poll_id();
        self.state.pending.remove(&(kind, poll_id));

        let outcome = match done.result {
            Ok(()) => {
                self.state.ledger.record(kind, poll_id);
                info!("{} on poll {} recorded", kind, poll_id);
                Ok(ActionOutcome::Recorded)
            }
            Err(e) => {
                warn!("{} on poll {} not recorded: {}", kind, poll_id, e);
                Err(e)
            }
        };
        self.publish();
        let _ = done.reply.send(outcome);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Poll, PollOption};
    use crate::service::MockPollService;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::time::Duration;
    use tokio::sync::Notify;
    use tokio::task::JoinHandle;

    fn poll(id: PollId) -> Poll {
        Poll {
            id,
            title: format!("Poll {}", id),
            created_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, id as u32).unwrap(),
            likes: 0,
            options: vec![
                PollOption {
                    id: 10,
                    option_text: "Pizza".to_string(),
                    votes: 0,
                },
                PollOption {
                    id: 11,
                    option_text: "Tacos".to_string(),
                    votes: 0,
                },
            ],
        }
    }

    fn spawn_store(
        service: impl PollService + 'static,
    ) -> (PollStoreHandle, mpsc::Sender<FeedMessage>, JoinHandle<()>) {
        let (feed_tx, feed_rx) = mpsc::channel(16);
        let (store, handle) = PollStore::new(Arc::new(service), feed_rx);
        let task = tokio::spawn(store.run());
        (handle, feed_tx, task)
    }

    async fn wait_for(
        rx: &mut watch::Receiver<PollView>,
        pred: impl Fn(&PollView) -> bool,
    ) -> PollView {
        tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                {
                    let view = rx.borrow_and_update();
                    if pred(&view) {
                        return view.clone();
                    }
                }
                rx.changed().await.expect("store stopped");
            }
        })
        .await
        .expect("timed out waiting for view")
    }

    async fn open(feed_tx: &mpsc::Sender<FeedMessage>) {
        feed_tx.send(FeedMessage::Connecting).await.unwrap();
        feed_tx.send(FeedMessage::Opened).await.unwrap();
    }

    fn vote(poll_id: PollId, option_id: OptionId, votes: u64) -> FeedMessage {
        FeedMessage::Event(LiveEvent::VoteUpdated {
            poll_id,
            option_id,
            votes,
        })
    }

    #[tokio::test]
    async fn test_startup_and_open_both_resync() {
        let mut service = MockPollService::new();
        service
            .expect_list_polls()
            .times(2)
            .returning(|| Ok(vec![poll(1), poll(2)]));

        let (handle, feed_tx, _task) = spawn_store(service);
        let mut rx = handle.subscribe();

        open(&feed_tx).await;
        feed_tx.send(vote(1, 10, 4)).await.unwrap();

        let view = wait_for(&mut rx, |v| v.events_applied == 1).await;
        assert!(view.is_live());
        assert_eq!(view.polls.ids(), vec![2, 1]);
        assert_eq!(view.polls.get(1).unwrap().option(10).unwrap().votes, 4);
        assert!(view.last_synced_at.is_some());
    }

    #[tokio::test]
    async fn test_events_before_open_are_dropped() {
        let mut service = MockPollService::new();
        service.expect_list_polls().returning(|| Ok(vec![poll(1)]));

        let (handle, feed_tx, _task) = spawn_store(service);
        let mut rx = handle.subscribe();

        feed_tx.send(FeedMessage::Connecting).await.unwrap();
        feed_tx.send(vote(1, 10, 9)).await.unwrap();

        let view = wait_for(&mut rx, |v| v.events_dropped == 1).await;
        assert_eq!(view.polls.get(1).unwrap().option(10).unwrap().votes, 0);
        assert_eq!(view.connection, ConnectionState::Connecting);
    }

    #[tokio::test]
    async fn test_failed_resync_keeps_previous_polls() {
        let mut service = MockPollService::new();
        let mut calls = 0;
        service.expect_list_polls().returning(move || {
            calls += 1;
            if calls == 1 {
                Ok(vec![poll(1), poll(2)])
            } else {
                Err(QuickPollError::Api {
                    status: 502,
                    body: "bad gateway".to_string(),
                })
            }
        });

        let (handle, feed_tx, _task) = spawn_store(service);
        let mut rx = handle.subscribe();
        wait_for(&mut rx, |v| v.polls.len() == 2).await;

        open(&feed_tx).await;
        let view = wait_for(&mut rx, |v| v.last_sync_error.is_some()).await;
        assert!(view.is_live());
        assert_eq!(view.polls.ids(), vec![2, 1]);

        let err = handle.resync().await.unwrap_err();
        assert!(matches!(err, QuickPollError::Api { status: 502, .. }));
        assert_eq!(handle.view().polls.len(), 2);
    }

    #[tokio::test]
    async fn test_close_keeps_data_and_goes_offline() {
        let mut service = MockPollService::new();
        service.expect_list_polls().returning(|| Ok(vec![poll(1)]));

        let (handle, feed_tx, _task) = spawn_store(service);
        let mut rx = handle.subscribe();

        open(&feed_tx).await;
        wait_for(&mut rx, |v| v.is_live()).await;

        feed_tx
            .send(FeedMessage::Closed {
                reason: "connection reset".to_string(),
            })
            .await
            .unwrap();
        let view = wait_for(&mut rx, |v| v.connection == ConnectionState::Closed).await;
        assert!(!view.is_live());
        assert_eq!(view.polls.len(), 1);
    }

    #[tokio::test]
    async fn test_reconnects_are_counted() {
        let mut service = MockPollService::new();
        service.expect_list_polls().returning(|| Ok(vec![poll(1)]));

        let (handle, feed_tx, _task) = spawn_store(service);
        let mut rx = handle.subscribe();
        assert_eq!(handle.view().connections_opened, 0);

        open(&feed_tx).await;
        wait_for(&mut rx, |v| v.connections_opened == 1).await;

        feed_tx
            .send(FeedMessage::Closed {
                reason: "connection reset".to_string(),
            })
            .await
            .unwrap();
        open(&feed_tx).await;

        let view = wait_for(&mut rx, |v| v.connections_opened == 2).await;
        assert!(view.is_live());
    }

    #[tokio::test]
    async fn test_resync_replaces_rather_than_merges() {
        let mut service = MockPollService::new();
        service.expect_list_polls().returning(|| Ok(vec![poll(1)]));

        let (handle, feed_tx, _task) = spawn_store(service);
        let mut rx = handle.subscribe();

        open(&feed_tx).await;
        feed_tx
            .send(FeedMessage::Event(LiveEvent::PollCreated { poll: poll(5) }))
            .await
            .unwrap();
        feed_tx.send(vote(1, 11, 3)).await.unwrap();
        wait_for(&mut rx, |v| v.events_applied == 2).await;

        assert_eq!(handle.resync().await.unwrap(), 1);
        let view = handle.view();
        assert_eq!(view.polls.ids(), vec![1]);
        assert_eq!(view.polls.get(1).unwrap().option(11).unwrap().votes, 0);
    }

    #[tokio::test]
    async fn test_vote_recorded_once() {
        let mut service = MockPollService::new();
        service.expect_list_polls().returning(|| Ok(vec![poll(1)]));
        service
            .expect_vote()
            .withf(|poll_id, option_id| *poll_id == 1 && *option_id == 10)
            .times(1)
            .returning(|_, _| Ok(()));

        let (handle, _feed_tx, _task) = spawn_store(service);

        assert_eq!(handle.vote(1, 10).await.unwrap(), ActionOutcome::Recorded);
        assert!(!handle.view().can_vote(1));
        assert!(handle.view().can_like(1));

        assert_eq!(
            handle.vote(1, 11).await.unwrap(),
            ActionOutcome::AlreadyRecorded
        );
    }

    #[tokio::test]
    async fn test_failed_like_not_recorded_and_retry_allowed() {
        let mut service = MockPollService::new();
        service.expect_list_polls().returning(|| Ok(vec![poll(1)]));
        let mut calls = 0;
        service.expect_like().times(2).returning(move |_| {
            calls += 1;
            if calls == 1 {
                Err(QuickPollError::Api {
                    status: 500,
                    body: "db locked".to_string(),
                })
            } else {
                Ok(())
            }
        });

        let (handle, _feed_tx, _task) = spawn_store(service);

        assert!(handle.like(1).await.is_err());
        let view = handle.view();
        assert!(view.can_like(1));
        assert!(view.pending.is_empty());

        assert_eq!(handle.like(1).await.unwrap(), ActionOutcome::Recorded);
        assert!(!handle.view().can_like(1));
    }

    #[tokio::test]
    async fn test_ledger_survives_later_events_and_resync() {
        let mut service = MockPollService::new();
        service.expect_list_polls().returning(|| Ok(vec![poll(1)]));
        service.expect_vote().returning(|_, _| Ok(()));

        let (handle, feed_tx, _task) = spawn_store(service);
        let mut rx = handle.subscribe();

        handle.vote(1, 10).await.unwrap();
        open(&feed_tx).await;
        feed_tx.send(vote(1, 10, 1)).await.unwrap();
        wait_for(&mut rx, |v| v.events_applied == 1).await;
        handle.resync().await.unwrap();

        assert!(!handle.view().can_vote(1));
    }

    /// Service whose vote calls block until released
    struct GatedService {
        gate: Arc<Notify>,
    }

    #[async_trait]
    impl PollService for GatedService {
        async fn list_polls(&self) -> Result<Vec<Poll>> {
            Ok(vec![poll(1)])
        }

        async fn create_poll(&self, _poll: &NewPoll) -> Result<()> {
            Ok(())
        }

        async fn vote(&self, _poll_id: PollId, _option_id: OptionId) -> Result<()> {
            self.gate.notified().await;
            Ok(())
        }

        async fn like(&self, _poll_id: PollId) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_duplicate_submit_while_in_flight() {
        let gate = Arc::new(Notify::new());
        let (handle, feed_tx, _task) = spawn_store(GatedService {
            gate: Arc::clone(&gate),
        });
        let mut rx = handle.subscribe();

        let first = {
            let handle = handle.clone();
            tokio::spawn(async move { handle.vote(1, 10).await })
        };
        wait_for(&mut rx, |v| !v.pending.is_empty()).await;
        assert!(!handle.view().can_vote(1));

        assert_eq!(handle.vote(1, 11).await.unwrap(), ActionOutcome::InFlight);

        // Connection drops while the vote is pending; the request still completes.
        open(&feed_tx).await;
        feed_tx
            .send(FeedMessage::Closed {
                reason: "network".to_string(),
            })
            .await
            .unwrap();
        wait_for(&mut rx, |v| {
            v.connection == ConnectionState::Closed && v.polls.len() == 1
        })
        .await;

        gate.notify_one();
        assert_eq!(first.await.unwrap().unwrap(), ActionOutcome::Recorded);
        assert!(handle.view().pending.is_empty());
    }

    #[tokio::test]
    async fn test_nothing_applied_after_shutdown() {
        let gate = Arc::new(Notify::new());
        let (handle, feed_tx, task) = spawn_store(GatedService {
            gate: Arc::clone(&gate),
        });
        let mut rx = handle.subscribe();

        open(&feed_tx).await;
        wait_for(&mut rx, |v| v.is_live() && v.polls.len() == 1).await;

        let pending_vote = {
            let handle = handle.clone();
            tokio::spawn(async move { handle.vote(1, 10).await })
        };
        wait_for(&mut rx, |v| !v.pending.is_empty()).await;

        handle.shutdown().await.unwrap();
        task.await.unwrap();
        let final_view = handle.view();

        // Late completion and late events find the store gone.
        gate.notify_one();
        assert!(matches!(
            pending_vote.await.unwrap(),
            Err(QuickPollError::Cancelled)
        ));
        assert!(feed_tx.send(vote(1, 10, 7)).await.is_err());

        assert!(matches!(
            handle.vote(1, 11).await,
            Err(QuickPollError::ChannelClosed(_))
        ));
        let view = handle.view();
        assert!(view.ledger.can_vote(1));
        assert_eq!(view.events_applied, final_view.events_applied);
    }

    #[tokio::test]
    async fn test_create_poll_validates_before_sending() {
        let mut service = MockPollService::new();
        service.expect_list_polls().returning(|| Ok(vec![]));
        service
            .expect_create_poll()
            .withf(|p| p.title == "Lunch?" && p.options == vec!["Pizza", "Tacos"])
            .times(1)
            .returning(|_| Ok(()));

        let (handle, _feed_tx, _task) = spawn_store(service);

        let err = handle.create_poll("Lunch?", &["Pizza", " "]).await.unwrap_err();
        assert!(matches!(err, QuickPollError::Validation(_)));

        handle
            .create_poll(" Lunch? ", &["Pizza", "", "Tacos"])
            .await
            .unwrap();
        // No local insert; the poll arrives through its live event.
        assert!(handle.view().polls.is_empty());
    }
}
