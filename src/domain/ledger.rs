use std::collections::BTreeSet;

use super::poll::PollId;

/// One-time actions a viewer may take on a poll
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ActionKind {
    Vote,
    Like,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Vote => "vote",
            ActionKind::Like => "like",
        }
    }
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Per-session record of confirmed votes and likes.
///
/// Entries are only ever added: once a poll id is recorded for an action it
/// stays recorded for the rest of the session. Nothing here is persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionLedger {
    voted: BTreeSet<PollId>,
    liked: BTreeSet<PollId>,
}

impl ActionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn can_vote(&self, poll_id: PollId) -> bool {
        !self.voted.contains(&poll_id)
    }

    pub fn can_like(&self, poll_id: PollId) -> bool {
        !self.liked.contains(&poll_id)
    }

    /// Call only after the service confirmed the vote.
    pub fn record_vote(&mut self, poll_id: PollId) {
        self.voted.insert(poll_id);
    }

    /// Call only after the service confirmed the like.
    pub fn record_like(&mut self, poll_id: PollId) {
        self.liked.insert(poll_id);
    }

    pub fn can(&self, kind: ActionKind, poll_id: PollId) -> bool {
        match kind {
            ActionKind::Vote => self.can_vote(poll_id),
            ActionKind::Like => self.can_like(poll_id),
        }
    }

    pub fn record(&mut self, kind: ActionKind, poll_id: PollId) {
        match kind {
            ActionKind::Vote => self.record_vote(poll_id),
            ActionKind::Like => self.record_like(poll_id),
        }
    }
}
