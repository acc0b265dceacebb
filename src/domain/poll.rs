use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::{QuickPollError, Result};

/// Server-assigned poll identity
pub type PollId = i64;

/// Option identity, unique only within its parent poll
pub type OptionId = i64;

/// One answer of a poll with its server-side tally
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollOption {
    pub id: OptionId,
    pub option_text: String,
    #[serde(default)]
    pub votes: u64,
}

/// A poll as broadcast by the collaborator service.
///
/// `title`, `created_at` and the option list are fixed at creation; only
/// `likes` and the per-option `votes` change afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Poll {
    pub id: PollId,
    pub title: String,
    #[serde(with = "flexible_timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub likes: u64,
    pub options: Vec<PollOption>,
}

impl Poll {
    /// Look up an option by its id
    pub fn option(&self, option_id: OptionId) -> Option<&PollOption> {
        self.options.iter().find(|o| o.id == option_id)
    }

    pub(crate) fn option_mut(&mut self, option_id: OptionId) -> Option<&mut PollOption> {
        self.options.iter_mut().find(|o| o.id == option_id)
    }

    /// Sum of votes across all options, saturating at `u64::MAX`
    pub fn total_votes(&self) -> u64 {
        self.options
            .iter()
            .fold(0u64, |total, o| total.saturating_add(o.votes))
    }

    /// Share of `votes` in this poll's total, rounded half-up to a whole percent.
    ///
    /// Returns 0 for a poll nobody has voted on yet and never more than 100.
    pub fn vote_percentage(&self, votes: u64) -> u64 {
        let total = u128::from(self.total_votes());
        if total == 0 {
            return 0;
        }
        let pct = (u128::from(votes) * 200 + total) / (2 * total);
        pct.min(100) as u64
    }
}

/// Ordered poll collection, newest-created first.
///
/// Never holds two polls with the same id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PollCollection {
    polls: Vec<Poll>,
}

impl PollCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a collection from a listing response.
    ///
    /// The service lists polls in storage order, so the result is re-sorted
    /// newest first (ties broken by the higher id) and later duplicates of an
    /// id are discarded.
    pub fn from_snapshot(polls: Vec<Poll>) -> Self {
        let mut seen = HashSet::with_capacity(polls.len());
        let mut polls: Vec<Poll> = polls.into_iter().filter(|p| seen.insert(p.id)).collect();
        polls.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Self { polls }
    }

    pub fn get(&self, poll_id: PollId) -> Option<&Poll> {
        self.polls.iter().find(|p| p.id == poll_id)
    }

    pub(crate) fn get_mut(&mut self, poll_id: PollId) -> Option<&mut Poll> {
        self.polls.iter_mut().find(|p| p.id == poll_id)
    }

    /// Insert `poll` at the head, dropping any older entry with the same id.
    ///
    /// Returns `true` when an existing entry was replaced.
    pub(crate) fn prepend_unique(&mut self, poll: Poll) -> bool {
        let before = self.polls.len();
        self.polls.retain(|p| p.id != poll.id);
        let replaced = self.polls.len() != before;
        self.polls.insert(0, poll);
        replaced
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Poll> {
        self.polls.iter()
    }

    pub fn ids(&self) -> Vec<PollId> {
        self.polls.iter().map(|p| p.id).collect()
    }

    pub fn len(&self) -> usize {
        self.polls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.polls.is_empty()
    }
}

impl<'a> IntoIterator for &'a PollCollection {
    type Item = &'a Poll;
    type IntoIter = std::slice::Iter<'a, Poll>;

    fn into_iter(self) -> Self::IntoIter {
        self.polls.iter()
    }
}

/// Minimum number of non-empty options a new poll needs
pub const MIN_POLL_OPTIONS: usize = 2;

/// Validated body of a poll creation request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewPoll {
    pub title: String,
    pub options: Vec<String>,
}

impl NewPoll {
    /// Trim the title and options, discard blank options, and require a title
    /// plus at least two options.
    pub fn new<S: AsRef<str>>(title: &str, options: &[S]) -> Result<Self> {
        let title = title.trim();
        let options: Vec<String> = options
            .iter()
            .map(|o| o.as_ref().trim())
            .filter(|o| !o.is_empty())
            .map(str::to_string)
            .collect();

        if title.is_empty() || options.len() < MIN_POLL_OPTIONS {
            return Err(QuickPollError::Validation(
                "Please provide a title and at least 2 options".to_string(),
            ));
        }

        Ok(Self {
            title: title.to_string(),
            options,
        })
    }
}

/// Timestamps arrive either as RFC 3339 or as naive ISO-8601 (UTC implied).
pub(crate) mod flexible_timestamp {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

    pub fn serialize<S>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&ts.to_rfc3339())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).map_err(serde::de::Error::custom)
    }

    pub fn parse(raw: &str) -> Result<DateTime<Utc>, String> {
        let raw = raw.trim();
        if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
            return Ok(ts.with_timezone(&Utc));
        }
        for fmt in NAIVE_FORMATS {
            if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
                return Ok(naive.and_utc());
            }
        }
        Err(format!("invalid timestamp: {}", raw))
    }
}
