use serde::{Deserialize, Serialize};

use super::poll::{OptionId, Poll, PollId};
use crate::error::{QuickPollError, Result};

/// Incremental change pushed over the live connection.
///
/// Counts are always absolute values, never deltas.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LiveEvent {
    PollCreated {
        poll: Poll,
    },
    VoteUpdated {
        poll_id: PollId,
        option_id: OptionId,
        votes: u64,
    },
    LikeUpdated {
        poll_id: PollId,
        likes: u64,
    },
}

impl LiveEvent {
    /// Decode one text frame from the live stream.
    ///
    /// Unknown `type` tags and payloads missing fields are reported as
    /// `MalformedEvent`; callers drop them.
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| QuickPollError::MalformedEvent(e.to_string()))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            LiveEvent::PollCreated { .. } => "poll_created",
            LiveEvent::VoteUpdated { .. } => "vote_updated",
            LiveEvent::LikeUpdated { .. } => "like_updated",
        }
    }

    /// Poll this event refers to
    pub fn poll_id(&self) -> PollId {
        match self {
            LiveEvent::PollCreated { poll } => poll.id,
            LiveEvent::VoteUpdated { poll_id, .. } | LiveEvent::LikeUpdated { poll_id, .. } => {
                *poll_id
            }
        }
    }
}

impl std::fmt::Display for LiveEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LiveEvent::PollCreated { poll } => write!(f, "poll_created(poll={})", poll.id),
            LiveEvent::VoteUpdated {
                poll_id,
                option_id,
                votes,
            } => write!(
                f,
                "vote_updated(poll={}, option={}, votes={})",
                poll_id, option_id, votes
            ),
            LiveEvent::LikeUpdated { poll_id, likes } => {
                write!(f, "like_updated(poll={}, likes={})", poll_id, likes)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_each_kind() {
        let created = LiveEvent::from_json(
            r#"{"type":"poll_created","poll":{"id":7,"title":"Tabs or spaces?",
                "created_at":"2024-05-01T09:00:00","likes":0,
                "options":[{"id":1,"option_text":"Tabs","votes":0},
                           {"id":2,"option_text":"Spaces","votes":0}]}}"#,
        )
        .unwrap();
        assert_eq!(created.kind(), "poll_created");
        assert_eq!(created.poll_id(), 7);

        let vote =
            LiveEvent::from_json(r#"{"type":"vote_updated","poll_id":7,"option_id":2,"votes":12}"#)
                .unwrap();
        assert_eq!(
            vote,
            LiveEvent::VoteUpdated {
                poll_id: 7,
                option_id: 2,
                votes: 12
            }
        );

        let like =
            LiveEvent::from_json(r#"{"likes":3,"poll_id":7,"type":"like_updated"}"#).unwrap();
        assert_eq!(
            like,
            LiveEvent::LikeUpdated {
                poll_id: 7,
                likes: 3,
            }
        );
        assert_eq!(like.to_string(), "like_updated(poll=7, likes=3)");
    }

    #[test]
    fn test_malformed_frames_rejected() {
        let cases = [
            "not json",
            r#"{"type":"poll_deleted","poll_id":1}"#,
            r#"{"type":"vote_updated","poll_id":1,"votes":3}"#,
            r#"{"type":"like_updated","poll_id":1,"likes":-4}"#,
            r#"{"poll_id":1,"likes":4}"#,
        ];

        for raw in cases {
            let err = LiveEvent::from_json(raw).expect_err(raw);
            assert!(
                matches!(err, QuickPollError::MalformedEvent(_)),
                "expected MalformedEvent for {raw}, got {err:?}"
            );
        }
    }
}
