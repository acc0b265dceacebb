use async_trait::async_trait;

use crate::domain::{NewPoll, OptionId, Poll, PollId};
use crate::error::Result;

/// Request/response surface of the collaborator poll service.
///
/// Action calls only report success or failure; the resulting counts arrive
/// later as live events.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PollService: Send + Sync {
    /// `GET /polls/`
    async fn list_polls(&self) -> Result<Vec<Poll>>;

    /// `POST /polls/`
    async fn create_poll(&self, poll: &NewPoll) -> Result<()>;

    /// `POST /polls/{poll_id}/vote/{option_id}`
    async fn vote(&self, poll_id: PollId, option_id: OptionId) -> Result<()>;

    /// `POST /polls/{poll_id}/like`
    async fn like(&self, poll_id: PollId) -> Result<()>;
}
