//! Live event reconciliation
//!
//! Folds one `LiveEvent` into a `PollCollection`. Every event carries absolute
//! counts, so applying the same event twice leaves the collection as applying
//! it once. Events that reference a poll or option the collection does not
//! know are dropped; the next snapshot load heals any gap.
//!
//! Two updates for the same option delivered out of order leave whichever
//! value was applied last. The wire format has no per-entity sequence number,
//! so this cannot be detected here.

use tracing::debug;

use crate::domain::{LiveEvent, OptionId, PollCollection, PollId};

/// What applying one event did to the collection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// New poll prepended
    Inserted,
    /// Poll with the same id was already present and has been replaced at the head
    Replaced,
    /// A counter was set to the carried value
    Updated,
    /// Poll id not present locally
    UnknownPoll(PollId),
    /// Poll present, option id not part of it
    UnknownOption(PollId, OptionId),
}

/// Apply `event` to `collection` in place.
pub fn apply_in_place(collection: &mut PollCollection, event: &LiveEvent) -> Applied {
    match event {
        LiveEvent::PollCreated { poll } => {
            if collection.prepend_unique(poll.clone()) {
                debug!(poll_id = poll.id, "duplicate poll_created; replaced existing entry");
                Applied::Replaced
            } else {
                Applied::Inserted
            }
        }
        LiveEvent::VoteUpdated {
            poll_id,
            option_id,
            votes,
        } => {
            let Some(poll) = collection.get_mut(*poll_id) else {
                return Applied::UnknownPoll(*poll_id);
            };
            let Some(option) = poll.option_mut(*option_id) else {
                return Applied::UnknownOption(*poll_id, *option_id);
            };
            option.votes = *votes;
            Applied::Updated
        }
        LiveEvent::LikeUpdated { poll_id, likes } => {
            let Some(poll) = collection.get_mut(*poll_id) else {
                return Applied::UnknownPoll(*poll_id);
            };
            poll.likes = *likes;
            Applied::Updated
        }
    }
}

/// Pure form: return the collection that results from applying `event` to `current`.
pub fn apply_event(current: &PollCollection, event: &LiveEvent) -> PollCollection {
    let mut next = current.clone();
    apply_in_place(&mut next, event);
    next
}
