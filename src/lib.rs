pub mod adapters;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod service;
pub mod sync;

pub use adapters::{FeedMessage, PollApiClient, PollFeed};
pub use config::AppConfig;
pub use domain::{
    ActionKind, ActionLedger, ConnectionState, LiveEvent, NewPoll, Poll, PollCollection,
    PollOption,
};
pub use error::{QuickPollError, Result};
pub use service::PollService;
pub use sync::{ActionOutcome, LiveSession, PollStore, PollStoreHandle, PollView};
