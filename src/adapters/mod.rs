pub mod poll_api;
pub mod poll_ws;

pub use poll_api::PollApiClient;
pub use poll_ws::{FeedMessage, PollFeed};
