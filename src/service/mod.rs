mod traits;

#[cfg(test)]
pub use traits::MockPollService;
pub use traits::PollService;
