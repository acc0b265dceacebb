pub mod event;
pub mod ledger;
pub mod poll;
pub mod state;

pub use event::*;
pub use ledger::*;
pub use poll::*;
pub use state::*;
