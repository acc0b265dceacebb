//! Client-side synchronization of the live poll list
//!
//! - `snapshot`: one-shot full load
//! - `reconciler`: pure application of live events
//! - `lifecycle`: connection state tracking
//! - `store`: the actor that owns all of it
//! - `session`: store + live feed wiring and teardown

pub mod lifecycle;
pub mod reconciler;
pub mod session;
pub mod snapshot;
pub mod store;

pub use lifecycle::ConnectionLifecycle;
pub use reconciler::{apply_event, apply_in_place, Applied};
pub use session::LiveSession;
pub use snapshot::load_snapshot;
pub use store::{Action, ActionOutcome, PollStore, PollStoreHandle, PollView};
