//! Work queue, worker and the per-phrase state published to readers.

pub mod state;
pub mod state_map;
pub mod work_queue;

pub use state::{PhraseStatus, QueueState, StateEvent};
pub use state_map::{PhraseStateMap, StateSink};
pub use work_queue::{EnqueueOutcome, QueueSnapshot, WorkQueue};
