//! Worker runtimes and the coordinator driving a run.
//!
//! - `producer`: generates jobs and deposits them into the shared queue.
//! - `consumer`: fetches jobs and simulates their execution.
//! - `coordinator`: creates shared state, spawns the workers, joins them.

pub mod consumer;
pub mod coordinator;
pub mod producer;

pub use coordinator::{Coordinator, CoordinatorError, RunReport};

use crate::config::Timing;
use crate::queue::JobQueue;
use crate::sync::sem::SemSet;

/// Index of the `item` counter (filled slots, consumers wait on it).
pub const ITEM: usize = 0;
/// Index of the `space` counter (free slots, producers wait on it).
pub const SPACE: usize = 1;
/// Index of the `mutex` counter (binary lock serializing queue access).
pub const MUTEX: usize = 2;

/// Number of counters in the run's semaphore set.
pub const COUNTERS: usize = 3;

/// Shared state handed to every worker at spawn time.
///
/// The queue and the semaphore set are the only state workers share; passing
/// the context explicitly (rather than through process globals) keeps
/// ownership visible and lets tests inject their own.
pub struct SharedContext {
    pub sem: SemSet,
    pub queue: JobQueue,
    pub timing: Timing,
}
