//! Job records and randomized service parameters.

use rand::Rng;

/// Unit of simulated work.
///
/// Created by a producer at deposit time and discarded once a consumer has
/// finished simulating it. The id is assigned from the queue's tail index at
/// insertion, so ids repeat when the buffer wraps; they are not globally
/// unique across producers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Job {
    /// Slot-derived identifier (`tail + 1` at deposit time).
    pub id: u32,
    /// Service time in simulated time units.
    pub duration: u64,
}

impl Job {
    #[must_use]
    pub const fn new(id: u32, duration: u64) -> Self {
        Self { id, duration }
    }
}

/// Uniform random integer in `[min, min + span)`.
///
/// `random_span(1, 10)` yields a value in `1..=10`, the model used for both
/// service durations and inter-arrival delays. Uses the thread-local
/// generator, which the OS seeds on first use.
#[must_use]
pub fn random_span(min: u64, span: u64) -> u64 {
    rand::rng().random_range(min..min + span)
}
