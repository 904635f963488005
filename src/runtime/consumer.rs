//! Consumer worker: fetches jobs and simulates their execution.

use std::thread;

use tracing::info;

use crate::runtime::{ITEM, MUTEX, SPACE, SharedContext};

/// What a consumer accomplished before its loop ended.
///
/// Consumers have no quota; the loop only ends when the timed wait on
/// `item` expires.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ConsumerOutcome {
    /// Jobs fetched and fully executed.
    pub executed: u32,
}

/// Runs one consumer loop until the `item` wait times out.
///
/// `id` is the worker's 1-based ordinal. Execution is simulated by sleeping
/// for the job's duration; no real work is performed.
pub fn run(id: u32, ctx: &SharedContext) -> ConsumerOutcome {
    let timing = &ctx.timing;
    let mut outcome = ConsumerOutcome::default();

    while let Ok(item) = ctx.sem.timed_wait(ITEM, timing.wait_timeout) {
        let mutex = ctx.sem.wait(MUTEX);
        // SAFETY: the mutex permit serializes queue access, and the item
        // permit guarantees the slot at the head was filled by a deposit.
        let job = unsafe { ctx.queue.fetch() };
        mutex.release();

        // The vacated slot goes back to `space`.
        item.forget();
        ctx.sem.signal(SPACE);

        info!(
            consumer = id,
            job = job.id,
            duration = job.duration,
            "job executing"
        );
        thread::sleep(timing.scale(job.duration));
        outcome.executed += 1;
        info!(consumer = id, job = job.id, "job completed");
    }

    info!(consumer = id, "no more jobs left");
    outcome
}
