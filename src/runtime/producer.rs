//! Producer worker: generates jobs and deposits them into the shared queue.

use std::thread;

use tracing::info;

use crate::job::{Job, random_span};
use crate::runtime::{ITEM, MUTEX, SPACE, SharedContext};

/// What a producer accomplished before its loop ended.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ProducerOutcome {
    /// Jobs successfully deposited.
    pub deposited: u32,
    /// Whether the loop ended on a `space` timeout instead of exhausting
    /// its quota.
    pub timed_out: bool,
}

/// Runs one producer loop to completion.
///
/// `id` is the worker's 1-based ordinal, `quota` the number of jobs to
/// attempt. The loop sleeps for a randomized inter-arrival delay before each
/// attempt, then reserves a slot with a timed wait on `space`; a timeout
/// abandons the remaining quota.
pub fn run(id: u32, quota: u32, ctx: &SharedContext) -> ProducerOutcome {
    let timing = &ctx.timing;
    let mut outcome = ProducerOutcome::default();

    for _ in 0..quota {
        let (dur_min, dur_span) = timing.duration_range;
        let duration = random_span(dur_min, dur_span);

        // The inter-arrival delay happens unconditionally, before any
        // resource acquisition.
        let (delay_min, delay_span) = timing.delay_range;
        thread::sleep(timing.scale(random_span(delay_min, delay_span)));

        let Ok(space) = ctx.sem.timed_wait(SPACE, timing.wait_timeout) else {
            outcome.timed_out = true;
            info!(producer = id, "terminated due to a timeout");
            break;
        };

        let mutex = ctx.sem.wait(MUTEX);
        // SAFETY: the mutex permit serializes queue access, and the space
        // permit reserved the slot being written. The id is read under the
        // same mutex hold as the deposit, so no other producer can advance
        // the tail in between.
        let job = unsafe {
            let job = Job::new(ctx.queue.tail_index() as u32 + 1, duration);
            ctx.queue.deposit(job);
            job
        };
        mutex.release();

        // The reserved free slot is now a filled one: the space decrement
        // becomes permanent and `item` picks it up.
        space.forget();
        ctx.sem.signal(ITEM);

        outcome.deposited += 1;
        info!(
            producer = id,
            job = job.id,
            duration = job.duration,
            "job deposited"
        );
    }

    if !outcome.timed_out {
        info!(producer = id, "no more jobs to generate");
    }
    outcome
}
