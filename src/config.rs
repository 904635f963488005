//! Run configuration and timing knobs.
//!
//! All the fixed numbers of the simulation (the 20-second worker timeout,
//! the 1–10 service-duration range, the 1–5 inter-arrival delay range) live
//! here as named defaults so tests can substitute millisecond-scale values.

use std::time::Duration;

/// How long a worker's timed wait blocks before it gives up.
pub const WAIT_TIMEOUT: Duration = Duration::from_secs(20);

/// Service-duration range as `(min, span)`: durations fall in `[min, min + span)`.
pub const DURATION_RANGE: (u64, u64) = (1, 10);

/// Inter-arrival delay range as `(min, span)`: delays fall in `[min, min + span)`.
pub const DELAY_RANGE: (u64, u64) = (1, 5);

/// Wall-clock length of one simulated time unit.
pub const TIME_UNIT: Duration = Duration::from_secs(1);

/// Identifying key for the semaphore set when none is configured.
pub const DEFAULT_SEM_KEY: u32 = 0x5E4D;

/// Timing parameters shared by every worker in a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    /// Deadline for both the producer's `space` wait and the consumer's
    /// `item` wait.
    pub wait_timeout: Duration,
    /// `(min, span)` for randomized job service durations, in time units.
    pub duration_range: (u64, u64),
    /// `(min, span)` for randomized producer inter-arrival delays, in time
    /// units.
    pub delay_range: (u64, u64),
    /// Wall-clock length of one time unit. Sleeps are `time_unit * units`.
    pub time_unit: Duration,
}

impl Timing {
    /// Converts simulated time units into wall-clock time.
    #[must_use]
    pub fn scale(&self, units: u64) -> Duration {
        self.time_unit
            .saturating_mul(u32::try_from(units).unwrap_or(u32::MAX))
    }
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            wait_timeout: WAIT_TIMEOUT,
            duration_range: DURATION_RANGE,
            delay_range: DELAY_RANGE,
            time_unit: TIME_UNIT,
        }
    }
}

/// Configuration for one simulation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimConfig {
    /// Number of slots in the circular queue.
    pub capacity: usize,
    /// How many jobs each producer attempts to deposit.
    pub jobs_per_producer: u32,
    /// Number of producer threads.
    pub producers: u32,
    /// Number of consumer threads.
    pub consumers: u32,
    /// Identifying key for the run's semaphore set.
    pub sem_key: u32,
    /// Timing parameters handed to every worker.
    pub timing: Timing,
}

impl SimConfig {
    /// Builds a configuration with default key and timing.
    #[must_use]
    pub fn new(capacity: usize, jobs_per_producer: u32, producers: u32, consumers: u32) -> Self {
        Self {
            capacity,
            jobs_per_producer,
            producers,
            consumers,
            sem_key: DEFAULT_SEM_KEY,
            timing: Timing::default(),
        }
    }
}
