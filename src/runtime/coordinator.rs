//! Coordinator: owns the run lifecycle.
//!
//! Creates the semaphore set and the queue, spawns the configured number of
//! producer and consumer threads against one shared context, joins producers
//! first and consumers second, and aggregates every worker outcome into a
//! [`RunReport`]. The semaphore set and the queue storage are released when
//! the last context reference drops.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::SimConfig;
use crate::queue::JobQueue;
use crate::runtime::consumer::{self, ConsumerOutcome};
use crate::runtime::producer::{self, ProducerOutcome};
use crate::runtime::{COUNTERS, ITEM, MUTEX, SPACE, SharedContext};
use crate::sync::sem::{SemError, SemKey, SemSet};

/// Error starting a run.
#[derive(Debug, Error)]
pub enum CoordinatorError {
    /// A zero-capacity queue cannot back a ring.
    #[error("buffer capacity must be at least 1")]
    ZeroCapacity,
    /// The semaphore set could not be created; nothing was allocated.
    #[error("failed to create the semaphore set: {0}")]
    Create(#[source] SemError),
    /// A counter could not be initialized; the already-created set was torn
    /// down before this surfaced.
    #[error("failed to initialize the semaphore set: {0}")]
    Init(#[source] SemError),
}

impl CoordinatorError {
    /// The underlying semaphore error, if any.
    #[must_use]
    pub fn sem_error(&self) -> Option<&SemError> {
        match self {
            Self::ZeroCapacity => None,
            Self::Create(err) | Self::Init(err) => Some(err),
        }
    }
}

/// Aggregate of every worker outcome for one run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunReport {
    /// Jobs deposited across all producers.
    pub deposited: u64,
    /// Jobs fetched and fully executed across all consumers.
    pub executed: u64,
    /// Producers that ended on a `space` timeout.
    pub producer_timeouts: u32,
    /// Workers whose thread panicked. Their outstanding semaphore
    /// decrements were rolled back by the permit guards.
    pub panicked: u32,
}

/// Handle to a running simulation.
pub struct Coordinator {
    producers: Vec<JoinHandle<ProducerOutcome>>,
    consumers: Vec<JoinHandle<ConsumerOutcome>>,
}

impl Coordinator {
    /// Creates the shared state and spawns all workers.
    ///
    /// Counters start as `item = 0`, `space = capacity`, `mutex = 1`.
    /// Workers get 1-based ordinals and named threads (`producer-1`,
    /// `consumer-2`, ...).
    ///
    /// # Errors
    ///
    /// [`CoordinatorError::Create`] if the semaphore set cannot be
    /// allocated (e.g. the key is already in use);
    /// [`CoordinatorError::Init`] if a counter cannot be initialized.
    ///
    /// # Panics
    ///
    /// Panics if the OS refuses to spawn a thread.
    pub fn spawn(config: SimConfig) -> Result<Self, CoordinatorError> {
        if config.capacity == 0 {
            return Err(CoordinatorError::ZeroCapacity);
        }

        let sem =
            SemSet::create(SemKey(config.sem_key), COUNTERS).map_err(CoordinatorError::Create)?;

        // On an init error `sem` drops here, tearing the set down before the
        // error surfaces.
        sem.set_value(ITEM, 0).map_err(CoordinatorError::Init)?;
        sem.set_value(SPACE, config.capacity as u64)
            .map_err(CoordinatorError::Init)?;
        sem.set_value(MUTEX, 1).map_err(CoordinatorError::Init)?;

        let ctx = Arc::new(SharedContext {
            sem,
            queue: JobQueue::new(config.capacity),
            timing: config.timing,
        });

        info!(
            capacity = config.capacity,
            jobs_per_producer = config.jobs_per_producer,
            producers = config.producers,
            consumers = config.consumers,
            key = %ctx.sem.key(),
            "run starting"
        );

        let producers = (1..=config.producers)
            .map(|id| {
                let ctx = Arc::clone(&ctx);
                let quota = config.jobs_per_producer;
                debug!(producer = id, "spawning producer");
                thread::Builder::new()
                    .name(format!("producer-{id}"))
                    .spawn(move || producer::run(id, quota, &ctx))
                    .expect("failed to spawn producer thread")
            })
            .collect();

        let consumers = (1..=config.consumers)
            .map(|id| {
                let ctx = Arc::clone(&ctx);
                debug!(consumer = id, "spawning consumer");
                thread::Builder::new()
                    .name(format!("consumer-{id}"))
                    .spawn(move || consumer::run(id, &ctx))
                    .expect("failed to spawn consumer thread")
            })
            .collect();

        Ok(Self {
            producers,
            consumers,
        })
    }

    /// Joins all producers, then all consumers, and aggregates the outcomes.
    #[must_use]
    pub fn join(self) -> RunReport {
        let mut report = RunReport::default();

        for handle in self.producers {
            match handle.join() {
                Ok(outcome) => {
                    report.deposited += u64::from(outcome.deposited);
                    report.producer_timeouts += u32::from(outcome.timed_out);
                }
                Err(_) => {
                    warn!("producer thread panicked");
                    report.panicked += 1;
                }
            }
        }

        for handle in self.consumers {
            match handle.join() {
                Ok(outcome) => report.executed += u64::from(outcome.executed),
                Err(_) => {
                    warn!("consumer thread panicked");
                    report.panicked += 1;
                }
            }
        }

        info!(
            deposited = report.deposited,
            executed = report.executed,
            producer_timeouts = report.producer_timeouts,
            panicked = report.panicked,
            "run complete"
        );
        report
    }

    /// Convenience wrapper: spawn the workers and block until they finish.
    ///
    /// # Errors
    ///
    /// Same as [`Coordinator::spawn`].
    pub fn run(config: SimConfig) -> Result<RunReport, CoordinatorError> {
        Ok(Self::spawn(config)?.join())
    }
}
