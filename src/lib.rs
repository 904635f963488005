//! Bounded-buffer producer/consumer core.
//!
//! A fixed-capacity circular queue of jobs is shared by any number of
//! producer and consumer threads, coordinated by three counters under one
//! semaphore set:
//!
//! - `item`: filled slots (consumers wait on it)
//! - `space`: free slots (producers wait on it)
//! - `mutex`: binary lock serializing queue access
//!
//! Producers generate jobs with randomized service durations and deposit
//! them; consumers fetch jobs and simulate execution by sleeping. Workers
//! terminate themselves via a timed wait: a producer that cannot reserve a
//! slot within the deadline abandons its remaining quota, and a consumer
//! that sees no item within the deadline assumes the run is over.
//!
//! The [`runtime::Coordinator`] owns the lifecycle: it creates the semaphore
//! set and queue, spawns the workers against a shared context, joins them,
//! and aggregates their outcomes into a [`runtime::RunReport`].

pub mod config;
pub mod job;
pub mod queue;
pub mod runtime;
pub mod sync;
pub mod trace;

pub use trace::init_tracing;
