//! End-to-end producer/consumer runs at millisecond scale.
//!
//! Every scenario uses its own semaphore key: the key registry is
//! process-wide and the test harness runs tests in parallel. Assertions
//! never rely on cross-worker ordering, only on aggregate outcomes.
//!
//! Run with log output:
//! ```sh
//! RUST_LOG=conveyor=debug cargo test --test producer_consumer -- --nocapture
//! ```

use std::sync::Once;
use std::time::{Duration, Instant};

use conveyor::config::{SimConfig, Timing};
use conveyor::runtime::Coordinator;

static INIT_TRACING: Once = Once::new();

fn init() {
    INIT_TRACING.call_once(conveyor::init_tracing);
}

/// Millisecond-scale timing so scenarios finish quickly.
fn fast_timing() -> Timing {
    Timing {
        wait_timeout: Duration::from_millis(250),
        duration_range: (1, 3),
        delay_range: (1, 2),
        time_unit: Duration::from_millis(5),
    }
}

fn scenario(capacity: usize, jobs: u32, producers: u32, consumers: u32, key: u32) -> SimConfig {
    SimConfig {
        capacity,
        jobs_per_producer: jobs,
        producers,
        consumers,
        sem_key: key,
        timing: fast_timing(),
    }
}

#[test]
fn single_pair_drains_every_job_then_consumer_times_out() {
    init();
    let config = scenario(2, 3, 1, 1, 0xA101);

    let start = Instant::now();
    let report = Coordinator::run(config).unwrap();
    let elapsed = start.elapsed();

    assert_eq!(report.deposited, 3, "producer exhausts its quota");
    assert_eq!(report.producer_timeouts, 0, "producer never times out");
    assert_eq!(report.executed, 3, "consumer drains every deposit");
    assert_eq!(report.panicked, 0);

    // The consumer only exits via its timed wait, so the run lasts at least
    // one timeout beyond the last job.
    assert!(elapsed >= config.timing.wait_timeout);
}

#[test]
fn producers_contending_without_consumers_time_out() {
    init();
    // One slot, two single-job producers, nobody to free the slot: one
    // deposit succeeds, the other producer blocks and times out.
    let config = scenario(1, 1, 2, 0, 0xA102);

    let report = Coordinator::run(config).unwrap();

    assert_eq!(report.deposited, 1);
    assert_eq!(report.producer_timeouts, 1);
    assert_eq!(report.executed, 0);
    assert_eq!(report.panicked, 0);
}

#[test]
fn many_workers_conserve_every_job() {
    init();
    // Stress the counter protocol: every deposited job is executed exactly
    // once. The queue's debug single-writer assertion is armed throughout.
    let config = scenario(8, 6, 4, 4, 0xA103);

    let report = Coordinator::run(config).unwrap();

    assert_eq!(report.producer_timeouts, 0, "consumers keep up with producers");
    assert_eq!(report.deposited, 24, "4 producers x 6 jobs");
    assert_eq!(report.executed, report.deposited, "no lost or duplicated jobs");
    assert_eq!(report.panicked, 0);
}

#[test]
fn tiny_buffer_still_conserves_jobs() {
    init();
    // Capacity 1 forces full serialization through the space/item handoff.
    let config = scenario(1, 4, 2, 2, 0xA104);

    let report = Coordinator::run(config).unwrap();

    assert_eq!(report.deposited, 8);
    assert_eq!(report.executed, 8);
    assert_eq!(report.producer_timeouts, 0);
    assert_eq!(report.panicked, 0);
}

#[test]
fn consumers_without_producers_time_out_after_the_deadline() {
    init();
    let config = scenario(2, 1, 0, 2, 0xA105);

    let start = Instant::now();
    let report = Coordinator::run(config).unwrap();
    let elapsed = start.elapsed();

    assert_eq!(report.deposited, 0);
    assert_eq!(report.executed, 0);
    assert!(elapsed >= config.timing.wait_timeout);
}

#[test]
fn back_to_back_runs_can_reuse_the_key() {
    init();
    let config = scenario(2, 2, 1, 1, 0xA106);

    let first = Coordinator::run(config).unwrap();
    assert_eq!(first.deposited, 2);

    // The first run released its set on teardown, so the same key works.
    let second = Coordinator::run(config).unwrap();
    assert_eq!(second.deposited, 2);
}
