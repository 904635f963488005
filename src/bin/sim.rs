//! Bounded-buffer simulation binary.
//!
//! # Usage
//!
//! ```sh
//! sim <capacity> <jobs-per-producer> <producers> <consumers>
//! ```
//!
//! All four arguments are positive integers. The run ends once every
//! producer has exhausted its quota (or timed out waiting for space) and
//! every consumer has timed out waiting for items.

use std::process::ExitCode;

use conveyor::config::SimConfig;
use conveyor::runtime::{Coordinator, CoordinatorError};
use conveyor::sync::sem::SemError;

/// Wrong number of command line arguments.
const EXIT_BAD_ARG_COUNT: u8 = 2;
/// An argument was not a positive integer.
const EXIT_BAD_ARG_VALUE: u8 = 3;
/// The semaphore set could not be created.
const EXIT_SEM_CREATE: u8 = 4;
/// A semaphore counter could not be initialized.
const EXIT_SEM_INIT: u8 = 5;

fn main() -> ExitCode {
    conveyor::init_tracing();

    let args: Vec<String> = std::env::args().collect();
    let config = match parse_args(&args) {
        Ok(config) => config,
        Err(code) => return code,
    };

    match Coordinator::run(config) {
        Ok(report) => {
            println!(
                "deposited {} job(s), executed {} job(s), {} producer timeout(s)",
                report.deposited, report.executed, report.producer_timeouts
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("sim: {err}");
            diagnose(&err)
        }
    }
}

/// Parses the four positional integers, printing its own diagnostics.
fn parse_args(args: &[String]) -> Result<SimConfig, ExitCode> {
    if args.len() != 5 {
        eprintln!("sim: expected 4 arguments, got {}", args.len() - 1);
        print_usage();
        return Err(ExitCode::from(EXIT_BAD_ARG_COUNT));
    }

    let mut values = [0u64; 4];
    for (slot, (position, arg)) in values.iter_mut().zip(args.iter().enumerate().skip(1)) {
        *slot = match arg.parse::<u64>() {
            Ok(value) if value > 0 => value,
            _ => {
                eprintln!("sim: argument {position} ({arg:?}) is not a positive integer");
                print_usage();
                return Err(ExitCode::from(EXIT_BAD_ARG_VALUE));
            }
        };
    }

    let [capacity, jobs, producers, consumers] = values;
    Ok(SimConfig::new(
        capacity as usize,
        jobs as u32,
        producers as u32,
        consumers as u32,
    ))
}

/// Prints a kind-specific diagnostic and picks the exit status.
fn diagnose(err: &CoordinatorError) -> ExitCode {
    if let Some(sem_err) = err.sem_error() {
        match sem_err {
            SemError::Exists(key) => {
                eprintln!(
                    "sim: a semaphore set for key {key} is still live; \
                     another run may be using it, or a previous run did not \
                     release it. Rerun once it exits, or configure a \
                     different key."
                );
            }
            SemError::Limit { requested, limit } => {
                eprintln!(
                    "sim: {requested} counters exceed the per-set limit of {limit}"
                );
            }
            SemError::Access(key) => {
                eprintln!("sim: access to the semaphore set for key {key} was denied");
            }
            SemError::InvalidIndex { index, count } => {
                eprintln!("sim: counter index {index} is outside the set of {count}");
            }
        }
    }

    match err {
        CoordinatorError::ZeroCapacity => ExitCode::from(EXIT_BAD_ARG_VALUE),
        CoordinatorError::Create(_) => ExitCode::from(EXIT_SEM_CREATE),
        CoordinatorError::Init(_) => ExitCode::from(EXIT_SEM_INIT),
    }
}

fn print_usage() {
    eprintln!(
        r#"sim - bounded-buffer producer/consumer simulation

USAGE:
    sim <capacity> <jobs-per-producer> <producers> <consumers>

ARGUMENTS:
    capacity             Number of slots in the circular queue
    jobs-per-producer    Jobs each producer attempts to deposit
    producers            Number of producer threads
    consumers            Number of consumer threads

All arguments must be positive integers.

EXAMPLE:
    sim 5 6 2 3
"#
    );
}
