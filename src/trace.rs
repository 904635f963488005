//! Tracing setup for the sim binary and tests.

/// Installs the global tracing subscriber with timestamps.
///
/// Call once at the start of the binary or a test process. The filter comes
/// from `RUST_LOG`, defaulting to `conveyor=info`.
///
/// # Panics
///
/// Panics if a global subscriber is already installed.
pub fn init_tracing() {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("conveyor=info"));

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .with_thread_names(true)
                .with_timer(fmt::time::uptime()),
        )
        .with(filter)
        .init();
}
