//! Tracing subscriber setup.
//!
//! Levels used by the driver:
//! - INFO: session on/off, rendezvous results, send completion
//! - DEBUG: strobes, acks, dispatch decisions, duty-cycle phases
//! - TRACE: raw frames as bit strings

use tracing_subscriber::EnvFilter;

/// Installs a fmt subscriber filtered by `RUST_LOG`, defaulting to `info`
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Test variant: captured output, safe to call more than once
pub fn init_for_tests() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}
