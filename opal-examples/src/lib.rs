//! Shared pieces of the example tuning runs.
//!
//! - [`trunk`] declares a synthetic trust-region solver and runs it on
//!   named test problems.
//! - [`probe`] is a small coordinate search standing in for an external
//!   black-box solver.

pub mod probe;
pub mod trunk;

use tracing_subscriber::EnvFilter;

/// Installs a formatting subscriber filtered by `RUST_LOG`, `info` by default.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
