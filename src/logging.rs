//! Tracing setup for embedders that want the engine's structured logs.
//!
//! The engine itself only emits events through `tracing`; installing a
//! subscriber is up to the host process. This helper wires up a sensible
//! default for tests and examples.

use tracing_subscriber::EnvFilter;

/// Initializes a global `tracing` subscriber honoring `RUST_LOG`.
///
/// Falls back to `info` when no filter is set in the environment. Calling
/// this more than once is harmless; later calls are ignored.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}
