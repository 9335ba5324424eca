//! Telemetry helpers for structured logging.

/// Install a default `tracing` subscriber if none is set yet.
///
/// Filtering follows `RUST_LOG` (for example `RUST_LOG=threadkit=debug`).
/// Applications that install their own subscriber can skip this.
pub fn init_tracing() {
    if tracing::dispatcher::has_been_set() {
        return;
    }
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_thread_names(true)
        .try_init();
}
