//! Logging system initialization
//!
//! Console logging via `tracing`, with the level controlled by `RUST_LOG`
//! (default `info`). Each binary calls [`init_logging`] once before doing
//! any work.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber for this process.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}
