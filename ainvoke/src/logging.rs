//! Diagnostic tracing for the CLI.
//!
//! Diagnostics go to stderr and are controlled by `RUST_LOG`. Stdout stays
//! reserved for the agent's output JSON.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter used when `RUST_LOG` is unset or invalid.
const DEFAULT_FILTER: &str = "warn";

/// Initialize the tracing subscriber.
///
/// Reads `RUST_LOG`, falling back to [`DEFAULT_FILTER`]. Events go to stderr
/// in compact form without module targets, interleaved with the agent's
/// echoed diagnostics.
///
/// # Example
/// ```bash
/// RUST_LOG=ainvoke=debug ainvoke exec -- my-agent
/// ```
pub fn init() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact();

    tracing_subscriber::registry().with(filter).with(layer).init();
}

