//! Log output for the binary.
//!
//! `RUST_LOG` wins when set; otherwise the configured filter applies.
//! Everything goes to stderr so stdout stays the field's output.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Filter from `RUST_LOG`, or from `fallback` when unset or invalid.
pub fn env_filter(fallback: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(fallback))
        .unwrap_or_else(|_| EnvFilter::new("warn"))
}

/// Install the global subscriber. Later calls are ignored.
pub fn init(fallback: &str) {
    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_line_number(true)
        .with_filter(env_filter(fallback));

    let _ = tracing_subscriber::registry().with(layer).try_init();
}
