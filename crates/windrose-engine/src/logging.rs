//! Subscriber setup for hosts and demos.
//!
//! The libraries only emit `tracing` events; installing a subscriber is the
//! host's call. [`init`] is the stock choice: formatted output filtered by
//! `RUST_LOG`, falling back to `warn`.

use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset or unparsable.
pub const DEFAULT_FILTER: &str = "warn";

/// Install a global fmt subscriber. Returns `false` if one was already set.
pub fn init() -> bool {
    init_with_default(DEFAULT_FILTER)
}

/// As [`init`], with a caller-chosen fallback filter (e.g. `"windrose=debug"`).
pub fn init_with_default(default_filter: &str) -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .is_ok()
}
