//! Tracing setup for binaries and tests embedding the client.

use tracing_subscriber::EnvFilter;

/// Default filter when `RUST_LOG` is unset.
const DEFAULT_FILTER: &str = "info";

/// Install a compact fmt subscriber filtered by `RUST_LOG`.
///
/// Safe to call more than once; only the first call installs anything.
pub fn init() {
    init_with_default(DEFAULT_FILTER);
}

/// Like [`init`] with a caller-chosen fallback filter.
pub fn init_with_default(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_target(false).compact().try_init();
}
