//! Logging initialization for embedding hosts.

use tracing_subscriber::EnvFilter;

/// Initialize tracing with an env-filter, defaulting to `info`.
///
/// Hosts that already install a subscriber can skip this; double
/// initialization is reported as an error by the subscriber and ignored
/// here.
pub fn init() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .try_init();
}
