//! Tracing/logging initialization.

use tracing_subscriber::EnvFilter;

use crate::settings::Settings;

/// Install a fmt subscriber. `RUST_LOG` wins over the configured filter.
///
/// Safe to call multiple times (subsequent calls are no-ops).
pub fn init(settings: &Settings) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.log_filter));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
