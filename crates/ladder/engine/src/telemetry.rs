//! Tracing initialization
//!
//! Audit-relevant events are emitted under the `ladder::audit` target with
//! an `event` field, so they can be routed separately, e.g.
//! `RUST_LOG=info,ladder::audit=info`.

use crate::config::LoggingConfig;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{fmt, EnvFilter};

/// Install the global subscriber
///
/// `RUST_LOG` takes precedence over the configured level. Fails if a global
/// subscriber is already installed.
pub fn init_tracing(config: &LoggingConfig) -> Result<(), TryInitError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));
    let registry = tracing_subscriber::registry().with(filter);

    match (config.json, config.timestamps) {
        (true, _) => registry.with(fmt::layer().json()).try_init(),
        (false, true) => registry.with(fmt::layer()).try_init(),
        (false, false) => registry.with(fmt::layer().without_time()).try_init(),
    }
}
