use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggingConfig;

/// Install the global subscriber. `RUST_LOG` wins over the configured
/// level. Fails if a subscriber is already installed.
pub fn init_tracing(config: &LoggingConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&config.level))?;
    let registry = tracing_subscriber::registry().with(filter);

    match (config.json, config.timestamps) {
        (true, true) => registry.with(fmt::layer().json()).try_init()?,
        (true, false) => registry.with(fmt::layer().json().without_time()).try_init()?,
        (false, true) => registry.with(fmt::layer()).try_init()?,
        (false, false) => registry.with(fmt::layer().without_time()).try_init()?,
    }
    Ok(())
}
