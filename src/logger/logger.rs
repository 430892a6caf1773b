use anyhow::{Result, anyhow};
use tracing_subscriber::{
    EnvFilter, Registry, fmt, layer::SubscriberExt, reload, util::SubscriberInitExt,
};

/// Filter used until the settings file has been read.
pub const BOOTSTRAP_FILTER: &str = "info";

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub filter: String,
}

impl From<&crate::settings::Log> for LogConfig {
    fn from(log: &crate::settings::Log) -> Self {
        LogConfig {
            filter: log.filter.clone(),
        }
    }
}

/// Owns the handle of a reloadable `EnvFilter` so the level can be raised or
/// lowered once configuration is known.
pub struct Logger {
    reload_handle: reload::Handle<EnvFilter, Registry>,
}

impl Logger {
    /// Install the global subscriber. `RUST_LOG` wins over the bootstrap
    /// filter when set.
    pub fn new_bootstrap() -> Self {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(BOOTSTRAP_FILTER));
        let (filter, reload_handle) = reload::Layer::new(filter);

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true))
            .init();

        Self { reload_handle }
    }

    pub fn reload_from_config(&self, config: &LogConfig) -> Result<()> {
        let filter = EnvFilter::try_new(&config.filter).map_err(|e| anyhow!(e))?;
        self.reload_handle.reload(filter).map_err(|e| anyhow!(e))?;
        Ok(())
    }
}
