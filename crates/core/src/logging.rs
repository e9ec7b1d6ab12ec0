//! Log subscriber setup

use tracing_subscriber::EnvFilter;

use crate::config::EngineConfig;

/// Installs a fmt subscriber filtered by `RUST_LOG`, falling back to the
/// config's log filter.
///
/// Returns `false` when a global subscriber was already installed, in which
/// case the existing one stays active.
pub fn init(config: &EngineConfig) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_filter()))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_ok();

    if installed {
        tracing::debug!("Logging initialized with filter {:?}", config.log_filter());
    }
    installed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeated_init_is_harmless() {
        let config = EngineConfig::default();
        init(&config);
        assert!(!init(&config));
    }
}
