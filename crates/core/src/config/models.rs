//! Aggregated application configuration.

use ac_protocol::{ChainDefinition, GlobalConfig};
use std::time::Duration;

/// Everything loaded from the `.authchain/` directory.
///
/// Relative directories in [`GlobalConfig`] are already resolved against
/// the project root.
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    /// Global settings from `config.toml`.
    pub global: GlobalConfig,

    /// Chain definitions from `chains/*.yaml`, sorted by id.
    pub chains: Vec<ChainDefinition>,
}

impl AppConfig {
    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.global.state.default_ttl_secs)
    }

    pub fn lease_ttl(&self) -> Duration {
        Duration::from_secs(self.global.state.lease_ttl_secs)
    }

    pub fn chain(&self, id: &str) -> Option<&ChainDefinition> {
        self.chains.iter().find(|chain| chain.id.as_str() == id)
    }
}
