//! Global configuration models for `.authchain/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use ts_rs::TS;

fn default_ttl_secs() -> u64 {
    3600
}

fn default_lease_ttl_secs() -> u64 {
    30
}

/// State store settings.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
pub struct StateConfig {
    /// Directory of the file-backed store. The in-memory store is used when absent.
    #[serde(default)]
    #[ts(type = "string | null")]
    pub directory: Option<PathBuf>,

    /// Default lifetime of a suspended chain.
    #[serde(default = "default_ttl_secs")]
    pub default_ttl_secs: u64,

    /// How long a resumption holds its lease before another may take over.
    #[serde(default = "default_lease_ttl_secs")]
    pub lease_ttl_secs: u64,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            directory: None,
            default_ttl_secs: default_ttl_secs(),
            lease_ttl_secs: default_lease_ttl_secs(),
        }
    }
}

/// Statistics output settings.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq, TS)]
pub struct StatsConfig {
    /// Directory receiving one `YYYY-MM-DD.log` file per UTC day.
    /// Must exist when set.
    #[serde(default)]
    #[ts(type = "string | null")]
    pub directory: Option<PathBuf>,
}

fn default_base_url() -> String {
    "http://localhost".to_string()
}

/// Represents global settings from `.authchain/config.toml`.
///
/// # Example
///
/// ```toml
/// base_url = "https://idp.example.org"
/// trusted_url_domains = ["sp.example.org"]
///
/// [state]
/// default_ttl_secs = 3600
///
/// [stats]
/// directory = "/var/log/authchain"
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, TS)]
pub struct GlobalConfig {
    /// Public base URL; continuations and logout links are built from it.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Hosts besides the base URL's own host that redirects may target.
    #[serde(default)]
    pub trusted_url_domains: Vec<String>,

    #[serde(default)]
    pub state: StateConfig,

    #[serde(default)]
    pub stats: StatsConfig,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            trusted_url_domains: Vec::new(),
            state: StateConfig::default(),
            stats: StatsConfig::default(),
        }
    }
}
