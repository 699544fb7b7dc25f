//! Configuration file loader for the `.authchain/` directory structure.
//!
//! This module loads:
//! - `config.toml`: Global settings
//! - `chains/*.yaml`: Chain definitions

use crate::config::error::{ConfigError, ConfigResult};
use crate::config::models::AppConfig;
use ac_protocol::{ChainDefinition, GlobalConfig};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Name of the configuration directory under the project root.
pub const CONFIG_DIR: &str = ".authchain";

/// Loads and validates all configuration from the `.authchain/` directory.
///
/// Missing files fall back to defaults; a missing `.authchain/` directory
/// yields the default configuration with no chains.
///
/// # Errors
///
/// Returns `ConfigError` if:
/// - Files exist but cannot be read or parsed
/// - Two chain files define the same id, or a chain has no steps
/// - `base_url` is not an absolute URL
/// - The statistics directory is set but missing or not a directory
///
/// # Example
///
/// ```rust,no_run
/// use ac_core::config::load_config;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new(".")).await?;
/// println!("Loaded {} chains", config.chains.len());
/// # Ok(())
/// # }
/// ```
pub async fn load_config(root: &Path) -> ConfigResult<AppConfig> {
    let config_dir = root.join(CONFIG_DIR);

    if !config_dir.exists() {
        return Ok(AppConfig::default());
    }

    let mut global = load_global_config(&config_dir)?;
    global.state.directory = global.state.directory.map(|dir| resolve(root, dir));
    global.stats.directory = global.stats.directory.map(|dir| resolve(root, dir));

    let chains = load_chains(&config_dir)?;

    let config = AppConfig { global, chains };
    validate(&config_dir, &config)?;

    tracing::debug!(
        root = %root.display(),
        chains = config.chains.len(),
        "Configuration loaded"
    );
    Ok(config)
}

fn resolve(root: &Path, dir: PathBuf) -> PathBuf {
    if dir.is_absolute() {
        dir
    } else {
        root.join(dir)
    }
}

/// Loads global configuration from `config.toml`.
fn load_global_config(config_dir: &Path) -> ConfigResult<GlobalConfig> {
    let config_path = config_dir.join("config.toml");

    if !config_path.exists() {
        return Ok(GlobalConfig::default());
    }

    let content =
        std::fs::read_to_string(&config_path).map_err(|source| ConfigError::FileRead {
            path: config_path.clone(),
            source,
        })?;

    toml::from_str(&content).map_err(|source| ConfigError::TomlParse {
        path: config_path,
        source,
    })
}

/// Loads all chain definitions from `chains/*.yaml` and `chains/*.yml`.
fn load_chains(config_dir: &Path) -> ConfigResult<Vec<ChainDefinition>> {
    let chains_dir = config_dir.join("chains");

    if !chains_dir.exists() {
        return Ok(Vec::new());
    }

    let mut chains = Vec::new();
    let mut seen = BTreeSet::new();

    for entry in WalkDir::new(&chains_dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|source| ConfigError::DirectoryWalk {
            path: chains_dir.clone(),
            source,
        })?;

        let path = entry.path();
        let ext = path.extension().and_then(|s| s.to_str());
        if ext != Some("yaml") && ext != Some("yml") {
            continue;
        }

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;

        let chain: ChainDefinition =
            serde_yaml::from_str(&content).map_err(|source| ConfigError::YamlParse {
                path: path.to_path_buf(),
                source,
            })?;

        if chain.steps.is_empty() {
            return Err(ConfigError::InvalidConfig {
                path: path.to_path_buf(),
                reason: format!("chain '{}' has no steps", chain.id),
            });
        }
        if !seen.insert(chain.id.clone()) {
            return Err(ConfigError::InvalidConfig {
                path: path.to_path_buf(),
                reason: format!("duplicate chain id '{}'", chain.id),
            });
        }

        chains.push(chain);
    }

    chains.sort_by(|a, b| a.id.cmp(&b.id));
    Ok(chains)
}

fn validate(config_dir: &Path, config: &AppConfig) -> ConfigResult<()> {
    let config_path = config_dir.join("config.toml");

    let base = url::Url::parse(&config.global.base_url).map_err(|e| ConfigError::InvalidConfig {
        path: config_path.clone(),
        reason: format!("base_url '{}' is invalid: {e}", config.global.base_url),
    })?;
    if base.cannot_be_a_base() {
        return Err(ConfigError::InvalidConfig {
            path: config_path,
            reason: format!("base_url '{}' cannot be a base URL", config.global.base_url),
        });
    }

    if let Some(dir) = &config.global.stats.directory {
        if !dir.is_dir() {
            tracing::error!(directory = %dir.display(), "Statistics directory is unusable");
            return Err(ConfigError::InvalidConfig {
                path: config_path,
                reason: format!(
                    "stats directory {} does not exist or is not a directory",
                    dir.display()
                ),
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ac_protocol::{ResumePolicy, StepSpec};
    use std::fs;
    use tempfile::tempdir;

    const CHAIN_YAML: &str = r#"id: idp-sso
resume-policy: single-use
steps:
  - type: cardinality
    attributes:
      uid: { min: 1, max: 1 }
  - type: short-sso-interval
  - type: finish
"#;

    #[tokio::test]
    async fn test_load_config_full() {
        let dir = tempdir().expect("Failed to create temp dir");
        let root = dir.path();
        let config_dir = root.join(CONFIG_DIR);
        fs::create_dir_all(config_dir.join("chains")).unwrap();
        fs::create_dir_all(root.join("stats")).unwrap();

        fs::write(
            config_dir.join("config.toml"),
            r#"base_url = "https://idp.example.org/sso"
trusted_url_domains = ["sp.example.org"]

[state]
directory = ".authchain/state"
default_ttl_secs = 600

[stats]
directory = "stats"
"#,
        )
        .unwrap();
        fs::write(config_dir.join("chains/idp-sso.yaml"), CHAIN_YAML).unwrap();
        fs::write(config_dir.join("chains/README.md"), "ignored").unwrap();

        let config = load_config(root).await.expect("Failed to load config");

        assert_eq!(config.global.base_url, "https://idp.example.org/sso");
        assert_eq!(config.global.trusted_url_domains, vec!["sp.example.org"]);
        assert_eq!(config.default_ttl().as_secs(), 600);
        assert_eq!(config.lease_ttl().as_secs(), 30);
        assert_eq!(
            config.global.state.directory.as_deref(),
            Some(root.join(".authchain/state").as_path())
        );
        assert_eq!(
            config.global.stats.directory.as_deref(),
            Some(root.join("stats").as_path())
        );

        assert_eq!(config.chains.len(), 1);
        let chain = config.chain("idp-sso").expect("chain should be loaded");
        assert_eq!(chain.resume_policy, ResumePolicy::SingleUse);
        assert_eq!(chain.steps.len(), 3);
        assert!(matches!(
            chain.steps[1],
            StepSpec::ShortSsoInterval {
                min_interval_secs: 10
            }
        ));
    }

    #[tokio::test]
    async fn test_load_config_empty_directory() {
        let dir = tempdir().unwrap();
        let config = load_config(dir.path()).await.unwrap();
        assert_eq!(config.global, GlobalConfig::default());
        assert!(config.chains.is_empty());
    }

    #[tokio::test]
    async fn test_load_config_invalid_toml() {
        let dir = tempdir().unwrap();
        let config_dir = dir.path().join(CONFIG_DIR);
        fs::create_dir_all(&config_dir).unwrap();
        fs::write(config_dir.join("config.toml"), "base_url = [invalid toml").unwrap();

        match load_config(dir.path()).await {
            Err(ConfigError::TomlParse { path, .. }) => assert!(path.ends_with("config.toml")),
            other => panic!("Expected TomlParse error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_load_config_invalid_yaml() {
        let dir = tempdir().unwrap();
        let config_dir = dir.path().join(CONFIG_DIR);
        fs::create_dir_all(config_dir.join("chains")).unwrap();
        fs::write(config_dir.join("chains/bad.yml"), "id: x\n  steps: [yaml").unwrap();

        match load_config(dir.path()).await {
            Err(ConfigError::YamlParse { path, .. }) => assert!(path.ends_with("bad.yml")),
            other => panic!("Expected YamlParse error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_duplicate_chain_ids() {
        let dir = tempdir().unwrap();
        let config_dir = dir.path().join(CONFIG_DIR);
        fs::create_dir_all(config_dir.join("chains")).unwrap();
        fs::write(config_dir.join("chains/a.yaml"), CHAIN_YAML).unwrap();
        fs::write(config_dir.join("chains/b.yaml"), CHAIN_YAML).unwrap();

        match load_config(dir.path()).await {
            Err(ConfigError::InvalidConfig { reason, .. }) => {
                assert!(reason.contains("duplicate"), "unexpected reason: {reason}")
            }
            other => panic!("Expected InvalidConfig error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_empty_chain() {
        let dir = tempdir().unwrap();
        let config_dir = dir.path().join(CONFIG_DIR);
        fs::create_dir_all(config_dir.join("chains")).unwrap();
        fs::write(config_dir.join("chains/empty.yaml"), "id: empty\nsteps: []\n").unwrap();

        assert!(matches!(
            load_config(dir.path()).await,
            Err(ConfigError::InvalidConfig { .. })
        ));
    }

    #[tokio::test]
    async fn test_missing_stats_directory_is_fatal() {
        let dir = tempdir().unwrap();
        let config_dir = dir.path().join(CONFIG_DIR);
        fs::create_dir_all(&config_dir).unwrap();
        fs::write(
            config_dir.join("config.toml"),
            "[stats]\ndirectory = \"does-not-exist\"\n",
        )
        .unwrap();

        match load_config(dir.path()).await {
            Err(ConfigError::InvalidConfig { reason, .. }) => {
                assert!(reason.contains("does-not-exist"))
            }
            other => panic!("Expected InvalidConfig error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_stats_path_that_is_a_file_is_fatal() {
        let dir = tempdir().unwrap();
        let config_dir = dir.path().join(CONFIG_DIR);
        fs::create_dir_all(&config_dir).unwrap();
        fs::write(dir.path().join("stats.log"), "").unwrap();
        fs::write(config_dir.join("config.toml"), "[stats]\ndirectory = \"stats.log\"\n").unwrap();

        assert!(matches!(
            load_config(dir.path()).await,
            Err(ConfigError::InvalidConfig { .. })
        ));
    }

    #[tokio::test]
    async fn test_invalid_base_url() {
        let dir = tempdir().unwrap();
        let config_dir = dir.path().join(CONFIG_DIR);
        fs::create_dir_all(&config_dir).unwrap();
        fs::write(config_dir.join("config.toml"), "base_url = \"not a url\"\n").unwrap();

        assert!(matches!(
            load_config(dir.path()).await,
            Err(ConfigError::InvalidConfig { .. })
        ));
    }
}
