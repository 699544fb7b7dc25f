//! Directory structure and file generation for `.authchain/`.

use super::error::{InitError, InitResult};
use super::templates::{get_template, list_templates};
use crate::config::CONFIG_DIR;
use std::fs;
use std::path::{Path, PathBuf};

/// Options for initializing a `.authchain/` directory.
#[derive(Debug, Clone)]
pub struct InitOptions {
    /// Directory in which `.authchain/` is created.
    pub target_dir: PathBuf,

    /// Overwrite files of an existing `.authchain/` directory.
    pub force: bool,
}

impl Default for InitOptions {
    fn default() -> Self {
        Self {
            target_dir: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            force: false,
        }
    }
}

/// Generate the `.authchain/` directory from the embedded templates.
///
/// ```text
/// .authchain/
/// ├── config.toml
/// ├── chains/
/// │   ├── attribute-release.yaml
/// │   └── idp-sso.yaml
/// └── state/
/// ```
///
/// # Errors
///
/// Fails with `DirectoryExists` if `.authchain/` exists and `force` is not
/// set, or with an I/O error if writing fails.
pub async fn generate_authchain_structure(options: InitOptions) -> InitResult<()> {
    let config_dir = options.target_dir.join(CONFIG_DIR);

    if config_dir.exists() && !options.force {
        return Err(InitError::DirectoryExists(config_dir));
    }

    for sub in ["chains", "state"] {
        let path = config_dir.join(sub);
        fs::create_dir_all(&path).map_err(|source| InitError::DirectoryCreate { path, source })?;
    }

    write_template_file(&config_dir, "config.toml")?;
    for chain_path in list_templates("chains/") {
        write_template_file(&config_dir, &chain_path)?;
    }

    tracing::info!(directory = %config_dir.display(), "Initialized authchain project");
    Ok(())
}

fn write_template_file(config_dir: &Path, template_path: &str) -> InitResult<()> {
    let content = get_template(template_path)
        .ok_or_else(|| InitError::TemplateNotFound(template_path.to_string()))?;

    let target_path = config_dir.join(template_path);

    if let Some(parent) = target_path.parent() {
        fs::create_dir_all(parent).map_err(|source| InitError::DirectoryCreate {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    fs::write(&target_path, content).map_err(|source| InitError::FileWrite {
        path: target_path,
        source,
    })
}
