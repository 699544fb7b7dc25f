//! CLI argument parsing.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// authchain - drive resumable authentication chains.
#[derive(Debug, Parser)]
#[command(name = "authchain")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Project root containing `.authchain/`.
    #[arg(long, env = "AUTHCHAIN_ROOT", default_value = ".")]
    pub root: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Generate a `.authchain/` directory from the built-in templates.
    Init {
        /// Overwrite an existing `.authchain/` directory.
        #[arg(long)]
        force: bool,
    },

    /// Load and validate the configuration, then list the chains.
    Check,

    /// Start a chain with a fresh context.
    Start(StartArgs),

    /// Answer the short SSO interval warning of a suspended chain.
    Resume {
        /// Chain id.
        chain: String,

        /// State identifier from the continuation URL.
        state_id: String,

        /// Acknowledge the warning and resume the chain.
        #[arg(long = "continue")]
        proceed: bool,
    },

    /// Reject a suspended chain and delete its state.
    Abort {
        /// Chain id.
        chain: String,

        /// State identifier.
        state_id: String,
    },

    /// Remove expired state entries.
    Sweep,

    /// Render the missing-cookie page.
    Nocookie {
        /// Retry link to offer, subject to the URL allow-list.
        #[arg(long)]
        retry_url: Option<String>,
    },
}

#[derive(Debug, clap::Args)]
pub struct StartArgs {
    /// Chain id.
    pub chain: String,

    /// Attribute value as `name=value`; repeat for multiple values.
    #[arg(long = "attr", value_parser = parse_attr)]
    pub attrs: Vec<(String, String)>,

    /// Entity id of the relying party.
    #[arg(long)]
    pub destination: Option<String>,

    /// Entity id of the authenticating side.
    #[arg(long)]
    pub source: Option<String>,

    /// Local SP auth source of `--source`.
    #[arg(long, requires = "source")]
    pub auth_source: Option<String>,

    /// Seconds since the previous SSO to the same destination.
    #[arg(long)]
    pub previous_sso_secs: Option<i64>,
}

fn parse_attr(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((name, value)) if !name.is_empty() => Ok((name.to_string(), value.to_string())),
        _ => Err(format!("expected name=value, got '{raw}'")),
    }
}
