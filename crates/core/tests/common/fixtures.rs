//! Test fixtures.

use ac_core::engine::ProcessingChain;
use ac_core::sink::MemoryEventSink;
use ac_core::state::MemoryStateStore;
use ac_core::steps::PipelineStep;
use ac_protocol::{AuthContext, ChainId};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

pub const BASE_URL: &str = "https://idp.example.org/sso";

/// Shared in-memory store and sink for one test.
#[allow(dead_code)]
pub struct Harness {
    pub store: Arc<MemoryStateStore>,
    pub sink: Arc<MemoryEventSink>,
}

#[allow(dead_code)]
impl Harness {
    pub fn new() -> Self {
        Self::with_lease_ttl(Duration::from_secs(30))
    }

    pub fn with_lease_ttl(lease_ttl: Duration) -> Self {
        Self {
            store: Arc::new(MemoryStateStore::new(lease_ttl)),
            sink: Arc::new(MemoryEventSink::new()),
        }
    }

    pub fn chain(&self, id: &str, steps: Vec<Box<dyn PipelineStep>>) -> ProcessingChain {
        ProcessingChain::new(
            chain_id(id),
            steps,
            self.store.clone(),
            self.sink.clone(),
            BASE_URL,
        )
    }
}

#[allow(dead_code)]
pub fn chain_id(id: &str) -> ChainId {
    id.parse().expect("valid chain id")
}

/// A context carrying a complete set of attributes for `chain`.
#[allow(dead_code)]
pub fn context(chain: &str) -> AuthContext {
    let mut context = AuthContext::new(chain_id(chain));
    context.set_attribute("uid", ["alice"]);
    context.set_attribute("mail", ["alice@example.org"]);
    context
}

/// Create a project directory with an `.authchain/` configuration.
#[allow(dead_code)]
pub fn create_test_project() -> std::io::Result<TempDir> {
    let temp_dir = tempfile::tempdir()?;
    let root = temp_dir.path();

    std::fs::create_dir_all(root.join(".authchain/chains"))?;
    std::fs::create_dir_all(root.join("stats"))?;

    std::fs::write(
        root.join(".authchain/config.toml"),
        format!(
            r#"base_url = "{BASE_URL}"
trusted_url_domains = ["sp.example.org"]

[state]
directory = "state"
default_ttl_secs = 60

[stats]
directory = "stats"
"#
        ),
    )?;

    std::fs::write(
        root.join(".authchain/chains/idp-sso.yaml"),
        r#"id: idp-sso
steps:
  - type: cardinality
    attributes:
      uid: { min: 1, max: 1 }
      mail: { min: 1 }
  - type: short-sso-interval
    min-interval-secs: 10
  - type: finish
"#,
    )?;

    Ok(temp_dir)
}
