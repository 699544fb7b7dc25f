//! Lookup of configured chains by name.

use super::error::{ChainError, ChainResult};
use super::ProcessingChain;
use crate::config::models::AppConfig;
use crate::sink::EventSink;
use crate::state::StateStore;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Default)]
pub struct ChainRegistry {
    chains: BTreeMap<String, Arc<ProcessingChain>>,
}

impl ChainRegistry {
    /// Build every chain defined in `config` over the shared store and sink.
    pub fn from_config(
        config: &AppConfig,
        store: Arc<dyn StateStore>,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        let default_ttl = Duration::from_secs(config.global.state.default_ttl_secs);
        let mut registry = Self::default();
        for definition in &config.chains {
            registry.insert(ProcessingChain::from_definition(
                definition,
                default_ttl,
                store.clone(),
                sink.clone(),
                config.global.base_url.clone(),
            ));
        }
        registry
    }

    /// Register `chain`, replacing a chain with the same id.
    pub fn insert(&mut self, chain: ProcessingChain) {
        self.chains
            .insert(chain.id().as_str().to_string(), Arc::new(chain));
    }

    pub fn get(&self, id: &str) -> ChainResult<Arc<ProcessingChain>> {
        self.chains
            .get(id)
            .cloned()
            .ok_or_else(|| ChainError::UnknownChain(id.to_string()))
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.chains.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.chains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }
}
