//! Assembles stores, sinks and chains from configuration.

use crate::config::{AppConfig, ConfigError};
use crate::controller::FlowController;
use crate::engine::ChainRegistry;
use crate::sink::{BackgroundEventSink, EventSink, FileEventSink, SinkError, TracingEventSink};
use crate::state::sweeper::spawn_sweeper;
use crate::state::{FileStateStore, MemoryStateStore, StateError, StateStore};
use crate::urls::UrlPolicy;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    State(#[from] StateError),
    #[error(transparent)]
    Sink(#[from] SinkError),
    #[error("Invalid base URL: {0}")]
    BaseUrl(#[from] url::ParseError),
}

pub type AppResult<T> = Result<T, AppError>;

/// A fully wired authchain instance.
pub struct App {
    config: AppConfig,
    store: Arc<dyn StateStore>,
    background: Option<Arc<BackgroundEventSink>>,
    controller: FlowController,
}

impl App {
    /// Wire everything described by `config`.
    ///
    /// Uses the file store when a state directory is configured, and writes
    /// statistics to daily files through a background writer when a stats
    /// directory is configured. Must be called within a tokio runtime.
    pub fn build(config: AppConfig) -> AppResult<Self> {
        let store: Arc<dyn StateStore> = match &config.global.state.directory {
            Some(dir) => Arc::new(FileStateStore::open(dir, config.lease_ttl())?),
            None => Arc::new(MemoryStateStore::new(config.lease_ttl())),
        };

        let mut background = None;
        let sink: Arc<dyn EventSink> = match &config.global.stats.directory {
            Some(dir) => {
                let file: Arc<dyn EventSink> = Arc::new(FileEventSink::new(dir)?);
                let writer = Arc::new(BackgroundEventSink::spawn(file));
                background = Some(writer.clone());
                writer
            }
            None => Arc::new(TracingEventSink),
        };

        Self::with_parts(config, store, sink, background)
    }

    /// Wire `config` over an explicit store and sink.
    pub fn with_store_and_sink(
        config: AppConfig,
        store: Arc<dyn StateStore>,
        sink: Arc<dyn EventSink>,
    ) -> AppResult<Self> {
        Self::with_parts(config, store, sink, None)
    }

    fn with_parts(
        config: AppConfig,
        store: Arc<dyn StateStore>,
        sink: Arc<dyn EventSink>,
        background: Option<Arc<BackgroundEventSink>>,
    ) -> AppResult<Self> {
        let urls = UrlPolicy::new(&config.global.base_url, &config.global.trusted_url_domains)?;
        let registry = ChainRegistry::from_config(&config, store.clone(), sink);
        tracing::info!(chains = registry.len(), "Chains registered");
        Ok(Self {
            config,
            store,
            background,
            controller: FlowController::new(registry, urls),
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn StateStore> {
        &self.store
    }

    pub fn controller(&self) -> &FlowController {
        &self.controller
    }

    /// Purge expired state every `every` in the background.
    pub fn spawn_sweeper(&self, every: Duration) -> JoinHandle<()> {
        spawn_sweeper(self.store.clone(), every)
    }

    /// Flush pending statistics.
    pub async fn shutdown(&self) {
        if let Some(background) = &self.background {
            background.shutdown().await;
        }
    }
}
