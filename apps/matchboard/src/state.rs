use std::sync::Arc;

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::info;

use crate::config::Config;
use crate::funnel::{HttpStageBackend, LocalStageBackend, PipelineStageStore, StageBackend};
use crate::ranking::RankedListPipeline;
use crate::session::{BackingStore, FileStore, MemoryStore, SessionStateCache, StalenessPolicy};

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// Unweighted pipeline; requests carrying sub-score weights build their own.
    pub ranking: RankedListPipeline,
    pub stages: Arc<PipelineStageStore>,
    /// View state is opaque JSON at the HTTP boundary.
    pub session: SessionStateCache<Value>,
    pub staleness: StalenessPolicy,
}

impl AppState {
    pub fn new(
        config: Config,
        backend: Arc<dyn StageBackend>,
        store: Arc<dyn BackingStore>,
    ) -> Self {
        let session = SessionStateCache::new(store, config.cache_config());
        let staleness = config.staleness_policy();
        Self {
            ranking: RankedListPipeline::default(),
            stages: Arc::new(PipelineStageStore::new(backend)),
            session,
            staleness,
            config,
        }
    }

    /// Wires collaborators from configuration.
    pub fn from_config(config: Config) -> Result<Self> {
        let backend: Arc<dyn StageBackend> = match &config.stage_backend_url {
            Some(url) => {
                info!("Stage backend: {url}");
                Arc::new(HttpStageBackend::new(url.clone(), config.stage_backend_timeout))
            }
            None => {
                info!("Stage backend: local (no STAGE_BACKEND_URL set)");
                Arc::new(LocalStageBackend)
            }
        };

        let store: Arc<dyn BackingStore> = match &config.session_store_dir {
            Some(dir) => {
                let store = FileStore::open(dir).with_context(|| {
                    format!("Failed to open session store at {}", dir.display())
                })?;
                info!("Session store: {}", dir.display());
                Arc::new(store)
            }
            None => {
                info!("Session store: in-memory");
                Arc::new(MemoryStore::new())
            }
        };

        Ok(Self::new(config, backend, store))
    }
}
