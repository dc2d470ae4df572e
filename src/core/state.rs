use std::sync::Arc;

use crate::core::config::Settings;
use crate::repositories::Store;
use crate::services::grading_engine::GradingEngineClient;
use crate::services::pipeline::GradingPipeline;
use crate::services::storage::BlobStore;

#[derive(Clone)]
pub(crate) struct AppState {
    inner: Arc<InnerState>,
}

struct InnerState {
    settings: Settings,
    store: Arc<dyn Store>,
    blobs: Arc<dyn BlobStore>,
    engine: GradingEngineClient,
    pipeline: GradingPipeline,
}

impl AppState {
    pub(crate) fn new(
        settings: Settings,
        store: Arc<dyn Store>,
        blobs: Arc<dyn BlobStore>,
        engine: GradingEngineClient,
        pipeline: GradingPipeline,
    ) -> Self {
        Self { inner: Arc::new(InnerState { settings, store, blobs, engine, pipeline }) }
    }

    pub(crate) fn settings(&self) -> &Settings {
        &self.inner.settings
    }

    pub(crate) fn store(&self) -> &dyn Store {
        self.inner.store.as_ref()
    }

    pub(crate) fn blobs(&self) -> &dyn BlobStore {
        self.inner.blobs.as_ref()
    }

    pub(crate) fn engine(&self) -> &GradingEngineClient {
        &self.inner.engine
    }

    pub(crate) fn pipeline(&self) -> &GradingPipeline {
        &self.inner.pipeline
    }
}
