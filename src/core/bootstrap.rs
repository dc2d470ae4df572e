use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;

use crate::core::config::Settings;
use crate::core::state::AppState;
use crate::repositories::{PgStore, Store};
use crate::services::grading_engine::{GradingEngineClient, GradingEngineConfig};
use crate::services::pipeline::{GradingPipeline, PipelineLimits};
use crate::services::staging::StagingArea;
use crate::services::storage::{BlobStore, ObjectStorage};

/// Wires the store, blob store, engine client and pipeline into one state.
pub(crate) async fn build_state(settings: Settings, pool: sqlx::PgPool) -> anyhow::Result<AppState> {
    let store: Arc<dyn Store> = Arc::new(PgStore::new(pool));
    let blobs: Arc<dyn BlobStore> = Arc::new(ObjectStorage::from_settings(&settings).await?);
    let engine = GradingEngineClient::new(GradingEngineConfig::from_settings(settings.grading()))?;

    let staging = StagingArea::new(settings.storage().staging_dir.clone()).with_stale_after(
        Duration::from_secs(settings.storage().staging_stale_after_seconds),
    );
    prepare_staging(&staging).await?;

    let pipeline = GradingPipeline::new(
        Arc::clone(&store),
        Arc::clone(&blobs),
        engine.clone(),
        staging,
        PipelineLimits::from_settings(&settings),
    );

    Ok(AppState::new(settings, store, blobs, engine, pipeline))
}

/// Clears batches left behind by a process that died mid-pipeline.
pub(crate) async fn prepare_staging(staging: &StagingArea) -> anyhow::Result<()> {
    let removed = staging
        .sweep()
        .await
        .with_context(|| format!("Failed to prepare staging dir {}", staging.root().display()))?;

    if removed > 0 {
        tracing::warn!(removed, dir = %staging.root().display(), "Removed abandoned staging batches");
    }
    tracing::info!(dir = %staging.instance_dir().display(), "Staging area ready");
    Ok(())
}
