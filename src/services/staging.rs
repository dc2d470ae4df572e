use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub(crate) enum StagingError {
    #[error("failed to prepare staging directory {path}: {source}")]
    Prepare { path: PathBuf, source: std::io::Error },
    #[error("failed to stage {name}: {source}")]
    Write { name: String, source: std::io::Error },
    #[error("failed to read staged file {name}: {source}")]
    Read { name: String, source: std::io::Error },
}

const INSTANCE_PREFIX: &str = "instance-";
const DEFAULT_STALE_AFTER: Duration = Duration::from_secs(60 * 60);

/// Root shared by every process. Each `StagingArea` owns one
/// `{root}/instance-{uuid}` directory and every pipeline invocation gets its
/// own batch directory inside it.
#[derive(Debug, Clone)]
pub(crate) struct StagingArea {
    root: PathBuf,
    instance: PathBuf,
    stale_after: Duration,
    live: Arc<AtomicUsize>,
}

impl StagingArea {
    pub(crate) fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let instance = root.join(format!("{INSTANCE_PREFIX}{}", Uuid::new_v4()));
        Self { root, instance, stale_after: DEFAULT_STALE_AFTER, live: Arc::new(AtomicUsize::new(0)) }
    }

    /// Age after which another instance's batch counts as abandoned. Must
    /// exceed the longest pipeline run.
    pub(crate) fn with_stale_after(mut self, stale_after: Duration) -> Self {
        self.stale_after = stale_after;
        self
    }

    pub(crate) fn root(&self) -> &Path {
        &self.root
    }

    pub(crate) fn instance_dir(&self) -> &Path {
        &self.instance
    }

    /// Creates `{instance}/{label}-{uuid}`. The returned guard owns the directory.
    pub(crate) async fn begin(&self, label: &str) -> Result<StagedBatch, StagingError> {
        let dir = self.instance.join(format!("{}-{}", sanitize_label(label), Uuid::new_v4()));
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|source| StagingError::Prepare { path: dir.clone(), source })?;

        self.live.fetch_add(1, Ordering::SeqCst);
        tracing::debug!(dir = %dir.display(), "Opened staging batch");

        Ok(StagedBatch { dir, released: false, live: Arc::clone(&self.live) })
    }

    /// Batches opened and not yet cleaned up.
    pub(crate) fn live_batches(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    /// True when this instance holds no batches (a missing directory counts as empty).
    #[cfg(test)]
    pub(crate) async fn is_empty(&self) -> bool {
        match tokio::fs::read_dir(&self.instance).await {
            Ok(mut entries) => matches!(entries.next_entry().await, Ok(None)),
            Err(err) => err.kind() == std::io::ErrorKind::NotFound,
        }
    }

    /// Creates this instance's directory and removes batches abandoned by
    /// instances that died mid-pipeline. Only `instance-{uuid}/{label}-{uuid}`
    /// directories older than `stale_after` are touched; anything else under
    /// the root is left alone.
    pub(crate) async fn sweep(&self) -> Result<usize, StagingError> {
        let prepare = |source| StagingError::Prepare { path: self.root.clone(), source };

        tokio::fs::create_dir_all(&self.instance).await.map_err(prepare)?;
        let mut entries = tokio::fs::read_dir(&self.root).await.map_err(prepare)?;

        let mut removed = 0;
        while let Some(entry) = entries.next_entry().await.map_err(prepare)? {
            let path = entry.path();
            if path == self.instance || !is_instance_name(&entry.file_name().to_string_lossy()) {
                continue;
            }
            if !entry.file_type().await.map(|kind| kind.is_dir()).unwrap_or(false) {
                continue;
            }
            removed += self.sweep_instance(&path).await;
        }

        Ok(removed)
    }

    async fn sweep_instance(&self, instance: &Path) -> usize {
        let mut entries = match tokio::fs::read_dir(instance).await {
            Ok(entries) => entries,
            Err(err) => {
                tracing::warn!(path = %instance.display(), error = %err, "Failed to read staging instance");
                return 0;
            }
        };

        let mut removed = 0;
        while let Ok(Some(entry)) = entries.next_entry().await {
            let path = entry.path();
            if !is_batch_name(&entry.file_name().to_string_lossy()) {
                continue;
            }
            let Ok(metadata) = entry.metadata().await else {
                continue;
            };
            if !metadata.is_dir() || !self.is_stale(&metadata) {
                continue;
            }
            match tokio::fs::remove_dir_all(&path).await {
                Ok(()) => removed += 1,
                Err(err) => {
                    tracing::warn!(path = %path.display(), error = %err, "Failed to sweep staging batch")
                }
            }
        }

        // Only succeeds once the instance holds nothing else.
        if let Ok(metadata) = tokio::fs::metadata(instance).await {
            if self.is_stale(&metadata) {
                let _ = tokio::fs::remove_dir(instance).await;
            }
        }

        removed
    }

    fn is_stale(&self, metadata: &std::fs::Metadata) -> bool {
        metadata
            .modified()
            .ok()
            .map(|modified| modified.elapsed().unwrap_or_default())
            .is_some_and(|age| age >= self.stale_after)
    }
}

fn is_instance_name(name: &str) -> bool {
    name.strip_prefix(INSTANCE_PREFIX).is_some_and(|id| Uuid::parse_str(id).is_ok())
}

/// `{label}-{uuid}` as created by [`StagingArea::begin`].
fn is_batch_name(name: &str) -> bool {
    let Some(split) = name.len().checked_sub(36) else {
        return false;
    };
    match (name.get(..split), name.get(split..)) {
        (Some(label), Some(id)) => {
            label.len() > 1 && label.ends_with('-') && Uuid::parse_str(id).is_ok()
        }
        _ => false,
    }
}

/// One invocation's staged files. Call [`StagedBatch::cleanup`] on every exit
/// path; `Drop` removes the directory synchronously if that was skipped.
#[derive(Debug)]
pub(crate) struct StagedBatch {
    dir: PathBuf,
    released: bool,
    live: Arc<AtomicUsize>,
}

#[derive(Debug, Clone)]
pub(crate) struct StagedFile {
    pub(crate) path: PathBuf,
    pub(crate) file_name: String,
    pub(crate) size: u64,
}

impl StagedBatch {
    pub(crate) fn dir(&self) -> &Path {
        &self.dir
    }

    pub(crate) async fn stage(&self, name: &str, bytes: &[u8]) -> Result<StagedFile, StagingError> {
        let file_name = sanitize_label(name);
        let path = self.dir.join(&file_name);
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|source| StagingError::Write { name: name.to_string(), source })?;

        Ok(StagedFile { path, file_name, size: bytes.len() as u64 })
    }

    pub(crate) async fn read(&self, file: &StagedFile) -> Result<Vec<u8>, StagingError> {
        tokio::fs::read(&file.path)
            .await
            .map_err(|source| StagingError::Read { name: file.file_name.clone(), source })
    }

    /// Idempotent. Only ever touches this batch's directory.
    pub(crate) async fn cleanup(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        self.live.fetch_sub(1, Ordering::SeqCst);

        match tokio::fs::remove_dir_all(&self.dir).await {
            Ok(()) => tracing::debug!(dir = %self.dir.display(), "Released staging batch"),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => {
                tracing::warn!(dir = %self.dir.display(), error = %err, "Failed to remove staging batch")
            }
        }
    }
}

impl Drop for StagedBatch {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        self.live.fetch_sub(1, Ordering::SeqCst);

        if let Err(err) = std::fs::remove_dir_all(&self.dir) {
            if err.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(dir = %self.dir.display(), error = %err, "Failed to drop staging batch");
            }
        }
    }
}

fn sanitize_label(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' })
        .collect();
    let cleaned = cleaned.trim_matches('.').to_string();
    if cleaned.is_empty() {
        "staged".to_string()
    } else {
        cleaned
    }
}
