//! JSON-file `RecordStore` backend.
//!
//! Wraps a [`MemoryStore`] and rewrites the whole state document on every
//! mutation. A mutation becomes visible in memory only after the document
//! has been replaced on disk. Intended for single-process admin deployments and the CLI; the
//! document is small (one managed record per section plus its history).

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::StorageError;
use crate::memory::{MemoryStore, StoreState};
use crate::record::{RecordContent, RecordId, RecordRef, Stage, StageRecord, VersionSnapshot};
use crate::traits::RecordStore;

pub struct FileStore {
    path: PathBuf,
    inner: MemoryStore,
}

impl FileStore {
    /// Open the store at `path`, loading existing state if the file exists.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();
        let state = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice::<StoreState>(&bytes).map_err(|e| {
                StorageError::Backend(format!("invalid store file {}: {}", path.display(), e))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => StoreState::default(),
            Err(e) => {
                return Err(StorageError::Backend(format!(
                    "failed to read {}: {}",
                    path.display(),
                    e
                )))
            }
        };
        tracing::debug!(path = %path.display(), "opened file store");
        Ok(Self {
            path,
            inner: MemoryStore::from_state(state),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Apply `mutate` to a copy of the state, persist the copy, then swap it in.
    ///
    /// `mutate` also reports whether it changed anything; unchanged state is
    /// not rewritten. The write lock is held throughout, so writers are
    /// serialized and a failed persist leaves the in-memory state untouched.
    async fn commit<T>(
        &self,
        mutate: impl FnOnce(&mut StoreState) -> Result<(T, bool), StorageError>,
    ) -> Result<T, StorageError> {
        let mut state = self.inner.state().write().await;
        let mut candidate = state.clone();
        let (out, changed) = mutate(&mut candidate)?;
        if changed {
            self.persist(&candidate).await?;
            *state = candidate;
        }
        Ok(out)
    }

    async fn persist(&self, state: &StoreState) -> Result<(), StorageError> {
        let bytes = serde_json::to_vec_pretty(state)
            .map_err(|e| StorageError::Backend(format!("failed to encode store: {}", e)))?;

        // Write to a sibling temp file then rename, so readers never see a
        // truncated document.
        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, &bytes)
            .await
            .map_err(|e| StorageError::Backend(format!("failed to write {}: {}", tmp.display(), e)))?;
        tokio::fs::rename(&tmp, &self.path).await.map_err(|e| {
            StorageError::Backend(format!("failed to replace {}: {}", self.path.display(), e))
        })?;
        Ok(())
    }
}

#[async_trait]
impl RecordStore for FileStore {
    async fn get_first(
        &self,
        record_type: &str,
        stage: Stage,
    ) -> Result<Option<StageRecord>, StorageError> {
        self.inner.get_first(record_type, stage).await
    }

    async fn get(
        &self,
        record_type: &str,
        id: RecordId,
        stage: Stage,
    ) -> Result<Option<StageRecord>, StorageError> {
        self.inner.get(record_type, id, stage).await
    }

    async fn list_owned(
        &self,
        owner: &RecordRef,
        stage: Stage,
    ) -> Result<Vec<StageRecord>, StorageError> {
        self.inner.list_owned(owner, stage).await
    }

    async fn create(
        &self,
        record_type: &str,
        content: RecordContent,
        owner: Option<RecordRef>,
    ) -> Result<StageRecord, StorageError> {
        self.commit(|state| Ok((state.create(record_type, content, owner), true)))
            .await
    }

    async fn write(
        &self,
        stage: Stage,
        record: &StageRecord,
        expected_version: Option<u64>,
    ) -> Result<StageRecord, StorageError> {
        self.commit(|state| {
            let stored = state.write(stage, record, expected_version)?;
            Ok((stored, true))
        })
        .await
    }

    async fn delete(
        &self,
        stage: Stage,
        record_type: &str,
        id: RecordId,
    ) -> Result<bool, StorageError> {
        self.commit(|state| {
            let removed = state.delete(stage, record_type, id);
            Ok((removed, removed))
        })
        .await
    }

    async fn get_version(
        &self,
        record_type: &str,
        id: RecordId,
        version: u64,
    ) -> Result<Option<VersionSnapshot>, StorageError> {
        self.inner.get_version(record_type, id, version).await
    }

    async fn list_versions(
        &self,
        record_type: &str,
        id: RecordId,
    ) -> Result<Vec<VersionSnapshot>, StorageError> {
        self.inner.list_versions(record_type, id).await
    }
}
