//! In-memory `RecordStore` backend.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tokio::sync::RwLock;

use crate::error::StorageError;
use crate::record::{RecordContent, RecordId, RecordRef, Stage, StageRecord, VersionSnapshot};
use crate::traits::RecordStore;

type StageRows = BTreeMap<String, BTreeMap<RecordId, StageRecord>>;

/// Complete backend state. Also the on-disk document of [`crate::FileStore`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct StoreState {
    next_id: u64,
    #[serde(default)]
    draft: StageRows,
    #[serde(default)]
    live: StageRows,
    #[serde(default)]
    history: BTreeMap<String, BTreeMap<RecordId, Vec<VersionSnapshot>>>,
}

impl StoreState {
    fn rows(&self, stage: Stage) -> &StageRows {
        match stage {
            Stage::Draft => &self.draft,
            Stage::Live => &self.live,
        }
    }

    fn row(&self, record_type: &str, id: RecordId, stage: Stage) -> Option<&StageRecord> {
        self.rows(stage).get(record_type).and_then(|rows| rows.get(&id))
    }

    fn latest_version(&self, record_type: &str, id: RecordId) -> Option<u64> {
        self.history
            .get(record_type)
            .and_then(|by_id| by_id.get(&id))
            .and_then(|versions| versions.last())
            .map(|s| s.version)
    }

    pub(crate) fn create(
        &mut self,
        record_type: &str,
        content: RecordContent,
        owner: Option<RecordRef>,
    ) -> StageRecord {
        self.next_id += 1;
        let id = RecordId(self.next_id);
        let now = OffsetDateTime::now_utc();
        let record = StageRecord {
            id,
            record_type: record_type.to_string(),
            content: content.clone(),
            version: 1,
            owner,
            last_edited: now,
            last_published: None,
        };
        self.history
            .entry(record_type.to_string())
            .or_default()
            .insert(
                id,
                vec![VersionSnapshot {
                    record_type: record_type.to_string(),
                    id,
                    version: 1,
                    stage: Stage::Draft,
                    content,
                    published: false,
                    saved_at: now,
                }],
            );
        self.draft
            .entry(record_type.to_string())
            .or_default()
            .insert(id, record.clone());
        record
    }

    pub(crate) fn write(
        &mut self,
        stage: Stage,
        record: &StageRecord,
        expected_version: Option<u64>,
    ) -> Result<StageRecord, StorageError> {
        let latest = self
            .latest_version(&record.record_type, record.id)
            .ok_or_else(|| StorageError::RecordNotFound {
                record_type: record.record_type.clone(),
                id: record.id,
                stage,
            })?;

        if let Some(expected) = expected_version {
            let actual = self
                .row(&record.record_type, record.id, stage)
                .map(|r| r.version);
            if actual != Some(expected) {
                return Err(StorageError::ConcurrentConflict {
                    record_type: record.record_type.clone(),
                    id: record.id,
                    stage,
                    expected_version: expected,
                    actual_version: actual,
                });
            }
        }

        let version = latest + 1;
        let now = OffsetDateTime::now_utc();
        let mut stored = record.clone();
        stored.version = version;
        match stage {
            Stage::Draft => stored.last_edited = now,
            Stage::Live => stored.last_published = Some(now),
        }

        self.history
            .entry(record.record_type.clone())
            .or_default()
            .entry(record.id)
            .or_default()
            .push(VersionSnapshot {
                record_type: record.record_type.clone(),
                id: record.id,
                version,
                stage,
                content: stored.content.clone(),
                published: stage == Stage::Live,
                saved_at: now,
            });

        let rows = match stage {
            Stage::Draft => &mut self.draft,
            Stage::Live => &mut self.live,
        };
        rows.entry(record.record_type.clone())
            .or_default()
            .insert(record.id, stored.clone());
        Ok(stored)
    }

    pub(crate) fn delete(&mut self, stage: Stage, record_type: &str, id: RecordId) -> bool {
        let rows = match stage {
            Stage::Draft => &mut self.draft,
            Stage::Live => &mut self.live,
        };
        rows.get_mut(record_type)
            .and_then(|by_id| by_id.remove(&id))
            .is_some()
    }
}

/// `RecordStore` backed by process memory.
///
/// Clones share the same underlying state.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<StoreState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_state(state: StoreState) -> Self {
        Self {
            state: Arc::new(RwLock::new(state)),
        }
    }

    pub(crate) fn state(&self) -> &RwLock<StoreState> {
        &self.state
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn get_first(
        &self,
        record_type: &str,
        stage: Stage,
    ) -> Result<Option<StageRecord>, StorageError> {
        let state = self.state.read().await;
        Ok(state
            .rows(stage)
            .get(record_type)
            .and_then(|rows| rows.values().next())
            .cloned())
    }

    async fn get(
        &self,
        record_type: &str,
        id: RecordId,
        stage: Stage,
    ) -> Result<Option<StageRecord>, StorageError> {
        let state = self.state.read().await;
        Ok(state.row(record_type, id, stage).cloned())
    }

    async fn list_owned(
        &self,
        owner: &RecordRef,
        stage: Stage,
    ) -> Result<Vec<StageRecord>, StorageError> {
        let state = self.state.read().await;
        let mut owned: Vec<StageRecord> = state
            .rows(stage)
            .values()
            .flat_map(|rows| rows.values())
            .filter(|r| r.owner.as_ref() == Some(owner))
            .cloned()
            .collect();
        owned.sort_by_key(|r| r.id);
        Ok(owned)
    }

    async fn create(
        &self,
        record_type: &str,
        content: RecordContent,
        owner: Option<RecordRef>,
    ) -> Result<StageRecord, StorageError> {
        let mut state = self.state.write().await;
        Ok(state.create(record_type, content, owner))
    }

    async fn write(
        &self,
        stage: Stage,
        record: &StageRecord,
        expected_version: Option<u64>,
    ) -> Result<StageRecord, StorageError> {
        let mut state = self.state.write().await;
        state.write(stage, record, expected_version)
    }

    async fn delete(
        &self,
        stage: Stage,
        record_type: &str,
        id: RecordId,
    ) -> Result<bool, StorageError> {
        let mut state = self.state.write().await;
        Ok(state.delete(stage, record_type, id))
    }

    async fn get_version(
        &self,
        record_type: &str,
        id: RecordId,
        version: u64,
    ) -> Result<Option<VersionSnapshot>, StorageError> {
        let state = self.state.read().await;
        Ok(state
            .history
            .get(record_type)
            .and_then(|by_id| by_id.get(&id))
            .and_then(|versions| versions.iter().find(|s| s.version == version))
            .cloned())
    }

    async fn list_versions(
        &self,
        record_type: &str,
        id: RecordId,
    ) -> Result<Vec<VersionSnapshot>, StorageError> {
        let state = self.state.read().await;
        Ok(state
            .history
            .get(record_type)
            .and_then(|by_id| by_id.get(&id))
            .cloned()
            .unwrap_or_default())
    }
}
