//! The publication controller: lifecycle of the single managed record.
//!
//! Every operation follows the same shape:
//! 1. Section access check (caller must be allowed into the section)
//! 2. Record lookup (created and published on first access)
//! 3. Capability check for the requested transition
//! 4. Storage effects, each naming its stage explicitly
//! 5. Hooks and status message

use std::collections::{BTreeSet, VecDeque};
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use solo_storage::{RecordContent, RecordId, RecordStore, Stage, StageRecord, VersionSnapshot};
use tracing::{debug, info, warn};

use crate::actions::{compute_available_actions, ActionSet};
use crate::binder::{FieldBinder, FieldData, SchemaBinder};
use crate::error::ControllerError;
use crate::hooks::SaveHook;
use crate::permission::{Caller, CallerCapabilities, PermissionOracle};
use crate::record::ManagedRecord;
use crate::section::SectionConfig;
use crate::view::EditView;

/// Route-level operation names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Edit,
    Save,
    Publish,
    Unpublish,
    Rollback,
    History,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Edit => "edit",
            Operation::Save => "save",
            Operation::Publish => "publish",
            Operation::Unpublish => "unpublish",
            Operation::Rollback => "rollback",
            Operation::History => "history",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a successful state transition.
#[derive(Debug, Clone)]
pub struct OperationOutcome {
    pub action: Operation,
    /// Human-readable status for the `X-Status` side channel.
    pub message: String,
    /// The record as persisted after the operation.
    pub record: ManagedRecord,
}

/// Generic over the store; `dyn RecordStore` works for runtime-selected backends.
pub struct PublicationController<S: RecordStore + ?Sized> {
    store: Arc<S>,
    section: SectionConfig,
    oracle: Arc<dyn PermissionOracle>,
    binder: Arc<dyn FieldBinder>,
    hooks: Vec<Arc<dyn SaveHook>>,
}

impl<S: RecordStore + ?Sized> PublicationController<S> {
    /// Controller with a [`SchemaBinder`] built from the section's fields.
    pub fn new(store: Arc<S>, section: SectionConfig, oracle: Arc<dyn PermissionOracle>) -> Self {
        let binder = Arc::new(SchemaBinder::new(section.fields.clone()));
        Self {
            store,
            section,
            oracle,
            binder,
            hooks: Vec::new(),
        }
    }

    pub fn with_binder(mut self, binder: Arc<dyn FieldBinder>) -> Self {
        self.binder = binder;
        self
    }

    /// Hooks run in registration order.
    pub fn with_hook(mut self, hook: Arc<dyn SaveHook>) -> Self {
        self.hooks.push(hook);
        self
    }

    pub fn section(&self) -> &SectionConfig {
        &self.section
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    // ── Lookup ───────────────────────────────────────────────────────────────

    /// Both stage rows of the section's record, if it exists anywhere.
    async fn load(&self) -> Result<Option<ManagedRecord>, ControllerError> {
        let record_type = &self.section.record_type;
        let draft = self.store.get_first(record_type, Stage::Draft).await?;
        let live = match &draft {
            Some(d) => self.store.get(record_type, d.id, Stage::Live).await?,
            None => self.store.get_first(record_type, Stage::Live).await?,
        };
        Ok(ManagedRecord::new(draft, live))
    }

    async fn reload(&self, id: RecordId) -> Result<ManagedRecord, ControllerError> {
        let record_type = &self.section.record_type;
        let draft = self.store.get(record_type, id, Stage::Draft).await?;
        let live = self.store.get(record_type, id, Stage::Live).await?;
        ManagedRecord::new(draft, live).ok_or_else(|| self.unavailable())
    }

    fn unavailable(&self) -> ControllerError {
        ControllerError::RecordUnavailable {
            record_type: self.section.record_type.clone(),
        }
    }

    /// The managed record, synthesized and published when none exists.
    ///
    /// Once a record exists, repeated calls return it without writing.
    pub async fn find_or_create(&self) -> Result<ManagedRecord, ControllerError> {
        if let Some(record) = self.load().await? {
            debug!(
                record_type = %self.section.record_type,
                id = %record.id(),
                "found managed record"
            );
            return Ok(record);
        }

        let record_type = &self.section.record_type;
        let created = self
            .store
            .create(record_type, RecordContent::titled(record_type.as_str()), None)
            .await?;
        self.store.write(Stage::Live, &created, None).await?;
        info!(record_type = %record_type, id = %created.id, "created and published managed record");

        // A concurrent creator may have won the lowest id.
        self.load().await?.ok_or_else(|| self.unavailable())
    }

    // ── Permissions ──────────────────────────────────────────────────────────

    fn denied(&self, action: Operation, caller: &Caller) -> ControllerError {
        warn!(
            section = %self.section.name,
            caller = %caller.id,
            action = %action,
            "permission denied"
        );
        ControllerError::PermissionDenied {
            action,
            caller: caller.id.clone(),
        }
    }

    fn ensure_view(&self, action: Operation, caller: &Caller) -> Result<(), ControllerError> {
        if self.section.can_view(self.oracle.as_ref(), caller) {
            Ok(())
        } else {
            Err(self.denied(action, caller))
        }
    }

    pub fn capabilities(&self, caller: &Caller, record: &ManagedRecord) -> CallerCapabilities {
        CallerCapabilities::resolve(self.oracle.as_ref(), caller, record)
    }

    pub async fn available_actions(&self, caller: &Caller) -> Result<ActionSet, ControllerError> {
        self.ensure_view(Operation::Edit, caller)?;
        let record = self.find_or_create().await?;
        let caps = self.capabilities(caller, &record);
        Ok(compute_available_actions(&record.state(), &caps))
    }

    // ── Transitions ──────────────────────────────────────────────────────────

    /// Bind `data` into the Draft copy and persist it, optionally publishing.
    ///
    /// Nothing is written when a permission or validation check fails. The
    /// Draft write and the Live writes are separate store calls: when
    /// publishing fails after the Draft write, the error is returned, the
    /// saved Draft stays in place and no hooks run.
    pub async fn save(
        &self,
        caller: &Caller,
        data: &FieldData,
        publish_requested: bool,
        expected_version: Option<u64>,
    ) -> Result<OperationOutcome, ControllerError> {
        let action = if publish_requested {
            Operation::Publish
        } else {
            Operation::Save
        };
        self.ensure_view(action, caller)?;
        let record = self.find_or_create().await?;
        let caps = self.capabilities(caller, &record);
        if publish_requested && !caps.can_publish {
            return Err(self.denied(Operation::Publish, caller));
        }
        if !caps.can_edit {
            return Err(self.denied(Operation::Save, caller));
        }

        let base = record.draft().or(record.live()).ok_or_else(|| self.unavailable())?;
        let mut content = base.content.clone();
        if let Err(errors) = self.binder.save_into(&mut content, data) {
            debug!(section = %self.section.name, %errors, "submission rejected");
            return Err(ControllerError::ValidationFailed(errors));
        }

        let mut row = base.clone();
        row.content = content;
        let written = self.store.write(Stage::Draft, &row, expected_version).await?;
        info!(
            record_type = %written.record_type,
            id = %written.id,
            version = written.version,
            caller = %caller.id,
            "saved draft"
        );

        if publish_requested {
            let published = self.publish_recursive(&written).await?;
            info!(id = %written.id, published, "published to live");
        }

        let record = self.reload(written.id).await?;
        let message = if publish_requested {
            format!("Published '{}' successfully.", record.title())
        } else {
            format!("Saved '{}' successfully.", record.title())
        };
        let outcome = OperationOutcome {
            action,
            message,
            record,
        };
        for hook in &self.hooks {
            hook.after_save(&outcome);
        }
        Ok(outcome)
    }

    /// Shorthand for `save(.., publish_requested = true, ..)`.
    pub async fn publish(
        &self,
        caller: &Caller,
        data: &FieldData,
        expected_version: Option<u64>,
    ) -> Result<OperationOutcome, ControllerError> {
        self.save(caller, data, true, expected_version).await
    }

    /// Copy `root` and everything it owns from Draft to Live, breadth-first.
    /// Returns the number of rows written.
    async fn publish_recursive(&self, root: &StageRecord) -> Result<usize, ControllerError> {
        let mut queue = VecDeque::from([root.clone()]);
        let mut visited = BTreeSet::new();
        let mut written = 0;

        while let Some(row) = queue.pop_front() {
            if !visited.insert(row.record_ref()) {
                continue;
            }
            self.store.write(Stage::Live, &row, None).await?;
            written += 1;
            let owned = self.store.list_owned(&row.record_ref(), Stage::Draft).await?;
            queue.extend(owned);
        }
        Ok(written)
    }

    /// Remove the Live copy. The Draft copy and the record id survive.
    pub async fn unpublish(&self, caller: &Caller) -> Result<OperationOutcome, ControllerError> {
        self.ensure_view(Operation::Unpublish, caller)?;
        let record = self.find_or_create().await?;
        let caps = self.capabilities(caller, &record);
        if !(caps.can_publish && caps.can_unpublish) {
            return Err(self.denied(Operation::Unpublish, caller));
        }

        let removed = self
            .store
            .delete(Stage::Live, record.record_type(), record.id())
            .await?;
        info!(id = %record.id(), removed, caller = %caller.id, "unpublished");

        let title = record.title().to_string();
        let record = self.reload(record.id()).await?;
        Ok(OperationOutcome {
            action: Operation::Unpublish,
            message: format!("Unpublished '{title}'."),
            record,
        })
    }

    /// Overwrite Draft with history version `target_version`, or with the
    /// current Live content when no version is given. Live is not touched
    /// and history only grows.
    pub async fn rollback(
        &self,
        caller: &Caller,
        target_version: Option<u64>,
    ) -> Result<OperationOutcome, ControllerError> {
        self.ensure_view(Operation::Rollback, caller)?;
        let record = self.find_or_create().await?;
        if !self.capabilities(caller, &record).can_edit {
            return Err(self.denied(Operation::Rollback, caller));
        }

        let mut row = record
            .draft()
            .or(record.live())
            .cloned()
            .ok_or_else(|| self.unavailable())?;
        let message = match target_version {
            Some(version) => {
                let snapshot = self
                    .store
                    .get_version(record.record_type(), record.id(), version)
                    .await?
                    .ok_or(ControllerError::VersionNotFound { version })?;
                row.content = snapshot.content;
                format!("Rolled back to version #{version}.")
            }
            None => {
                let live = record.live().ok_or_else(|| self.unavailable())?;
                row.content = live.content.clone();
                "Rolled back to published version.".to_string()
            }
        };

        let written = self.store.write(Stage::Draft, &row, None).await?;
        info!(
            id = %written.id,
            version = written.version,
            target = ?target_version,
            caller = %caller.id,
            "rolled back draft"
        );

        Ok(OperationOutcome {
            action: Operation::Rollback,
            message,
            record: self.reload(written.id).await?,
        })
    }

    // ── Views ────────────────────────────────────────────────────────────────

    /// The edit surface. An unavailable record degrades to a read-only view.
    pub async fn edit_view(&self, caller: &Caller) -> Result<EditView, ControllerError> {
        self.ensure_view(Operation::Edit, caller)?;
        let record = match self.find_or_create().await {
            Ok(record) => record,
            Err(ControllerError::RecordUnavailable { .. }) => {
                return Ok(EditView::empty(&self.section.name))
            }
            Err(err) => return Err(err),
        };
        let caps = self.capabilities(caller, &record);
        let actions = compute_available_actions(&record.state(), &caps);
        let history = self
            .store
            .list_versions(record.record_type(), record.id())
            .await?;
        Ok(EditView::new(
            &self.section.name,
            &record,
            actions,
            history.len(),
            self.section.preview_link(),
        ))
    }

    pub async fn history(&self, caller: &Caller) -> Result<Vec<VersionSnapshot>, ControllerError> {
        self.ensure_view(Operation::History, caller)?;
        let record = self.find_or_create().await?;
        Ok(self
            .store
            .list_versions(record.record_type(), record.id())
            .await?)
    }

    /// The record's row on `stage`, for previews.
    pub async fn read_stage(
        &self,
        caller: &Caller,
        stage: Stage,
    ) -> Result<Option<StageRecord>, ControllerError> {
        self.ensure_view(Operation::Edit, caller)?;
        let record = self.find_or_create().await?;
        Ok(match stage {
            Stage::Draft => record.draft().cloned(),
            Stage::Live => record.live().cloned(),
        })
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::{ActionKind, ActionState};
    use crate::binder::{FieldKind, FieldSpec};
    use crate::hooks::RecordingHook;
    use crate::permission::{CapabilityCode, GrantTable};
    use serde_json::json;
    use solo_storage::{MemoryStore, RecordRef, StorageError};

    const ACCESS: &str = "CMS_ACCESS_HomePageAdmin";

    fn section() -> SectionConfig {
        let mut s = SectionConfig::new("homepage", "HomePage", CapabilityCode::new(ACCESS).unwrap());
        s.fields = vec![FieldSpec {
            name: "Content".into(),
            kind: FieldKind::Html,
            required: false,
            max_length: Some(50),
        }];
        s
    }

    fn grants() -> GrantTable {
        let access = CapabilityCode::new(ACCESS).unwrap();
        GrantTable::new()
            .with_grant(
                "admin",
                [
                    access.clone(),
                    CapabilityCode::edit(),
                    CapabilityCode::publish(),
                    CapabilityCode::unpublish(),
                ],
            )
            .with_grant("editor", [access.clone(), CapabilityCode::edit()])
            .with_grant("viewer", [access])
            .with_grant("outsider", [CapabilityCode::edit(), CapabilityCode::publish()])
    }

    fn controller() -> PublicationController<MemoryStore> {
        PublicationController::new(Arc::new(MemoryStore::new()), section(), Arc::new(grants()))
    }

    fn admin() -> Caller {
        Caller::new("admin")
    }

    fn data(pairs: &[(&str, serde_json::Value)]) -> FieldData {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    async fn draft_and_live<S: RecordStore>(c: &PublicationController<S>) -> (StageRecord, StageRecord) {
        let r = c.find_or_create().await.unwrap();
        (r.draft().cloned().unwrap(), r.live().cloned().unwrap())
    }

    // ── find_or_create ──

    #[tokio::test]
    async fn find_or_create_synthesizes_published_record() {
        let c = controller();
        let r = c.find_or_create().await.unwrap();
        assert_eq!(r.title(), "HomePage");
        assert!(r.is_on_draft());
        assert!(r.is_published());
        assert!(!r.stages_differ());
    }

    #[tokio::test]
    async fn find_or_create_is_idempotent() {
        let c = controller();
        let first = c.find_or_create().await.unwrap();
        for _ in 0..5 {
            let again = c.find_or_create().await.unwrap();
            assert_eq!(again.id(), first.id());
            assert_eq!(again.version(), first.version());
        }
        let history = c.history(&admin()).await.unwrap();
        assert_eq!(history.len(), 2);
        assert!(c
            .store()
            .get(&c.section().record_type, RecordId(first.id().0 + 1), Stage::Draft)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn find_or_create_adopts_existing_record() {
        let store = Arc::new(MemoryStore::new());
        let existing = store
            .create("HomePage", RecordContent::titled("Welcome"), None)
            .await
            .unwrap();
        let c = PublicationController::new(store, section(), Arc::new(grants()));
        let r = c.find_or_create().await.unwrap();
        assert_eq!(r.id(), existing.id);
        assert_eq!(r.title(), "Welcome");
        assert!(!r.is_published());
    }

    // ── save / publish ──

    #[tokio::test]
    async fn save_writes_draft_only() {
        let c = controller();
        let (_, live_before) = draft_and_live(&c).await;

        let out = c
            .save(&admin(), &data(&[("Title", json!("Home v2"))]), false, None)
            .await
            .unwrap();

        assert_eq!(out.action, Operation::Save);
        assert_eq!(out.message, "Saved 'Home v2' successfully.");
        assert!(out.record.stages_differ());
        assert_eq!(out.record.live().unwrap().content, live_before.content);
    }

    #[tokio::test]
    async fn publish_copies_draft_to_live_and_bumps_version() {
        let c = controller();
        let before = c.find_or_create().await.unwrap().version();

        let out = c
            .publish(&admin(), &data(&[("Content", json!("<p>Hi</p>"))]), None)
            .await
            .unwrap();

        assert_eq!(out.message, "Published 'HomePage' successfully.");
        let r = out.record;
        assert_eq!(r.live().unwrap().content, r.draft().unwrap().content);
        assert!(r.version() > before);
        assert!(!r.stages_differ());
    }

    #[tokio::test]
    async fn publish_recurses_into_owned_records() {
        let c = controller();
        let root = c.find_or_create().await.unwrap();
        let owner = RecordRef {
            record_type: root.record_type().to_string(),
            id: root.id(),
        };
        let child = c
            .store()
            .create("Block", RecordContent::titled("Hero"), Some(owner.clone()))
            .await
            .unwrap();
        let grandchild = c
            .store()
            .create("Block", RecordContent::titled("Button"), Some(child.record_ref()))
            .await
            .unwrap();

        c.publish(&admin(), &FieldData::new(), None).await.unwrap();

        for id in [child.id, grandchild.id] {
            assert!(c.store().get("Block", id, Stage::Live).await.unwrap().is_some());
        }
    }

    #[tokio::test]
    async fn publish_without_capability_leaves_both_stages_untouched() {
        let c = controller();
        let (draft, live) = draft_and_live(&c).await;

        let err = c
            .save(&Caller::new("editor"), &data(&[("Title", json!("Nope"))]), true, None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ControllerError::PermissionDenied {
                action: Operation::Publish,
                ..
            }
        ));

        let (draft_after, live_after) = draft_and_live(&c).await;
        assert_eq!(draft_after, draft);
        assert_eq!(live_after, live);
    }

    #[tokio::test]
    async fn save_requires_edit_capability() {
        let c = controller();
        let err = c
            .save(&Caller::new("viewer"), &FieldData::new(), false, None)
            .await
            .unwrap_err();
        assert!(matches!(err, ControllerError::PermissionDenied { action: Operation::Save, .. }));
    }

    #[tokio::test]
    async fn section_access_gates_every_operation() {
        let c = controller();
        let outsider = Caller::new("outsider");
        assert!(c.edit_view(&outsider).await.is_err());
        assert!(c.save(&outsider, &FieldData::new(), false, None).await.is_err());
        assert!(c.unpublish(&outsider).await.is_err());
        assert!(c.rollback(&outsider, None).await.is_err());
        assert!(c.history(&outsider).await.is_err());
    }

    #[tokio::test]
    async fn invalid_submission_persists_nothing() {
        let c = controller();
        let (draft, _) = draft_and_live(&c).await;

        let err = c
            .save(&admin(), &data(&[("Unknown", json!("x"))]), true, None)
            .await
            .unwrap_err();

        match err {
            ControllerError::ValidationFailed(errors) => {
                assert!(errors.for_field("Unknown").is_some())
            }
            other => panic!("expected validation failure, got {other:?}"),
        }
        let (draft_after, _) = draft_and_live(&c).await;
        assert_eq!(draft_after, draft);
    }

    #[tokio::test]
    async fn stale_expected_version_is_a_write_conflict() {
        let c = controller();
        let (draft, _) = draft_and_live(&c).await;
        c.save(&admin(), &data(&[("Title", json!("First"))]), false, Some(draft.version))
            .await
            .unwrap();

        let err = c
            .save(&admin(), &data(&[("Title", json!("Second"))]), false, Some(draft.version))
            .await
            .unwrap_err();
        assert!(matches!(err, ControllerError::WriteConflict { expected, .. } if expected == draft.version));
        assert_eq!(c.find_or_create().await.unwrap().title(), "First");
    }

    #[tokio::test]
    async fn hooks_see_persisted_outcome() {
        let hook = Arc::new(RecordingHook::new());
        let c = controller().with_hook(hook.clone());
        c.publish(&admin(), &data(&[("Title", json!("Hooked"))]), None)
            .await
            .unwrap();

        let seen = hook.outcomes();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].action, Operation::Publish);
        assert_eq!(seen[0].record.live().unwrap().content.title, "Hooked");
    }

    /// Memory store whose Live writes fail while `live_down` is set.
    #[derive(Default)]
    struct LiveOutage {
        inner: MemoryStore,
        live_down: std::sync::atomic::AtomicBool,
    }

    #[async_trait::async_trait]
    impl RecordStore for LiveOutage {
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
            self.inner.create(record_type, content, owner).await
        }

        async fn write(
            &self,
            stage: Stage,
            record: &StageRecord,
            expected_version: Option<u64>,
        ) -> Result<StageRecord, StorageError> {
            if stage == Stage::Live && self.live_down.load(std::sync::atomic::Ordering::SeqCst) {
                return Err(StorageError::Backend("live stage unavailable".into()));
            }
            self.inner.write(stage, record, expected_version).await
        }

        async fn delete(
            &self,
            stage: Stage,
            record_type: &str,
            id: RecordId,
        ) -> Result<bool, StorageError> {
            self.inner.delete(stage, record_type, id).await
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

    #[tokio::test]
    async fn failed_publish_keeps_saved_draft() {
        let store = Arc::new(LiveOutage::default());
        let hook = Arc::new(RecordingHook::new());
        let c = PublicationController::new(store.clone(), section(), Arc::new(grants()))
            .with_hook(hook.clone());
        let (_, live) = draft_and_live(&c).await;

        store
            .live_down
            .store(true, std::sync::atomic::Ordering::SeqCst);
        let err = c
            .publish(&admin(), &data(&[("Title", json!("Half done"))]), None)
            .await
            .unwrap_err();
        assert!(matches!(err, ControllerError::Storage(_)));
        assert!(hook.outcomes().is_empty());

        let r = c.find_or_create().await.unwrap();
        assert_eq!(r.draft().unwrap().content.title, "Half done");
        assert_eq!(r.live().unwrap().content.title, live.content.title);
        assert!(r.stages_differ());
    }

    // ── unpublish ──

    #[tokio::test]
    async fn unpublish_keeps_draft_and_identity() {
        let c = controller();
        c.save(&admin(), &data(&[("Title", json!("Draft edit"))]), false, None)
            .await
            .unwrap();
        let (draft, _) = draft_and_live(&c).await;

        let out = c.unpublish(&admin()).await.unwrap();
        assert_eq!(out.message, "Unpublished 'Draft edit'.");
        assert!(!out.record.is_published());
        assert_eq!(out.record.draft().unwrap(), &draft);

        // the same id keeps working on Draft
        let again = c
            .save(&admin(), &data(&[("Title", json!("After"))]), false, None)
            .await
            .unwrap();
        assert_eq!(again.record.id(), draft.id);
    }

    #[tokio::test]
    async fn unpublish_requires_unpublish_capability() {
        let table = grants().with_grant(
            "publisher",
            [
                CapabilityCode::new(ACCESS).unwrap(),
                CapabilityCode::edit(),
                CapabilityCode::publish(),
            ],
        );
        let c = PublicationController::new(Arc::new(MemoryStore::new()), section(), Arc::new(table));
        let err = c.unpublish(&Caller::new("publisher")).await.unwrap_err();
        assert!(matches!(err, ControllerError::PermissionDenied { action: Operation::Unpublish, .. }));
        assert!(c.find_or_create().await.unwrap().is_published());
    }

    // ── rollback ──

    #[tokio::test]
    async fn rollback_to_version_restores_snapshot_and_keeps_history() {
        let c = controller();
        let v = c
            .save(&admin(), &data(&[("Title", json!("Keep me"))]), false, None)
            .await
            .unwrap()
            .record
            .draft()
            .unwrap()
            .version;
        c.save(&admin(), &data(&[("Title", json!("Overwritten"))]), false, None)
            .await
            .unwrap();
        let history_before = c.history(&admin()).await.unwrap();

        let out = c.rollback(&admin(), Some(v)).await.unwrap();
        assert_eq!(out.message, format!("Rolled back to version #{v}."));

        let snapshot = c
            .store()
            .get_version("HomePage", out.record.id(), v)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(out.record.draft().unwrap().content, snapshot.content);

        let history_after = c.history(&admin()).await.unwrap();
        assert_eq!(&history_after[..history_before.len()], &history_before[..]);
        assert_eq!(history_after.len(), history_before.len() + 1);
    }

    #[tokio::test]
    async fn rollback_without_version_reverts_to_live() {
        let c = controller();
        let (_, live) = draft_and_live(&c).await;
        c.save(&admin(), &data(&[("Title", json!("Scratch"))]), false, None)
            .await
            .unwrap();

        let out = c.rollback(&Caller::new("editor"), None).await.unwrap();
        assert_eq!(out.message, "Rolled back to published version.");
        assert_eq!(out.record.draft().unwrap().content, live.content);
        assert_eq!(out.record.live().unwrap(), &live);
        assert!(!out.record.stages_differ());
    }

    #[tokio::test]
    async fn rollback_errors() {
        let c = controller();
        let err = c.rollback(&admin(), Some(99)).await.unwrap_err();
        assert!(matches!(err, ControllerError::VersionNotFound { version: 99 }));

        let err = c.rollback(&Caller::new("viewer"), None).await.unwrap_err();
        assert!(matches!(err, ControllerError::PermissionDenied { action: Operation::Rollback, .. }));

        c.unpublish(&admin()).await.unwrap();
        let err = c.rollback(&admin(), None).await.unwrap_err();
        assert!(matches!(err, ControllerError::RecordUnavailable { .. }));
    }

    // ── views ──

    #[tokio::test]
    async fn edit_view_reflects_state_and_caller() {
        let c = controller();
        let view = c.edit_view(&admin()).await.unwrap();
        assert_eq!(view.history_len, 2);
        assert_eq!(view.preview_link.as_deref(), Some("/?stage=Stage"));
        assert!(!view.read_only);
        assert_eq!(
            view.actions.get(ActionKind::Publish).map(|a| a.state),
            Some(ActionState::Satisfied)
        );
        assert!(!view.actions.contains(ActionKind::Rollback));

        let editor = c.edit_view(&Caller::new("editor")).await.unwrap();
        assert_eq!(editor.actions.kinds(), vec![ActionKind::Save]);
        assert_eq!(editor.etag, view.etag);
    }

    #[tokio::test]
    async fn read_stage_returns_requested_copy() {
        let c = controller();
        c.save(&admin(), &data(&[("Title", json!("Preview"))]), false, None)
            .await
            .unwrap();
        let draft = c.read_stage(&admin(), Stage::Draft).await.unwrap().unwrap();
        let live = c.read_stage(&admin(), Stage::Live).await.unwrap().unwrap();
        assert_eq!(draft.content.title, "Preview");
        assert_eq!(live.content.title, "HomePage");
    }
}
