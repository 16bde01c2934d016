use async_trait::async_trait;

use crate::error::StorageError;
use crate::record::{RecordContent, RecordId, RecordRef, Stage, StageRecord, VersionSnapshot};

/// The storage trait for staged, versioned records.
///
/// A `RecordStore` keeps up to two rows per record (one per [`Stage`]) and an
/// append-only version history shared by both stages.
///
/// ## Explicit stages
///
/// Every stage-sensitive call names its [`Stage`]. Implementations must not
/// keep a "current stage" between calls.
///
/// ## Versioning
///
/// Every successful `create` or `write` appends exactly one
/// [`VersionSnapshot`] whose version is one greater than the latest version
/// in that record's history. Snapshots are never modified or removed, and
/// `delete` leaves history untouched.
///
/// ## OCC Conflict Detection
///
/// `write` accepts an optional expected version. When given, the write only
/// proceeds if the row currently on the target stage carries that version;
/// otherwise it returns `Err(StorageError::ConcurrentConflict { ... })` and
/// nothing is written.
///
/// ## Thread Safety
///
/// Implementations must be `Send + Sync + 'static` to be used in axum
/// application state and across async task boundaries.
#[async_trait]
pub trait RecordStore: Send + Sync + 'static {
    // ── Reads ────────────────────────────────────────────────────────────────

    /// The row with the lowest id of `record_type` on `stage`, if any.
    async fn get_first(
        &self,
        record_type: &str,
        stage: Stage,
    ) -> Result<Option<StageRecord>, StorageError>;

    /// The row for `(record_type, id)` on `stage`, if any.
    async fn get(
        &self,
        record_type: &str,
        id: RecordId,
        stage: Stage,
    ) -> Result<Option<StageRecord>, StorageError>;

    /// All rows on `stage` whose owner is `owner`, ordered by id.
    async fn list_owned(
        &self,
        owner: &RecordRef,
        stage: Stage,
    ) -> Result<Vec<StageRecord>, StorageError>;

    // ── Writes ───────────────────────────────────────────────────────────────

    /// Allocate a fresh id and write `content` as a Draft row at version 1.
    async fn create(
        &self,
        record_type: &str,
        content: RecordContent,
        owner: Option<RecordRef>,
    ) -> Result<StageRecord, StorageError>;

    /// Persist `record.content` on `stage`, appending a new history version.
    ///
    /// Returns the stored row, carrying its newly assigned version.
    async fn write(
        &self,
        stage: Stage,
        record: &StageRecord,
        expected_version: Option<u64>,
    ) -> Result<StageRecord, StorageError>;

    /// Remove the row on `stage` only. Returns whether a row was removed.
    async fn delete(
        &self,
        stage: Stage,
        record_type: &str,
        id: RecordId,
    ) -> Result<bool, StorageError>;

    // ── History ──────────────────────────────────────────────────────────────

    /// A single history entry.
    async fn get_version(
        &self,
        record_type: &str,
        id: RecordId,
        version: u64,
    ) -> Result<Option<VersionSnapshot>, StorageError>;

    /// The full history of a record, ascending by version.
    async fn list_versions(
        &self,
        record_type: &str,
        id: RecordId,
    ) -> Result<Vec<VersionSnapshot>, StorageError>;
}
