use crate::record::{RecordId, Stage};

/// All errors that can be returned by a RecordStore implementation.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// No row for (record_type, id) exists on the given stage.
    #[error("record not found: {record_type}#{id} on {stage}")]
    RecordNotFound {
        record_type: String,
        id: RecordId,
        stage: Stage,
    },

    /// Optimistic concurrency control conflict: the stage row moved since the
    /// caller read it. `actual_version` is `None` when the row is absent.
    #[error(
        "concurrent conflict on {record_type}#{id} ({stage}): expected version {expected_version}, found {actual_version:?}"
    )]
    ConcurrentConflict {
        record_type: String,
        id: RecordId,
        stage: Stage,
        expected_version: u64,
        actual_version: Option<u64>,
    },

    /// A backend-specific storage error (I/O, serialization, etc.).
    #[error("storage backend error: {0}")]
    Backend(String),
}
