use solo_storage::StorageError;

use crate::binder::ValidationErrors;
use crate::controller::Operation;

/// Failure of a controller operation.
///
/// Every variant is converted to a response at the operation boundary by
/// [`crate::negotiate`]; none of them is fatal to the process.
#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    #[error("caller '{caller}' may not {action}")]
    PermissionDenied { action: Operation, caller: String },

    #[error("validation failed: {0}")]
    ValidationFailed(ValidationErrors),

    #[error("no {record_type} record is available")]
    RecordUnavailable { record_type: String },

    #[error("version {version} does not exist")]
    VersionNotFound { version: u64 },

    #[error("record changed since version {expected} (now {})", display_version(.actual))]
    WriteConflict { expected: u64, actual: Option<u64> },

    #[error("storage error: {0}")]
    Storage(StorageError),
}

fn display_version(version: &Option<u64>) -> String {
    match version {
        Some(v) => v.to_string(),
        None => "absent".to_string(),
    }
}

impl From<StorageError> for ControllerError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::ConcurrentConflict {
                expected_version,
                actual_version,
                ..
            } => ControllerError::WriteConflict {
                expected: expected_version,
                actual: actual_version,
            },
            other => ControllerError::Storage(other),
        }
    }
}
