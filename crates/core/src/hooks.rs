//! Post-save extension points.

use std::sync::Mutex;

use tracing::info;

use crate::controller::OperationOutcome;

/// Invoked after a save (and any requested publish) has been persisted.
pub trait SaveHook: Send + Sync {
    fn after_save(&self, outcome: &OperationOutcome);
}

/// Emits one structured log event per save.
#[derive(Debug, Default, Clone, Copy)]
pub struct AuditLog;

impl SaveHook for AuditLog {
    fn after_save(&self, outcome: &OperationOutcome) {
        info!(
            action = %outcome.action,
            record_type = outcome.record.record_type(),
            id = %outcome.record.id(),
            version = outcome.record.version(),
            published = outcome.record.is_published(),
            "record saved"
        );
    }
}

/// Keeps every outcome it sees. Useful for embedding and tests.
#[derive(Debug, Default)]
pub struct RecordingHook {
    seen: Mutex<Vec<OperationOutcome>>,
}

impl RecordingHook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn outcomes(&self) -> Vec<OperationOutcome> {
        match self.seen.lock() {
            Ok(seen) => seen.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl SaveHook for RecordingHook {
    fn after_save(&self, outcome: &OperationOutcome) {
        match self.seen.lock() {
            Ok(mut seen) => seen.push(outcome.clone()),
            Err(poisoned) => poisoned.into_inner().push(outcome.clone()),
        }
    }
}
