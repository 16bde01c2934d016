//! The customised edit surface handed to renderers.

use serde::{Deserialize, Serialize};
use solo_storage::{RecordContent, RecordId};
use time::OffsetDateTime;

use crate::actions::ActionSet;
use crate::record::{ManagedRecord, PublicationState};

/// Serializable projection of the managed record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordView {
    pub id: RecordId,
    pub record_type: String,
    pub content: RecordContent,
    pub version: u64,
    pub state: PublicationState,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_edited: Option<OffsetDateTime>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_published: Option<OffsetDateTime>,
}

impl From<&ManagedRecord> for RecordView {
    fn from(record: &ManagedRecord) -> Self {
        Self {
            id: record.id(),
            record_type: record.record_type().to_string(),
            content: record.content().clone(),
            version: record.version(),
            state: record.state(),
            last_edited: record.draft().map(|r| r.last_edited),
            last_published: record.live().and_then(|r| r.last_published),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditView {
    pub section: String,
    pub record: Option<RecordView>,
    pub actions: ActionSet,
    pub history_len: usize,
    pub preview_link: Option<String>,
    /// Fingerprint of the shown content.
    pub etag: Option<String>,
    pub read_only: bool,
}

impl EditView {
    pub fn new(
        section: &str,
        record: &ManagedRecord,
        actions: ActionSet,
        history_len: usize,
        preview_link: String,
    ) -> Self {
        Self {
            section: section.to_string(),
            record: Some(RecordView::from(record)),
            actions,
            history_len,
            preview_link: Some(preview_link),
            etag: Some(record.content().fingerprint()),
            read_only: false,
        }
    }

    /// Read-only surface with no record and no actions.
    pub fn empty(section: &str) -> Self {
        Self {
            section: section.to_string(),
            record: None,
            actions: ActionSet::empty(),
            history_len: 0,
            preview_link: None,
            etag: None,
            read_only: true,
        }
    }
}
