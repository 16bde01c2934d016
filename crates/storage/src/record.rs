use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use time::OffsetDateTime;

/// One of the two publication stages a record can exist on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// The working copy edited in the admin UI.
    Draft,
    /// The publicly visible copy.
    Live,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Draft => "draft",
            Stage::Live => "live",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stable identity of a record. Shared by its Draft row, Live row and history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub u64);

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Typed pointer to a record, used for ownership links between records.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RecordRef {
    pub record_type: String,
    pub id: RecordId,
}

/// The editable content of a record.
///
/// Field values are opaque to storage. Two stages "differ" exactly when their
/// content fingerprints differ.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordContent {
    pub title: String,
    #[serde(default)]
    pub fields: BTreeMap<String, serde_json::Value>,
}

impl RecordContent {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            fields: BTreeMap::new(),
        }
    }

    /// SHA-256 hex digest of the canonical JSON encoding.
    ///
    /// `fields` is a `BTreeMap`, so key order (and therefore the encoding) is
    /// stable across processes.
    pub fn fingerprint(&self) -> String {
        let canonical = serde_json::to_vec(self).unwrap_or_default();
        let digest = Sha256::digest(&canonical);
        digest.iter().map(|b| format!("{:02x}", b)).collect()
    }
}

/// A record as stored on a single stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageRecord {
    pub id: RecordId,
    pub record_type: String,
    pub content: RecordContent,
    /// History version this row's content was written as.
    pub version: u64,
    #[serde(default)]
    pub owner: Option<RecordRef>,
    #[serde(with = "time::serde::rfc3339")]
    pub last_edited: OffsetDateTime,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub last_published: Option<OffsetDateTime>,
}

impl StageRecord {
    pub fn record_ref(&self) -> RecordRef {
        RecordRef {
            record_type: self.record_type.clone(),
            id: self.id,
        }
    }
}

/// An immutable entry in a record's version history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionSnapshot {
    pub record_type: String,
    pub id: RecordId,
    pub version: u64,
    /// Stage the write that produced this version targeted.
    pub stage: Stage,
    pub content: RecordContent,
    pub published: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub saved_at: OffsetDateTime,
}
