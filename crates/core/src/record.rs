use serde::{Deserialize, Serialize};
use solo_storage::{RecordContent, RecordId, StageRecord};

/// Publication state as three independent booleans.
///
/// Not an enum: a record can legitimately be on neither, either, or both
/// stages, and "differ" is meaningful whenever at least one copy exists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicationState {
    pub on_draft: bool,
    pub on_live: bool,
    pub stages_differ: bool,
}

/// The single administered record, as seen on both stages.
#[derive(Debug, Clone, PartialEq)]
pub struct ManagedRecord {
    rows: Rows,
}

#[derive(Debug, Clone, PartialEq)]
enum Rows {
    DraftOnly(StageRecord),
    LiveOnly(StageRecord),
    Both { draft: StageRecord, live: StageRecord },
}

impl ManagedRecord {
    /// Returns `None` when the record exists on neither stage.
    pub fn new(draft: Option<StageRecord>, live: Option<StageRecord>) -> Option<Self> {
        let rows = match (draft, live) {
            (Some(draft), Some(live)) => Rows::Both { draft, live },
            (Some(draft), None) => Rows::DraftOnly(draft),
            (None, Some(live)) => Rows::LiveOnly(live),
            (None, None) => return None,
        };
        Some(Self { rows })
    }

    pub fn draft(&self) -> Option<&StageRecord> {
        match &self.rows {
            Rows::DraftOnly(draft) | Rows::Both { draft, .. } => Some(draft),
            Rows::LiveOnly(_) => None,
        }
    }

    pub fn live(&self) -> Option<&StageRecord> {
        match &self.rows {
            Rows::LiveOnly(live) | Rows::Both { live, .. } => Some(live),
            Rows::DraftOnly(_) => None,
        }
    }

    /// Draft row, else Live row.
    fn primary(&self) -> &StageRecord {
        match &self.rows {
            Rows::DraftOnly(draft) | Rows::Both { draft, .. } => draft,
            Rows::LiveOnly(live) => live,
        }
    }

    pub fn id(&self) -> RecordId {
        self.primary().id
    }

    pub fn record_type(&self) -> &str {
        &self.primary().record_type
    }

    /// Draft title, falling back to the Live title.
    pub fn title(&self) -> &str {
        &self.primary().content.title
    }

    /// Content shown in the edit surface: Draft, else Live.
    pub fn content(&self) -> &RecordContent {
        &self.primary().content
    }

    /// Highest history version held by either stage.
    pub fn version(&self) -> u64 {
        let d = self.draft().map_or(0, |r| r.version);
        let l = self.live().map_or(0, |r| r.version);
        d.max(l)
    }

    pub fn is_on_draft(&self) -> bool {
        self.draft().is_some()
    }

    pub fn is_published(&self) -> bool {
        self.live().is_some()
    }

    /// Draft content is not identical to Live content. A record present on
    /// only one stage differs.
    pub fn stages_differ(&self) -> bool {
        match &self.rows {
            Rows::Both { draft, live } => draft.content.fingerprint() != live.content.fingerprint(),
            Rows::DraftOnly(_) | Rows::LiveOnly(_) => true,
        }
    }

    pub fn state(&self) -> PublicationState {
        PublicationState {
            on_draft: self.is_on_draft(),
            on_live: self.is_published(),
            stages_differ: self.stages_differ(),
        }
    }
}
