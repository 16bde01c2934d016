//! Section configuration and the permissions sections provide.

use serde::{Deserialize, Serialize};

use crate::binder::FieldSpec;
use crate::permission::{Caller, CapabilityCode, PermissionOracle};

pub const PERMISSION_CATEGORY: &str = "CMS Access";

/// One admin section, locked onto a single record of `record_type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionConfig {
    /// URL segment, e.g. `homepage`.
    pub name: String,
    /// Human-readable section title.
    pub title: String,
    pub record_type: String,
    /// Statically declared access code, e.g. `CMS_ACCESS_HomePageAdmin`.
    pub access_code: CapabilityCode,
    /// Codes a caller must all hold to enter the section.
    ///
    /// Absent: the access code is required. Empty list: no check.
    #[serde(default)]
    pub required_codes: Option<Vec<CapabilityCode>>,
    #[serde(default)]
    pub fields: Vec<FieldSpec>,
    /// Public link of the managed record.
    #[serde(default = "default_link")]
    pub link: String,
}

fn default_link() -> String {
    "/".to_string()
}

impl SectionConfig {
    pub fn new(
        name: impl Into<String>,
        record_type: impl Into<String>,
        access_code: CapabilityCode,
    ) -> Self {
        let name = name.into();
        Self {
            title: name.clone(),
            name,
            record_type: record_type.into(),
            access_code,
            required_codes: None,
            fields: Vec::new(),
            link: default_link(),
        }
    }

    /// The codes checked by [`can_view`](Self::can_view).
    pub fn effective_codes(&self) -> Vec<&CapabilityCode> {
        match &self.required_codes {
            Some(codes) => codes.iter().collect(),
            None => vec![&self.access_code],
        }
    }

    pub fn can_view(&self, oracle: &dyn PermissionOracle, caller: &Caller) -> bool {
        self.effective_codes()
            .into_iter()
            .all(|code| oracle.check_code(caller, code))
    }

    /// Link used by the preview pane, pinned to the Draft stage.
    pub fn preview_link(&self) -> String {
        let sep = if self.link.contains('?') { '&' } else { '?' };
        format!("{}{}stage=Stage", self.link, sep)
    }
}

/// A permission code offered to the permission administration screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionEntry {
    pub code: CapabilityCode,
    pub name: String,
    pub category: String,
}

/// One access permission per configured section.
pub fn provide_permissions(sections: &[SectionConfig]) -> Vec<PermissionEntry> {
    sections
        .iter()
        .map(|s| PermissionEntry {
            code: s.access_code.clone(),
            name: format!("Access to '{}' section", s.title),
            category: PERMISSION_CATEGORY.to_string(),
        })
        .collect()
}
