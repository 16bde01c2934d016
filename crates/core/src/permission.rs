//! Permission oracle and capability codes.
//!
//! Capability codes are declared statically per section in configuration and
//! resolved at startup. Nothing here builds a code from a type name at runtime.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::record::ManagedRecord;

/// A statically declared capability code such as `CMS_ACCESS_HomePageAdmin`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CapabilityCode(String);

impl CapabilityCode {
    /// Grants edit access to managed records.
    pub const EDIT: &'static str = "EDIT";
    /// Grants publishing (Draft to Live).
    pub const PUBLISH: &'static str = "PUBLISH";
    /// Grants removing the Live copy.
    pub const UNPUBLISH: &'static str = "UNPUBLISH";

    /// Codes are non-empty and limited to `A-Z`, `a-z`, `0-9` and `_`.
    pub fn new(code: impl Into<String>) -> Result<Self, InvalidCapabilityCode> {
        let code = code.into();
        let valid = !code.is_empty()
            && code
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_');
        if valid {
            Ok(Self(code))
        } else {
            Err(InvalidCapabilityCode(code))
        }
    }

    pub fn edit() -> Self {
        Self(Self::EDIT.to_string())
    }

    pub fn publish() -> Self {
        Self(Self::PUBLISH.to_string())
    }

    pub fn unpublish() -> Self {
        Self(Self::UNPUBLISH.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CapabilityCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for CapabilityCode {
    type Error = InvalidCapabilityCode;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<CapabilityCode> for String {
    fn from(code: CapabilityCode) -> Self {
        code.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid capability code '{0}': expected letters, digits and underscores")]
pub struct InvalidCapabilityCode(pub String);

/// The identity issuing a request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Caller {
    pub id: String,
}

impl Caller {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// Answers capability questions about a caller.
pub trait PermissionOracle: Send + Sync {
    fn can_edit(&self, caller: &Caller, record: &ManagedRecord) -> bool;

    fn can_publish(&self, caller: &Caller, record: &ManagedRecord) -> bool;

    fn can_unpublish(&self, caller: &Caller, record: &ManagedRecord) -> bool;

    /// General capability check keyed by code.
    fn check_code(&self, caller: &Caller, code: &CapabilityCode) -> bool;
}

/// The three record-level capabilities that drive action availability.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallerCapabilities {
    pub can_edit: bool,
    pub can_publish: bool,
    pub can_unpublish: bool,
}

impl CallerCapabilities {
    pub fn resolve(oracle: &dyn PermissionOracle, caller: &Caller, record: &ManagedRecord) -> Self {
        Self {
            can_edit: oracle.can_edit(caller, record),
            can_publish: oracle.can_publish(caller, record),
            can_unpublish: oracle.can_unpublish(caller, record),
        }
    }
}

/// Static caller → granted codes table.
///
/// Record-level checks map onto the built-in codes [`CapabilityCode::EDIT`],
/// [`CapabilityCode::PUBLISH`] and [`CapabilityCode::UNPUBLISH`]; the record
/// itself does not narrow the grant.
#[derive(Debug, Clone, Default)]
pub struct GrantTable {
    grants: BTreeMap<String, BTreeSet<CapabilityCode>>,
}

impl GrantTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grant<I>(&mut self, caller_id: impl Into<String>, codes: I)
    where
        I: IntoIterator<Item = CapabilityCode>,
    {
        self.grants
            .entry(caller_id.into())
            .or_default()
            .extend(codes);
    }

    pub fn with_grant<I>(mut self, caller_id: impl Into<String>, codes: I) -> Self
    where
        I: IntoIterator<Item = CapabilityCode>,
    {
        self.grant(caller_id, codes);
        self
    }

    pub fn knows(&self, caller_id: &str) -> bool {
        self.grants.contains_key(caller_id)
    }

    fn holds(&self, caller: &Caller, code: &str) -> bool {
        self.grants
            .get(&caller.id)
            .is_some_and(|codes| codes.iter().any(|c| c.as_str() == code))
    }
}

impl PermissionOracle for GrantTable {
    fn can_edit(&self, caller: &Caller, _record: &ManagedRecord) -> bool {
        self.holds(caller, CapabilityCode::EDIT)
    }

    fn can_publish(&self, caller: &Caller, _record: &ManagedRecord) -> bool {
        self.holds(caller, CapabilityCode::PUBLISH)
    }

    fn can_unpublish(&self, caller: &Caller, _record: &ManagedRecord) -> bool {
        self.holds(caller, CapabilityCode::UNPUBLISH)
    }

    fn check_code(&self, caller: &Caller, code: &CapabilityCode) -> bool {
        self.holds(caller, code.as_str())
    }
}
