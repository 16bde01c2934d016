//! solo-core: publication controller for single-record content administration.
//!
//! An admin section is locked onto exactly one record of a configured type.
//! [`PublicationController`] creates it on first access and moves it between
//! the Draft and Live stages through save, publish, unpublish and rollback.
//!
//! Key types are re-exported at the crate root:
//!
//! - [`PublicationController`] and [`OperationOutcome`]
//! - [`compute_available_actions`] and [`ActionSet`]
//! - [`PermissionOracle`], [`GrantTable`], [`CapabilityCode`]
//! - [`FieldBinder`], [`SchemaBinder`]
//! - [`negotiate()`] for mapping results onto response shapes

pub mod actions;
pub mod binder;
pub mod controller;
pub mod error;
pub mod hooks;
pub mod negotiate;
pub mod permission;
pub mod record;
pub mod section;
pub mod view;

pub use actions::{
    compute_available_actions, ActionGroup, ActionKind, ActionSet, ActionState, AvailableAction,
};
pub use binder::{
    FieldBinder, FieldData, FieldError, FieldKind, FieldSpec, SchemaBinder, ValidationErrors,
};
pub use controller::{Operation, OperationOutcome, PublicationController};
pub use error::ControllerError;
pub use hooks::{AuditLog, RecordingHook, SaveHook};
pub use negotiate::{negotiate, Disposition, Fragment, Negotiated, RequestContext};
pub use permission::{
    Caller, CallerCapabilities, CapabilityCode, GrantTable, InvalidCapabilityCode,
    PermissionOracle,
};
pub use record::{ManagedRecord, PublicationState};
pub use section::{provide_permissions, PermissionEntry, SectionConfig};
pub use view::{EditView, RecordView};
