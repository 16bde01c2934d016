//! Action availability: which of save/publish/rollback/unpublish a caller
//! may trigger for the current publication state.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::permission::CallerCapabilities;
use crate::record::PublicationState;

/// A single operation that can appear in the edit surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Save,
    Publish,
    /// Pass-through to an external campaign collaborator.
    AddToCampaign,
    Rollback,
    Unpublish,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Save => "save",
            ActionKind::Publish => "publish",
            ActionKind::AddToCampaign => "add_to_campaign",
            ActionKind::Rollback => "rollback",
            ActionKind::Unpublish => "unpublish",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the action is presented: immediately visible, or behind "More options".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionGroup {
    Major,
    MoreOptions,
}

/// Whether triggering the action would change anything right now.
///
/// `Satisfied` actions are still offered; they render as already done
/// ("Saved", "Published") until the form or the stages diverge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionState {
    Actionable,
    Satisfied,
}

/// A single action available to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailableAction {
    pub kind: ActionKind,
    pub group: ActionGroup,
    pub title: String,
    /// Label shown once the client detects unsaved changes.
    pub alternate_title: Option<String>,
    pub description: Option<String>,
    pub state: ActionState,
}

/// The ordered, request-scoped list of permitted actions. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionSet {
    actions: Vec<AvailableAction>,
}

impl ActionSet {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn get(&self, kind: ActionKind) -> Option<&AvailableAction> {
        self.actions.iter().find(|a| a.kind == kind)
    }

    pub fn contains(&self, kind: ActionKind) -> bool {
        self.get(kind).is_some()
    }

    pub fn kinds(&self) -> Vec<ActionKind> {
        self.actions.iter().map(|a| a.kind).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AvailableAction> {
        self.actions.iter()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

/// Compute the actions a caller may trigger.
///
/// Pure function. No IO. No side effects. Rules are evaluated in a fixed
/// order and a rule that does not hold simply omits its action:
///
/// 1. Save: can edit and on Draft.
/// 2. Publish: can publish and on Draft. Satisfied ("Published") when the
///    stages match, actionable ("Save & publish") when they differ.
/// 3. Add to campaign: (published or on Draft) and can publish.
/// 4. Rollback: on Draft, published, can edit, and stages differ.
/// 5. Unpublish: published, can publish, on Draft, and can unpublish.
pub fn compute_available_actions(
    state: &PublicationState,
    caps: &CallerCapabilities,
) -> ActionSet {
    let mut actions = Vec::new();

    if caps.can_edit && state.on_draft {
        actions.push(AvailableAction {
            kind: ActionKind::Save,
            group: ActionGroup::Major,
            title: "Saved".to_string(),
            alternate_title: Some("Save draft".to_string()),
            description: None,
            state: ActionState::Satisfied,
        });
    }

    if caps.can_publish && state.on_draft {
        let (title, action_state) = if state.stages_differ {
            ("Save & publish", ActionState::Actionable)
        } else {
            ("Published", ActionState::Satisfied)
        };
        actions.push(AvailableAction {
            kind: ActionKind::Publish,
            group: ActionGroup::Major,
            title: title.to_string(),
            alternate_title: Some("Save & publish".to_string()),
            description: None,
            state: action_state,
        });
    }

    if (state.on_live || state.on_draft) && caps.can_publish {
        actions.push(AvailableAction {
            kind: ActionKind::AddToCampaign,
            group: ActionGroup::MoreOptions,
            title: "Add to campaign".to_string(),
            alternate_title: None,
            description: None,
            state: ActionState::Actionable,
        });
    }

    if state.on_draft && state.on_live && caps.can_edit && state.stages_differ {
        actions.push(AvailableAction {
            kind: ActionKind::Rollback,
            group: ActionGroup::MoreOptions,
            title: "Cancel draft changes".to_string(),
            alternate_title: None,
            description: Some(
                "Delete your draft and revert to the currently published page".to_string(),
            ),
            state: ActionState::Actionable,
        });
    }

    if state.on_live && caps.can_publish && state.on_draft && caps.can_unpublish {
        actions.push(AvailableAction {
            kind: ActionKind::Unpublish,
            group: ActionGroup::MoreOptions,
            title: "Unpublish".to_string(),
            alternate_title: None,
            description: Some("Remove this page from the published site".to_string()),
            state: ActionState::Actionable,
        });
    }

    ActionSet { actions }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────
