use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The single leaf edit that triggers a reconciliation.
///
/// Exactly one field of the stored plan is changed in place before the whole
/// tree is regenerated: the project vision, or the description of one
/// outcome, benefit, or deliverable identified by id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "edited_field", content = "payload", rename_all = "snake_case")]
pub enum PlanEdit {
    Vision { vision: String },
    Outcome { id: Uuid, description: String },
    Benefit { id: Uuid, description: String },
    Deliverable { id: Uuid, description: String },
}

impl PlanEdit {
    /// Name of the edited field as it appears in prompts and responses.
    pub fn field_name(&self) -> &'static str {
        match self {
            Self::Vision { .. } => "vision",
            Self::Outcome { .. } => "outcome",
            Self::Benefit { .. } => "benefit",
            Self::Deliverable { .. } => "deliverable",
        }
    }

    /// The new text carried by the edit.
    pub fn new_value(&self) -> &str {
        match self {
            Self::Vision { vision } => vision,
            Self::Outcome { description, .. }
            | Self::Benefit { description, .. }
            | Self::Deliverable { description, .. } => description,
        }
    }
}

/// Request body for the reconcile endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileRequest {
    #[serde(flatten)]
    pub edit: PlanEdit,
    /// The project revision the client loaded; stale values are rejected.
    pub revision: i64,
}
