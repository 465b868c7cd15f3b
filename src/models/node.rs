use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::Task;

/// A desired final result of the project. Direct child of a [`crate::models::Project`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Outcome {
    pub id: Uuid,
    pub project_id: Uuid,
    pub description: String,
    /// Stable render order within the parent.
    pub position: i64,
}

/// Value realized from an outcome. Direct child of an [`Outcome`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Benefit {
    pub id: Uuid,
    pub outcome_id: Uuid,
    pub description: String,
    pub position: i64,
}

/// A tangible output produced to realize a benefit. Direct child of a [`Benefit`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deliverable {
    pub id: Uuid,
    pub benefit_id: Uuid,
    pub description: String,
    pub position: i64,
}

/// An outcome with its nested benefits, used for tree responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutcomeNode {
    #[serde(flatten)]
    pub outcome: Outcome,
    pub benefits: Vec<BenefitNode>,
}

/// A benefit with its nested deliverables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenefitNode {
    #[serde(flatten)]
    pub benefit: Benefit,
    pub deliverables: Vec<DeliverableNode>,
}

/// A deliverable with its tasks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliverableNode {
    #[serde(flatten)]
    pub deliverable: Deliverable,
    pub tasks: Vec<Task>,
}
