use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{OutcomeNode, Task};

/// A project plan rooted in a free-text vision statement.
///
/// Each project owns exactly one plan tree (Outcome → Benefit → Deliverable →
/// Task). The `name` is set from the generated plan title; the `vision` is
/// what the user typed. `revision` advances every time the tree is replaced
/// wholesale, and stale reconciliations carrying an old revision are rejected.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    pub vision: String,
    /// Optimistic concurrency stamp; bumped on every whole-tree replacement.
    pub revision: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a new project from a vision statement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateProjectInput {
    pub vision: String,
}

/// A project with its full plan tree, used for detailed responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectWithTree {
    #[serde(flatten)]
    pub project: Project,
    pub outcomes: Vec<OutcomeNode>,
}

impl ProjectWithTree {
    /// All tasks in the tree, in position order.
    pub fn tasks(&self) -> Vec<&Task> {
        self.outcomes
            .iter()
            .flat_map(|o| &o.benefits)
            .flat_map(|b| &b.deliverables)
            .flat_map(|d| &d.tasks)
            .collect()
    }
}
