use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A complete plan as exchanged with the generation service.
///
/// This is the canonical nested shape: it is what prompts embed as the
/// "current flow", and what responses must validate into before anything is
/// persisted. Identifiers are deliberately absent; the store assigns fresh
/// ids on every replacement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanDraft {
    pub title: String,
    pub outcomes: Vec<OutcomeDraft>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeDraft {
    pub description: String,
    pub benefits: Vec<BenefitDraft>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenefitDraft {
    pub description: String,
    pub deliverables: Vec<DeliverableDraft>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliverableDraft {
    pub description: String,
    pub tasks: Vec<TaskDraft>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskDraft {
    pub name: String,
    pub responsible_team: String,
    /// Estimated effort in days; must be positive.
    pub duration: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
}

impl PlanDraft {
    /// Total number of tasks across the tree.
    pub fn task_count(&self) -> usize {
        self.outcomes
            .iter()
            .flat_map(|o| &o.benefits)
            .flat_map(|b| &b.deliverables)
            .map(|d| d.tasks.len())
            .sum()
    }
}
