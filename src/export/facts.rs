use crate::models::ProjectWithTree;

/// Governance facts and headline numbers for one project, used to seed
/// document prompts and fill governance boilerplate.
#[derive(Debug, Clone)]
pub struct ProjectFacts {
    pub project_name: String,
    pub vision: String,
    pub outcome_count: usize,
    pub deliverable_count: usize,
    pub task_count: usize,
    pub executive_sponsor: String,
    pub project_manager: String,
    pub board_cadence: String,
    pub highlight_frequency: String,
}

impl ProjectFacts {
    /// Derive facts from a stored tree. Governance roles are not modelled in
    /// the store, so they default to placeholders a PM would fill in.
    pub fn from_tree(tree: &ProjectWithTree) -> Self {
        let deliverable_count = tree
            .outcomes
            .iter()
            .flat_map(|o| &o.benefits)
            .map(|b| b.deliverables.len())
            .sum();
        Self {
            project_name: tree.project.name.clone(),
            vision: tree.project.vision.clone(),
            outcome_count: tree.outcomes.len(),
            deliverable_count,
            task_count: tree.tasks().len(),
            executive_sponsor: "Executive Sponsor (TBC)".to_string(),
            project_manager: "Project Manager (TBC)".to_string(),
            board_cadence: "Monthly".to_string(),
            highlight_frequency: "Weekly".to_string(),
        }
    }

    /// Build the project description embedded in document prompts.
    pub fn description(&self) -> String {
        format!(
            "Project: {}\nVision: {}\nOutcomes: {}\nDeliverables: {}\nTasks: {}",
            self.project_name,
            self.vision,
            self.outcome_count,
            self.deliverable_count,
            self.task_count
        )
    }
}
