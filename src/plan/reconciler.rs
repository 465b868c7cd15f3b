//! Plan reconciliation: single-field edit → whole-tree regeneration.
//!
//! Downstream propagation (an edited benefit reshaping its deliverables and
//! tasks) is delegated to the generation service rather than computed by
//! rule-based propagation; there is no internal dependency-propagation
//! algorithm. The stored tree is replaced wholesale inside one transaction,
//! guarded by the project revision.

use thiserror::Error;
use uuid::Uuid;

use crate::db::{Database, ReplaceError};
use crate::llm::{ChatClient, ChatRequest, LlmError};
use crate::models::{PlanEdit, ProjectWithTree};

use super::coerce::{coerce_object, ParseFailure};
use super::generator::PLAN_TEMPERATURE;
use super::prompt;
use super::validate::{validate_plan, PlanValidateError};

/// Errors from reconciliation.
///
/// Any failure after step 1 (the leaf edit) leaves the stored subtree exactly
/// as it was: the replacement runs in one transaction and only commits a
/// fully validated tree.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("project not found")]
    ProjectNotFound,

    #[error("edited {field} not found in this project")]
    EditTargetNotFound { field: &'static str },

    #[error("plan was modified concurrently: expected revision {expected}, store has {actual}")]
    Conflict { expected: i64, actual: i64 },

    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error("response could not be parsed: {0}")]
    Parse(#[from] ParseFailure),

    #[error("response failed schema validation: {0}")]
    Validate(#[from] PlanValidateError),

    #[error("database error: {0}")]
    Db(#[from] anyhow::Error),
}

/// Reconcile a project plan after a single leaf edit.
///
/// Steps: apply the edit in place, serialize the full post-edit tree, ask the
/// generation service for a complete consistent replacement, validate it, and
/// atomically swap the stored subtree (title updates the project name, the
/// revision advances). On failure the leaf edit survives but the subtree is
/// untouched.
pub async fn reconcile(
    db: &Database,
    client: &dyn ChatClient,
    project_id: Uuid,
    expected_revision: i64,
    edit: &PlanEdit,
    sample_projects: &[String],
    sample_teams: &[String],
) -> Result<ProjectWithTree, ReconcileError> {
    let project = db
        .get_project(project_id)?
        .ok_or(ReconcileError::ProjectNotFound)?;
    // Fail fast before burning a generation call; the transactional replace
    // re-checks under the lock.
    if project.revision != expected_revision {
        return Err(ReconcileError::Conflict {
            expected: expected_revision,
            actual: project.revision,
        });
    }

    if !db.apply_edit(project_id, edit)? {
        return Err(ReconcileError::EditTargetNotFound {
            field: edit.field_name(),
        });
    }

    let (project, current) = db
        .serialize_tree(project_id)?
        .ok_or(ReconcileError::ProjectNotFound)?;

    let request = ChatRequest {
        system: prompt::reconcile_system_prompt(),
        user: prompt::reconcile_user_prompt(
            &project.vision,
            edit,
            &current,
            sample_projects,
            sample_teams,
        ),
        temperature: PLAN_TEMPERATURE,
    };

    let response = client.chat(&request).await?;
    let obj = coerce_object(&response.text)?;
    let draft = validate_plan(&obj)?;

    let updated = db
        .replace_tree(project_id, expected_revision, &draft)
        .map_err(|e| match e {
            ReplaceError::NotFound => ReconcileError::ProjectNotFound,
            ReplaceError::Conflict { expected, actual } => {
                ReconcileError::Conflict { expected, actual }
            }
            ReplaceError::Db(e) => ReconcileError::Db(e.into()),
        })?;
    tracing::info!(project = %updated.id, revision = updated.revision, "plan reconciled");

    db.get_project_with_tree(project_id)?
        .ok_or(ReconcileError::ProjectNotFound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockChatClient;
    use crate::plan::validate_plan;

    const ORIGINAL: &str = r#"{"title": "Retail App", "outcomes": [
        {"description": "Higher conversion", "benefits": [
            {"description": "More repeat buyers", "deliverables": [
                {"description": "Loyalty scheme", "tasks": [
                    {"name": "Design tiers", "responsible_team": "Product", "duration": 10}
                ]}
            ]}
        ]}
    ]}"#;

    const RECONCILED: &str = r#"{"title": "Nationwide Logistics", "outcomes": [
        {"description": "Two-day delivery everywhere", "benefits": [
            {"description": "Lower shipping cost", "deliverables": [
                {"description": "Regional depots", "tasks": [
                    {"name": "Site selection", "responsible_team": "Operations", "duration": 30}
                ]}
            ]}
        ]}
    ]}"#;

    fn seeded_db() -> (Database, crate::models::Project) {
        let db = Database::open_memory().unwrap();
        db.migrate().unwrap();
        let obj = crate::plan::coerce_object(ORIGINAL).unwrap();
        let draft = validate_plan(&obj).unwrap();
        let project = db
            .create_project_with_tree("Build a retail app", &draft)
            .unwrap();
        (db, project)
    }

    #[tokio::test]
    async fn replaces_tree_and_bumps_revision() {
        let (db, project) = seeded_db();
        let client = MockChatClient::with_default(RECONCILED);
        let edit = PlanEdit::Vision {
            vision: "Launch a nationwide logistics network".to_string(),
        };

        let tree = reconcile(&db, &client, project.id, 0, &edit, &[], &[])
            .await
            .unwrap();

        assert_eq!(tree.project.name, "Nationwide Logistics");
        assert_eq!(tree.project.revision, 1);
        assert_eq!(
            tree.project.vision,
            "Launch a nationwide logistics network"
        );
        assert_eq!(tree.outcomes.len(), 1);
        assert_eq!(
            tree.outcomes[0].outcome.description,
            "Two-day delivery everywhere"
        );
    }

    #[tokio::test]
    async fn service_failure_keeps_old_subtree() {
        let (db, project) = seeded_db();
        let client = MockChatClient::failing();
        let edit = PlanEdit::Vision {
            vision: "Something new".to_string(),
        };

        let err = reconcile(&db, &client, project.id, 0, &edit, &[], &[])
            .await
            .unwrap_err();
        assert!(matches!(err, ReconcileError::Llm(_)));

        // Subtree untouched, leaf edit applied, revision unchanged.
        let tree = db.get_project_with_tree(project.id).unwrap().unwrap();
        assert_eq!(tree.project.vision, "Something new");
        assert_eq!(tree.project.revision, 0);
        assert_eq!(tree.project.name, "Retail App");
        assert_eq!(
            tree.outcomes[0].outcome.description,
            "Higher conversion"
        );
    }

    #[tokio::test]
    async fn invalid_response_keeps_old_subtree() {
        let (db, project) = seeded_db();
        let client = MockChatClient::with_default(r#"{"title": "missing outcomes"}"#);
        let edit = PlanEdit::Vision {
            vision: "Another direction".to_string(),
        };

        let err = reconcile(&db, &client, project.id, 0, &edit, &[], &[])
            .await
            .unwrap_err();
        assert!(matches!(err, ReconcileError::Validate(_)));

        let tree = db.get_project_with_tree(project.id).unwrap().unwrap();
        assert_eq!(tree.project.name, "Retail App");
        assert_eq!(tree.outcomes.len(), 1);
    }

    #[tokio::test]
    async fn stale_revision_is_rejected_before_generation() {
        let (db, project) = seeded_db();
        let client = MockChatClient::with_default(RECONCILED);
        let edit = PlanEdit::Vision {
            vision: "v2".to_string(),
        };

        let err = reconcile(&db, &client, project.id, 7, &edit, &[], &[])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ReconcileError::Conflict {
                expected: 7,
                actual: 0
            }
        ));
        // Nothing changed, not even the leaf edit.
        let stored = db.get_project(project.id).unwrap().unwrap();
        assert_eq!(stored.vision, "Build a retail app");
    }

    #[tokio::test]
    async fn unknown_edit_target_is_reported() {
        let (db, project) = seeded_db();
        let client = MockChatClient::with_default(RECONCILED);
        let edit = PlanEdit::Outcome {
            id: Uuid::new_v4(),
            description: "does not exist".to_string(),
        };

        let err = reconcile(&db, &client, project.id, 0, &edit, &[], &[])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ReconcileError::EditTargetNotFound { field: "outcome" }
        ));
    }

    #[tokio::test]
    async fn editing_a_benefit_regenerates_downstream() {
        let (db, project) = seeded_db();
        let client = MockChatClient::with_default(RECONCILED);
        let before = db.get_project_with_tree(project.id).unwrap().unwrap();
        let benefit_id = before.outcomes[0].benefits[0].benefit.id;

        let edit = PlanEdit::Benefit {
            id: benefit_id,
            description: "Cheaper fulfilment".to_string(),
        };
        let tree = reconcile(&db, &client, project.id, 0, &edit, &[], &[])
            .await
            .unwrap();

        let deliverable = &tree.outcomes[0].benefits[0].deliverables[0];
        assert_eq!(deliverable.deliverable.description, "Regional depots");
        assert_eq!(deliverable.tasks[0].name, "Site selection");
    }
}
