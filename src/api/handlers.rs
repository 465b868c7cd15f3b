use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use uuid::Uuid;

use crate::export;
use crate::gantt;
use crate::models::*;
use crate::plan::{self, GenerateError, ReconcileError};
use crate::retrieval::{
    validate_and_serialize_samples, PROJECTS_COLLECTION, TEAMS_COLLECTION,
};

use super::AppState;

// ============================================================
// Error Handling
// ============================================================

/// Log an internal error and return a sanitized response to the client.
/// The full error is logged server-side for debugging, but clients only
/// see a generic message to avoid leaking internal details.
fn internal_error(e: impl std::fmt::Display) -> (StatusCode, String) {
    tracing::error!("Internal error: {}", e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal server error".to_string(),
    )
}

/// Map a generation failure onto a response. The service and its output are
/// outside our trust boundary, so these surface as 502.
fn generate_error(e: GenerateError) -> (StatusCode, String) {
    tracing::warn!("Plan generation failed: {}", e);
    (
        StatusCode::BAD_GATEWAY,
        "Generation service failed to return a valid plan.".to_string(),
    )
}

fn reconcile_error(e: ReconcileError) -> (StatusCode, String) {
    match e {
        ReconcileError::ProjectNotFound => {
            (StatusCode::NOT_FOUND, "Project not found".to_string())
        }
        ReconcileError::EditTargetNotFound { field } => (
            StatusCode::NOT_FOUND,
            format!("Edited {field} not found in this project"),
        ),
        ReconcileError::Conflict { expected, actual } => (
            StatusCode::CONFLICT,
            format!(
                "Plan was modified concurrently (expected revision {expected}, store has {actual}); reload and retry"
            ),
        ),
        ReconcileError::Llm(_) | ReconcileError::Parse(_) | ReconcileError::Validate(_) => {
            tracing::warn!("Reconciliation failed at the service boundary: {}", e);
            (
                StatusCode::BAD_GATEWAY,
                "Generation service failed to return a valid plan.".to_string(),
            )
        }
        ReconcileError::Db(e) => internal_error(e),
    }
}

/// Fetch advisory retrieval context for a vision, degrading to empty.
async fn plan_context(state: &AppState, text: &str) -> (Vec<String>, Vec<String>) {
    let Some(ref retrieval) = state.retrieval else {
        return (Vec::new(), Vec::new());
    };
    let projects = retrieval.query_or_empty(PROJECTS_COLLECTION, text, 1).await;
    let teams = retrieval.query_or_empty(TEAMS_COLLECTION, text, 5).await;
    (validate_and_serialize_samples(&projects), teams)
}

// ============================================================
// Health
// ============================================================

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

// ============================================================
// Projects
// ============================================================

pub async fn list_projects(
    State(state): State<AppState>,
) -> Result<Json<Vec<Project>>, (StatusCode, String)> {
    state.db.get_all_projects().map(Json).map_err(internal_error)
}

pub async fn get_project(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ProjectWithTree>, (StatusCode, String)> {
    state
        .db
        .get_project_with_tree(id)
        .map_err(internal_error)?
        .map(Json)
        .ok_or((StatusCode::NOT_FOUND, "Project not found".to_string()))
}

pub async fn create_project(
    State(state): State<AppState>,
    Json(input): Json<CreateProjectInput>,
) -> Result<(StatusCode, Json<ProjectWithTree>), (StatusCode, String)> {
    let vision = input.vision.trim().to_string();
    if vision.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Vision must not be empty".to_string()));
    }

    let (samples, teams) = plan_context(&state, &vision).await;
    let draft = plan::generate(state.chat.as_ref(), &vision, &samples, &teams)
        .await
        .map_err(generate_error)?;

    let project = state
        .db
        .create_project_with_tree(&vision, &draft)
        .map_err(internal_error)?;
    let tree = state
        .db
        .get_project_with_tree(project.id)
        .map_err(internal_error)?
        .ok_or_else(|| internal_error("created project vanished"))?;
    Ok((StatusCode::CREATED, Json(tree)))
}

pub async fn delete_project(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, (StatusCode, String)> {
    if state.db.delete_project(id).map_err(internal_error)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err((StatusCode::NOT_FOUND, "Project not found".to_string()))
    }
}

// ============================================================
// Reconciliation
// ============================================================

pub async fn reconcile_project(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<ReconcileRequest>,
) -> Result<Json<ProjectWithTree>, (StatusCode, String)> {
    let project = state
        .db
        .get_project(id)
        .map_err(internal_error)?
        .ok_or((StatusCode::NOT_FOUND, "Project not found".to_string()))?;

    let (samples, teams) = plan_context(&state, &project.vision).await;
    plan::reconcile(
        &state.db,
        state.chat.as_ref(),
        id,
        request.revision,
        &request.edit,
        &samples,
        &teams,
    )
    .await
    .map(Json)
    .map_err(reconcile_error)
}

// ============================================================
// Tree and Gantt
// ============================================================

pub async fn get_tree(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<plan::PlanDraft>, (StatusCode, String)> {
    state
        .db
        .serialize_tree(id)
        .map_err(internal_error)?
        .map(|(_, draft)| Json(draft))
        .ok_or((StatusCode::NOT_FOUND, "Project not found".to_string()))
}

pub async fn get_gantt(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<gantt::GanttChart>, (StatusCode, String)> {
    let tree = state
        .db
        .get_project_with_tree(id)
        .map_err(internal_error)?
        .ok_or((StatusCode::NOT_FOUND, "Project not found".to_string()))?;

    let tasks: Vec<Task> = tree.tasks().into_iter().cloned().collect();
    Ok(Json(gantt::render_gantt(&tasks, Utc::now().date_naive())))
}

// ============================================================
// Document exports
// ============================================================

fn csv_download(filename: String, body: String) -> impl IntoResponse {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        body,
    )
}

pub async fn download_comm_plan(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let tree = state
        .db
        .get_project_with_tree(id)
        .map_err(internal_error)?
        .ok_or((StatusCode::NOT_FOUND, "Project not found".to_string()))?;

    let facts = export::ProjectFacts::from_tree(&tree);
    let raw = export::generate_comm_plan(state.chat.as_ref(), &facts.description()).await;
    let plan = export::normalize_comm_plan(raw, &facts.project_name);
    let body = export::comm_plan_csv(&plan, &facts.project_name);

    Ok(csv_download(
        format!("project_{id}_communication_plan.csv"),
        body,
    ))
}

pub async fn download_financial_plan(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let tree = state
        .db
        .get_project_with_tree(id)
        .map_err(internal_error)?
        .ok_or((StatusCode::NOT_FOUND, "Project not found".to_string()))?;

    let facts = export::ProjectFacts::from_tree(&tree);
    let raw = export::generate_financial_plan(state.chat.as_ref(), &facts.description()).await;
    let plan =
        export::assemble_financial_plan(raw, &tree, &facts, Utc::now().date_naive());
    let body = export::financial_plan_csv(&plan, &facts.project_name);

    Ok(csv_download(
        format!("project_{id}_financial_plan.csv"),
        body,
    ))
}
