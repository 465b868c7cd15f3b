mod handlers;
mod middleware;

use std::sync::Arc;

use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::db::Database;
use crate::llm::ChatClient;
use crate::retrieval::RetrievalClient;

pub use middleware::auth_middleware;

/// Shared state for request handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub chat: Arc<dyn ChatClient>,
    pub retrieval: Option<Arc<RetrievalClient>>,
}

pub fn create_router(state: AppState, api_key: Option<String>) -> Router {
    let api = Router::new()
        // Projects
        .route("/projects", get(handlers::list_projects))
        .route("/projects", post(handlers::create_project))
        .route("/projects/{id}", get(handlers::get_project))
        .route("/projects/{id}", delete(handlers::delete_project))
        .route("/projects/{id}/reconcile", post(handlers::reconcile_project))
        .route("/projects/{id}/tree", get(handlers::get_tree))
        .route("/projects/{id}/gantt", get(handlers::get_gantt))
        // Document exports
        .route(
            "/projects/{id}/exports/communications",
            get(handlers::download_comm_plan),
        )
        .route(
            "/projects/{id}/exports/financial",
            get(handlers::download_financial_plan),
        )
        // Health
        .route("/health", get(handlers::health));

    let api = match api_key {
        Some(key) => api.layer(axum::middleware::from_fn_with_state(
            key,
            middleware::auth_middleware,
        )),
        None => api,
    };

    Router::new()
        .nest("/api/v1", api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
