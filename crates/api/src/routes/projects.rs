//! Project margin routes.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use uuid::Uuid;

use buildledger_db::{ProjectFinancialsRepository, repositories::RecomputedProject};

use super::error_response;
use crate::AppState;

/// Creates the project margin routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/projects/{project_id}/margins", get(get_margins))
        .route(
            "/projects/{project_id}/margins/recompute",
            post(recompute_margins),
        )
}

/// GET `/projects/{project_id}/margins`
///
/// Derived fields are null until the first recompute, and stay null for
/// categories that do not participate in rollups.
async fn get_margins(
    State(state): State<AppState>,
    Path(project_id): Path<Uuid>,
) -> impl IntoResponse {
    let repo = ProjectFinancialsRepository::new((*state.db).clone());

    match repo.get_margins(project_id).await {
        Ok(project) => (StatusCode::OK, Json(project)).into_response(),
        Err(e) => error_response(e),
    }
}

/// POST `/projects/{project_id}/margins/recompute`
async fn recompute_margins(
    State(state): State<AppState>,
    Path(project_id): Path<Uuid>,
) -> impl IntoResponse {
    let repo = ProjectFinancialsRepository::new((*state.db).clone());

    match repo.recompute(project_id).await {
        Ok(outcome) => (
            StatusCode::OK,
            Json(RecomputedProject {
                project_id,
                outcome,
            }),
        )
            .into_response(),
        Err(e) => error_response(e),
    }
}
