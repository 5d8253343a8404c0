//! Allocation routes: coverage summaries and match suggestions.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use serde::Deserialize;
use uuid::Uuid;

use buildledger_db::AllocationRepository;

use super::error_response;
use crate::AppState;

/// Creates the allocation routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/projects/{project_id}/allocation-summary",
            get(get_allocation_summary),
        )
        .route("/expenses/{expense_id}/suggestion", get(get_suggestion))
}

/// Query parameters for a suggestion.
#[derive(Debug, Deserialize)]
pub struct SuggestionQuery {
    /// Match one split of the expense instead of the whole amount.
    pub split_id: Option<Uuid>,
}

/// GET `/projects/{project_id}/allocation-summary`
async fn get_allocation_summary(
    State(state): State<AppState>,
    Path(project_id): Path<Uuid>,
) -> impl IntoResponse {
    let repo = AllocationRepository::new((*state.db).clone(), &state.config.matching);

    match repo.compute_summary(project_id).await {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(e) => error_response(e),
    }
}

/// GET `/expenses/{expense_id}/suggestion`
async fn get_suggestion(
    State(state): State<AppState>,
    Path(expense_id): Path<Uuid>,
    Query(query): Query<SuggestionQuery>,
) -> impl IntoResponse {
    let repo = AllocationRepository::new((*state.db).clone(), &state.config.matching);

    match repo.suggest_for_expense(expense_id, query.split_id).await {
        Ok(suggestion) => (StatusCode::OK, Json(suggestion)).into_response(),
        Err(e) => error_response(e),
    }
}
