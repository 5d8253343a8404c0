//! Correlation routes.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, post},
};
use uuid::Uuid;

use buildledger_core::allocation::NewCorrelation;
use buildledger_db::CorrelationRepository;

use super::error_response;
use crate::AppState;

/// Creates the correlation routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/correlations", post(create_correlation))
        .route("/correlations/{correlation_id}", delete(delete_correlation))
}

/// POST `/correlations`
///
/// Returns 201 for a new link and 200 when the identical link already exists.
async fn create_correlation(
    State(state): State<AppState>,
    Json(payload): Json<NewCorrelation>,
) -> impl IntoResponse {
    let repo = CorrelationRepository::new((*state.db).clone());

    match repo.create(&payload).await {
        Ok(write) => {
            let status = if write.created {
                StatusCode::CREATED
            } else {
                StatusCode::OK
            };
            (status, Json(write)).into_response()
        }
        Err(e) => error_response(e),
    }
}

/// DELETE `/correlations/{correlation_id}`
async fn delete_correlation(
    State(state): State<AppState>,
    Path(correlation_id): Path<Uuid>,
) -> impl IntoResponse {
    let repo = CorrelationRepository::new((*state.db).clone());

    match repo.delete(correlation_id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response(e),
    }
}
