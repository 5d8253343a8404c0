//! Report routes.
//!
//! The executor only accepts allow-listed data sources and fields; the
//! registry listing tells clients what they may ask for.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};

use buildledger_core::reports::{ReportRequest, registry};
use buildledger_db::ReportRepository;

use super::error_response;
use crate::AppState;

/// Creates the report routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/reports/data-sources", get(list_data_sources))
        .route("/reports/execute", post(execute_report))
}

/// GET `/reports/data-sources`
async fn list_data_sources() -> impl IntoResponse {
    Json(registry::describe())
}

/// POST `/reports/execute`
async fn execute_report(
    State(state): State<AppState>,
    Json(payload): Json<ReportRequest>,
) -> impl IntoResponse {
    let repo = ReportRepository::new((*state.db).clone(), state.report_limits());

    match repo.execute(&payload).await {
        Ok(result) => (StatusCode::OK, Json(result)).into_response(),
        Err(e) => error_response(e),
    }
}
