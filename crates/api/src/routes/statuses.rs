//! Quote and change-order status routes.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::put,
};
use serde::Deserialize;
use uuid::Uuid;

use buildledger_core::{allocation::QuoteStatus, rollup::ChangeOrderStatus};
use buildledger_db::ProjectFinancialsRepository;

use super::error_response;
use crate::AppState;

/// Creates the status routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/quotes/{quote_id}/status", put(update_quote_status))
        .route(
            "/change-orders/{change_order_id}/status",
            put(update_change_order_status),
        )
}

/// Request body for a status change.
#[derive(Debug, Deserialize)]
pub struct StatusRequest<S> {
    /// Target status.
    pub status: S,
}

/// PUT `/quotes/{quote_id}/status`
async fn update_quote_status(
    State(state): State<AppState>,
    Path(quote_id): Path<Uuid>,
    Json(payload): Json<StatusRequest<QuoteStatus>>,
) -> impl IntoResponse {
    let repo = ProjectFinancialsRepository::new((*state.db).clone());

    match repo.update_quote_status(quote_id, payload.status).await {
        Ok(write) => (StatusCode::OK, Json(write)).into_response(),
        Err(e) => error_response(e),
    }
}

/// PUT `/change-orders/{change_order_id}/status`
async fn update_change_order_status(
    State(state): State<AppState>,
    Path(change_order_id): Path<Uuid>,
    Json(payload): Json<StatusRequest<ChangeOrderStatus>>,
) -> impl IntoResponse {
    let repo = ProjectFinancialsRepository::new((*state.db).clone());

    match repo
        .update_change_order_status(change_order_id, payload.status)
        .await
    {
        Ok(write) => (StatusCode::OK, Json(write)).into_response(),
        Err(e) => error_response(e),
    }
}
