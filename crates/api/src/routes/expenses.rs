//! Expense write routes.
//!
//! Creation, deletion, reassignment, amount and split changes recompute every
//! affected project in the same transaction. Receipt changes have no financial
//! effect.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, post, put},
};
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use buildledger_db::{
    ProjectFinancialsRepository,
    repositories::{NewExpense, NewSplit},
};

use super::error_response;
use crate::AppState;

/// Creates the expense routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/expenses", post(create_expense))
        .route("/expenses/{expense_id}", delete(delete_expense))
        .route("/expenses/{expense_id}/project", put(reassign))
        .route("/expenses/{expense_id}/amount", put(update_amount))
        .route("/expenses/{expense_id}/splits", put(replace_splits))
        .route("/expenses/{expense_id}/receipt", put(set_receipt))
}

/// Request body for moving an expense to another project.
#[derive(Debug, Deserialize)]
pub struct ReassignRequest {
    /// Destination project.
    pub project_id: Uuid,
}

/// Request body for an amount change.
#[derive(Debug, Deserialize)]
pub struct UpdateAmountRequest {
    /// New amount.
    pub amount: Decimal,
}

/// Request body for a split replacement. An empty list un-splits the expense.
#[derive(Debug, Deserialize)]
pub struct ReplaceSplitsRequest {
    /// New split rows.
    pub splits: Vec<NewSplit>,
}

/// Request body for a receipt change.
#[derive(Debug, Deserialize)]
pub struct SetReceiptRequest {
    /// Receipt to attach, or null to detach.
    pub receipt_id: Option<Uuid>,
}

/// POST `/expenses`
async fn create_expense(
    State(state): State<AppState>,
    Json(payload): Json<NewExpense>,
) -> impl IntoResponse {
    let repo = ProjectFinancialsRepository::new((*state.db).clone());

    match repo.create_expense(payload).await {
        Ok(write) => (StatusCode::CREATED, Json(write)).into_response(),
        Err(e) => error_response(e),
    }
}

/// DELETE `/expenses/{expense_id}`
async fn delete_expense(
    State(state): State<AppState>,
    Path(expense_id): Path<Uuid>,
) -> impl IntoResponse {
    let repo = ProjectFinancialsRepository::new((*state.db).clone());

    match repo.delete_expense(expense_id).await {
        Ok(deletion) => (StatusCode::OK, Json(deletion)).into_response(),
        Err(e) => error_response(e),
    }
}

/// PUT `/expenses/{expense_id}/project`
async fn reassign(
    State(state): State<AppState>,
    Path(expense_id): Path<Uuid>,
    Json(payload): Json<ReassignRequest>,
) -> impl IntoResponse {
    let repo = ProjectFinancialsRepository::new((*state.db).clone());

    match repo.reassign_expense(expense_id, payload.project_id).await {
        Ok(write) => (StatusCode::OK, Json(write)).into_response(),
        Err(e) => error_response(e),
    }
}

/// PUT `/expenses/{expense_id}/amount`
async fn update_amount(
    State(state): State<AppState>,
    Path(expense_id): Path<Uuid>,
    Json(payload): Json<UpdateAmountRequest>,
) -> impl IntoResponse {
    let repo = ProjectFinancialsRepository::new((*state.db).clone());

    match repo.update_expense_amount(expense_id, payload.amount).await {
        Ok(write) => (StatusCode::OK, Json(write)).into_response(),
        Err(e) => error_response(e),
    }
}

/// PUT `/expenses/{expense_id}/splits`
async fn replace_splits(
    State(state): State<AppState>,
    Path(expense_id): Path<Uuid>,
    Json(payload): Json<ReplaceSplitsRequest>,
) -> impl IntoResponse {
    let repo = ProjectFinancialsRepository::new((*state.db).clone());

    match repo.replace_expense_splits(expense_id, &payload.splits).await {
        Ok(write) => (StatusCode::OK, Json(write)).into_response(),
        Err(e) => error_response(e),
    }
}

/// PUT `/expenses/{expense_id}/receipt`
async fn set_receipt(
    State(state): State<AppState>,
    Path(expense_id): Path<Uuid>,
    Json(payload): Json<SetReceiptRequest>,
) -> impl IntoResponse {
    let repo = ProjectFinancialsRepository::new((*state.db).clone());

    match repo.set_expense_receipt(expense_id, payload.receipt_id).await {
        Ok(expense) => (StatusCode::OK, Json(expense)).into_response(),
        Err(e) => error_response(e),
    }
}
