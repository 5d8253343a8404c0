//! API route definitions.

use axum::{
    Json, Router,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use buildledger_shared::AppError;
use serde_json::json;

use crate::AppState;

pub mod allocation;
pub mod correlations;
pub mod expenses;
pub mod health;
pub mod projects;
pub mod reports;
pub mod statuses;

/// Creates the API router with all routes.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(health::routes())
        .merge(allocation::routes())
        .merge(correlations::routes())
        .merge(projects::routes())
        .merge(expenses::routes())
        .merge(statuses::routes())
        .merge(reports::routes())
}

/// Maps an application error to a JSON error response.
///
/// Internal errors are logged and returned without their detail.
pub fn error_response(err: impl Into<AppError>) -> Response {
    let err = err.into();
    let status =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    let message = if err.is_internal() {
        tracing::error!(error = %err, "request failed");
        "An error occurred".to_string()
    } else {
        err.to_string()
    };

    (
        status,
        Json(json!({
            "error": err.error_code().to_ascii_lowercase(),
            "message": message
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use rstest::rstest;

    #[rstest]
    #[case(AppError::NotFound("Project not found".into()), StatusCode::NOT_FOUND, "not_found")]
    #[case(AppError::Validation("bad".into()), StatusCode::BAD_REQUEST, "validation_error")]
    #[case(AppError::Conflict("taken".into()), StatusCode::CONFLICT, "conflict")]
    #[case(
        AppError::BusinessRule("splits".into()),
        StatusCode::UNPROCESSABLE_ENTITY,
        "business_rule_violation"
    )]
    #[tokio::test]
    async fn test_error_response_status_and_code(
        #[case] err: AppError,
        #[case] status: StatusCode,
        #[case] code: &str,
    ) {
        let response = error_response(err);
        assert_eq!(response.status(), status);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], code);
    }

    #[tokio::test]
    async fn test_internal_error_hides_detail() {
        let response = error_response(AppError::Database("connection refused".into()));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["message"], "An error occurred");
    }
}
