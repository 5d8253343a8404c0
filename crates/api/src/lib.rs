//! HTTP API layer with Axum routes.
//!
//! This crate provides:
//! - REST API routes for allocation, margins and reports
//! - JSON error responses mapped from the application error taxonomy

pub mod routes;

use axum::Router;
use buildledger_core::reports::ReportLimits;
use buildledger_shared::AppConfig;
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub db: Arc<DatabaseConnection>,
    /// Loaded configuration.
    pub config: Arc<AppConfig>,
}

impl AppState {
    /// Report limits derived from configuration.
    #[must_use]
    pub fn report_limits(&self) -> ReportLimits {
        ReportLimits::from(&self.config.reports)
    }
}

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", routes::api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
