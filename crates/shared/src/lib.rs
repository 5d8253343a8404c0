//! Shared types, errors, and configuration for BuildLedger.
//!
//! This crate provides common pieces used across all other crates:
//! - Decimal money helpers (rounding, guarded percentages, tolerance checks)
//! - Application-wide error types
//! - Configuration management

pub mod config;
pub mod error;
pub mod types;

pub use config::{AppConfig, MatchingConfig, ReportsConfig};
pub use error::{AppError, AppResult};
