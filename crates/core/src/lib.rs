//! Core business logic for BuildLedger.
//!
//! This crate contains pure business logic with ZERO web or database dependencies.
//! The store loads snapshots, these modules compute over them.
//!
//! # Modules
//!
//! - `allocation` - Expense-to-line-item coverage and match suggestions
//! - `rollup` - Project margin and contingency rollup
//! - `reports` - Allow-listed ad-hoc report validation

pub mod allocation;
pub mod reports;
pub mod rollup;
