//! Repository abstractions for data access.
//!
//! Repositories provide a clean interface for database operations,
//! hiding the `SeaORM` implementation details from the rest of the application.

pub mod allocation;
pub mod correlation;
pub mod project_financials;
pub mod report;
pub mod snapshot;

pub use allocation::{AllocationRepoError, AllocationRepository, ExpenseSuggestion};
pub use correlation::{CorrelationError, CorrelationRepository, CorrelationWrite};
pub use project_financials::{
    ChangeOrderStatusWrite, ExpenseDeletion, ExpenseWrite, NewExpense, NewSplit,
    ProjectFinancialsError, ProjectFinancialsRepository, QuoteStatusWrite, RecomputedProject,
};
pub use report::{ReportQueryError, ReportRepository};
