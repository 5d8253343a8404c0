//! Mapping of repository errors onto the application error taxonomy.

use buildledger_shared::AppError;

use crate::repositories::{
    AllocationRepoError, CorrelationError, ProjectFinancialsError, ReportQueryError,
};

impl From<AllocationRepoError> for AppError {
    fn from(err: AllocationRepoError) -> Self {
        match err {
            AllocationRepoError::ProjectNotFound(_)
            | AllocationRepoError::ExpenseNotFound(_)
            | AllocationRepoError::SplitNotFound { .. } => Self::NotFound(err.to_string()),
            AllocationRepoError::Database(e) => Self::Database(e.to_string()),
        }
    }
}

impl From<CorrelationError> for AppError {
    fn from(err: CorrelationError) -> Self {
        match err {
            CorrelationError::Invalid(_) => Self::Validation(err.to_string()),
            CorrelationError::ExpenseNotFound(_)
            | CorrelationError::SplitNotFound(_)
            | CorrelationError::TargetNotFound(_)
            | CorrelationError::NotFound(_) => Self::NotFound(err.to_string()),
            CorrelationError::Conflict { .. } => Self::Conflict(err.to_string()),
            CorrelationError::Database(e) => Self::Database(e.to_string()),
        }
    }
}

impl From<ProjectFinancialsError> for AppError {
    fn from(err: ProjectFinancialsError) -> Self {
        match err {
            ProjectFinancialsError::ProjectNotFound(_)
            | ProjectFinancialsError::ExpenseNotFound(_)
            | ProjectFinancialsError::QuoteNotFound(_)
            | ProjectFinancialsError::ChangeOrderNotFound(_)
            | ProjectFinancialsError::ReceiptNotFound(_) => Self::NotFound(err.to_string()),
            ProjectFinancialsError::Rollup(_) => Self::BusinessRule(err.to_string()),
            ProjectFinancialsError::Database(e) => Self::Database(e.to_string()),
        }
    }
}

impl From<ReportQueryError> for AppError {
    fn from(err: ReportQueryError) -> Self {
        match err {
            ReportQueryError::Invalid(_) => Self::Validation(err.to_string()),
            ReportQueryError::Database(e) => Self::Database(e.to_string()),
        }
    }
}
