//! Allocation error types.

use thiserror::Error;
use uuid::Uuid;

/// Allocation-related errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AllocationError {
    /// A correlation request names no target.
    #[error("Correlation must reference a line item or a quote")]
    MissingTarget,

    /// A correlation request names more than one target.
    #[error("Correlation must reference exactly one target, got {0}")]
    MultipleTargets(usize),

    /// The split does not belong to the expense.
    #[error("Expense split {split_id} does not belong to expense {expense_id}")]
    SplitNotOfExpense {
        /// Split.
        split_id: Uuid,
        /// Expense.
        expense_id: Uuid,
    },

    /// Confidence outside 0..=100.
    #[error("Confidence score must be between 0 and 100, got {0}")]
    InvalidConfidence(u8),
}
