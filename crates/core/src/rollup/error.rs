//! Rollup error types.

use rust_decimal::Decimal;
use thiserror::Error;

/// Errors raised by expense write paths that feed the rollup.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RollupError {
    /// A split row with a zero or negative amount.
    #[error("Split {index} must have a positive amount, got {amount}")]
    NonPositiveSplit {
        /// Position in the request.
        index: usize,
        /// Offending amount.
        amount: Decimal,
    },

    /// Split rows do not add up to the expense amount.
    #[error("Splits total {splits_total} but the expense amount is {expense_amount}")]
    SplitTotalMismatch {
        /// Expense amount.
        expense_amount: Decimal,
        /// Sum of the requested splits.
        splits_total: Decimal,
    },
}
