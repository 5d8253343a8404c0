//! Report error types.

use thiserror::Error;

/// Errors raised while validating a report request.
///
/// Every variant is a caller mistake; none of them reaches the store.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReportError {
    /// Data source is not in the registry.
    #[error("Unknown data source: {0}")]
    UnknownDataSource(String),

    /// Filter references a field the data source does not expose.
    #[error("Filter '{filter}': unknown field '{field}'")]
    UnknownField {
        /// Filter key.
        filter: String,
        /// Field name.
        field: String,
    },

    /// Field exists but cannot be filtered.
    #[error("Filter '{filter}': field '{field}' is not filterable")]
    FieldNotFilterable {
        /// Filter key.
        filter: String,
        /// Field name.
        field: String,
    },

    /// Operator is not one of the supported operators.
    #[error("Filter '{filter}': unknown operator '{operator}'")]
    UnknownOperator {
        /// Filter key.
        filter: String,
        /// Operator as given.
        operator: String,
    },

    /// Operator is not allowed on the field's type.
    #[error("Filter '{filter}': operator '{operator}' is not supported for field '{field}'")]
    UnsupportedOperator {
        /// Filter key.
        filter: String,
        /// Field name.
        field: String,
        /// Operator.
        operator: String,
    },

    /// Value does not fit the field or operator.
    #[error("Filter '{filter}': invalid value for field '{field}': {reason}")]
    InvalidValue {
        /// Filter key.
        filter: String,
        /// Field name.
        field: String,
        /// What is wrong.
        reason: String,
    },

    /// Too many filters in one request.
    #[error("Too many filters: {count} (maximum {max})")]
    TooManyFilters {
        /// Filters given.
        count: usize,
        /// Maximum allowed.
        max: usize,
    },

    /// Sort field does not exist.
    #[error("Unknown sort field: {0}")]
    UnknownSortField(String),

    /// Sort field exists but cannot be sorted on.
    #[error("Field is not sortable: {0}")]
    FieldNotSortable(String),

    /// Sort direction is neither asc nor desc.
    #[error("Invalid sort direction: {0} (expected 'asc' or 'desc')")]
    InvalidSortDirection(String),
}
