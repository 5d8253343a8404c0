//! Validation of correlation write requests.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::AllocationError;
use super::matching::MAX_CONFIDENCE;
use super::types::{CorrelationTarget, CorrelationType};

/// Request to link an expense (or one of its splits) to a target.
///
/// Mirrors the storage shape: three nullable target columns of which exactly
/// one must be set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewCorrelation {
    /// Expense.
    pub expense_id: Uuid,
    /// Split, when only part of the expense is linked.
    #[serde(default)]
    pub expense_split_id: Option<Uuid>,
    /// Estimate line item target.
    #[serde(default)]
    pub estimate_line_item_id: Option<Uuid>,
    /// Change-order line item target.
    #[serde(default)]
    pub change_order_line_item_id: Option<Uuid>,
    /// Quote target.
    #[serde(default)]
    pub quote_id: Option<Uuid>,
    /// Whether the link was suggested by the system.
    #[serde(default)]
    pub auto_correlated: bool,
    /// Score recorded at suggestion time.
    #[serde(default)]
    pub confidence_score: Option<u8>,
}

/// A correlation request that passed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ValidatedCorrelation {
    /// Expense.
    pub expense_id: Uuid,
    /// Split.
    pub split_id: Option<Uuid>,
    /// The single target.
    pub target: CorrelationTarget,
    /// System-suggested.
    pub auto_correlated: bool,
    /// Score.
    pub confidence_score: Option<u8>,
}

impl ValidatedCorrelation {
    /// Stored correlation type, derived from the target kind.
    #[must_use]
    pub const fn correlation_type(&self) -> CorrelationType {
        self.target.correlation_type()
    }

    /// Checks that the linked split (if any) belongs to the expense.
    ///
    /// # Errors
    ///
    /// Returns `AllocationError::SplitNotOfExpense` on mismatch.
    pub fn check_split_owner(&self, split_expense_id: Uuid) -> Result<(), AllocationError> {
        match self.split_id {
            Some(split_id) if split_expense_id != self.expense_id => {
                Err(AllocationError::SplitNotOfExpense {
                    split_id,
                    expense_id: self.expense_id,
                })
            }
            _ => Ok(()),
        }
    }
}

impl NewCorrelation {
    /// Validates target cardinality and the confidence range.
    ///
    /// # Errors
    ///
    /// Returns `AllocationError::MissingTarget` or `MultipleTargets` unless
    /// exactly one target is set, and `InvalidConfidence` above 100.
    pub fn validate(&self) -> Result<ValidatedCorrelation, AllocationError> {
        let targets: Vec<CorrelationTarget> = [
            self.estimate_line_item_id
                .map(CorrelationTarget::EstimateLineItem),
            self.change_order_line_item_id
                .map(CorrelationTarget::ChangeOrderLineItem),
            self.quote_id.map(CorrelationTarget::Quote),
        ]
        .into_iter()
        .flatten()
        .collect();

        let target = match targets.as_slice() {
            [] => return Err(AllocationError::MissingTarget),
            [target] => *target,
            many => return Err(AllocationError::MultipleTargets(many.len())),
        };

        if let Some(score) = self.confidence_score.filter(|s| *s > MAX_CONFIDENCE) {
            return Err(AllocationError::InvalidConfidence(score));
        }

        Ok(ValidatedCorrelation {
            expense_id: self.expense_id,
            split_id: self.expense_split_id,
            target,
            auto_correlated: self.auto_correlated,
            confidence_score: self.confidence_score,
        })
    }
}
