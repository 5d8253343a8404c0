//! Correlation repository: create and delete expense-to-target links.
//!
//! A unique index allows one correlation per type for each expense or split
//! row. Creation is idempotent: repeating a request returns the stored row.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, Set, SqlErr, TransactionTrait,
};
use serde::Serialize;
use uuid::Uuid;

use buildledger_core::allocation::{
    AllocationError, CorrelationTarget, NewCorrelation, ValidatedCorrelation,
};

use crate::entities::{
    change_order_line_items, estimate_line_items, expense_line_item_correlations, expense_splits,
    expenses, quotes, sea_orm_active_enums::CorrelationType,
};

/// Error types for correlation writes.
#[derive(Debug, thiserror::Error)]
pub enum CorrelationError {
    /// The request itself is malformed.
    #[error(transparent)]
    Invalid(#[from] AllocationError),

    /// Expense not found.
    #[error("Expense not found: {0}")]
    ExpenseNotFound(Uuid),

    /// Split not found.
    #[error("Expense split not found: {0}")]
    SplitNotFound(Uuid),

    /// Target line item or quote not found.
    #[error("Correlation target not found: {0:?}")]
    TargetNotFound(CorrelationTarget),

    /// A correlation of the same type already links this row to another target.
    #[error("Expense already has a {correlation_type} correlation ({existing_id}) to another target")]
    Conflict {
        /// Existing correlation.
        existing_id: Uuid,
        /// Its type.
        correlation_type: &'static str,
    },

    /// Correlation not found.
    #[error("Correlation not found: {0}")]
    NotFound(Uuid),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

/// Result of a create request.
#[derive(Debug, Clone, Serialize)]
pub struct CorrelationWrite {
    /// The stored correlation.
    pub correlation: expense_line_item_correlations::Model,
    /// False when an identical row already existed.
    pub created: bool,
}

/// Correlation repository.
#[derive(Debug, Clone)]
pub struct CorrelationRepository {
    db: DatabaseConnection,
}

impl CorrelationRepository {
    /// Creates a new correlation repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Links an expense (or split) to one line item or quote.
    pub async fn create(
        &self,
        request: &NewCorrelation,
    ) -> Result<CorrelationWrite, CorrelationError> {
        let validated = request.validate()?;

        let txn = self.db.begin().await?;
        Self::check_endpoints(&txn, &validated).await?;

        if let Some(existing) = Self::find_same_slot(&txn, &validated).await? {
            txn.commit().await?;
            return Self::resolve_existing(existing, &validated);
        }

        let model = expense_line_item_correlations::ActiveModel {
            id: Set(Uuid::new_v4()),
            expense_id: Set(validated.expense_id),
            expense_split_id: Set(validated.split_id),
            estimate_line_item_id: Set(match validated.target {
                CorrelationTarget::EstimateLineItem(id) => Some(id),
                _ => None,
            }),
            change_order_line_item_id: Set(match validated.target {
                CorrelationTarget::ChangeOrderLineItem(id) => Some(id),
                _ => None,
            }),
            quote_id: Set(match validated.target {
                CorrelationTarget::Quote(id) => Some(id),
                _ => None,
            }),
            correlation_type: Set(validated.correlation_type().into()),
            auto_correlated: Set(validated.auto_correlated),
            confidence_score: Set(validated.confidence_score.map(i16::from)),
            created_at: Set(Utc::now().into()),
        };

        match model.insert(&txn).await {
            Ok(correlation) => {
                txn.commit().await?;
                tracing::info!(
                    correlation_id = %correlation.id,
                    expense_id = %correlation.expense_id,
                    auto = correlation.auto_correlated,
                    "correlation created"
                );
                Ok(CorrelationWrite {
                    correlation,
                    created: true,
                })
            }
            Err(err) if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                // A concurrent insert won the slot; the aborted txn is dropped.
                drop(txn);
                let existing = Self::find_same_slot(&self.db, &validated)
                    .await?
                    .ok_or(CorrelationError::Database(err))?;
                Self::resolve_existing(existing, &validated)
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Deletes a correlation.
    pub async fn delete(&self, correlation_id: Uuid) -> Result<(), CorrelationError> {
        let result = expense_line_item_correlations::Entity::delete_by_id(correlation_id)
            .exec(&self.db)
            .await?;

        if result.rows_affected == 0 {
            return Err(CorrelationError::NotFound(correlation_id));
        }

        tracing::info!(correlation_id = %correlation_id, "correlation deleted");
        Ok(())
    }

    async fn check_endpoints<C: ConnectionTrait>(
        conn: &C,
        validated: &ValidatedCorrelation,
    ) -> Result<(), CorrelationError> {
        expenses::Entity::find_by_id(validated.expense_id)
            .one(conn)
            .await?
            .ok_or(CorrelationError::ExpenseNotFound(validated.expense_id))?;

        if let Some(split_id) = validated.split_id {
            let split = expense_splits::Entity::find_by_id(split_id)
                .one(conn)
                .await?
                .ok_or(CorrelationError::SplitNotFound(split_id))?;
            validated.check_split_owner(split.expense_id)?;
        }

        let found = match validated.target {
            CorrelationTarget::EstimateLineItem(id) => estimate_line_items::Entity::find_by_id(id)
                .one(conn)
                .await?
                .is_some_and(|li| li.deleted_at.is_none()),
            CorrelationTarget::ChangeOrderLineItem(id) => {
                change_order_line_items::Entity::find_by_id(id)
                    .one(conn)
                    .await?
                    .is_some_and(|li| li.deleted_at.is_none())
            }
            CorrelationTarget::Quote(id) => quotes::Entity::find_by_id(id).one(conn).await?.is_some(),
        };

        if found {
            Ok(())
        } else {
            Err(CorrelationError::TargetNotFound(validated.target))
        }
    }

    async fn find_same_slot<C: ConnectionTrait>(
        conn: &C,
        validated: &ValidatedCorrelation,
    ) -> Result<Option<expense_line_item_correlations::Model>, DbErr> {
        let correlation_type: CorrelationType = validated.correlation_type().into();
        let split_filter = match validated.split_id {
            Some(split_id) => expense_line_item_correlations::Column::ExpenseSplitId.eq(split_id),
            None => expense_line_item_correlations::Column::ExpenseSplitId.is_null(),
        };

        expense_line_item_correlations::Entity::find()
            .filter(expense_line_item_correlations::Column::ExpenseId.eq(validated.expense_id))
            .filter(split_filter)
            .filter(expense_line_item_correlations::Column::CorrelationType.eq(correlation_type))
            .one(conn)
            .await
    }

    fn resolve_existing(
        existing: expense_line_item_correlations::Model,
        validated: &ValidatedCorrelation,
    ) -> Result<CorrelationWrite, CorrelationError> {
        if stored_target(&existing) == Some(validated.target) {
            tracing::debug!(correlation_id = %existing.id, "correlation already exists");
            Ok(CorrelationWrite {
                correlation: existing,
                created: false,
            })
        } else {
            Err(CorrelationError::Conflict {
                existing_id: existing.id,
                correlation_type: validated.correlation_type().as_str(),
            })
        }
    }
}

/// The single target of a stored correlation.
pub fn stored_target(model: &expense_line_item_correlations::Model) -> Option<CorrelationTarget> {
    model
        .estimate_line_item_id
        .map(CorrelationTarget::EstimateLineItem)
        .or_else(|| {
            model
                .change_order_line_item_id
                .map(CorrelationTarget::ChangeOrderLineItem)
        })
        .or_else(|| model.quote_id.map(CorrelationTarget::Quote))
}

#[cfg(test)]
#[path = "correlation_tests.rs"]
mod tests;
