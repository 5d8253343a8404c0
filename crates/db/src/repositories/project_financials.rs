//! Project financials repository.
//!
//! Owns the cached margin fields on `projects`. Every recompute runs inside a
//! transaction that holds the project row lock and re-reads all inputs, so the
//! last committed writer always leaves fields consistent with the data.
//!
//! The write paths below change rollup inputs and recompute the affected
//! projects in the same transaction.

use std::collections::BTreeSet;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, QuerySelect, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use buildledger_core::allocation::QuoteStatus as CoreQuoteStatus;
use buildledger_core::rollup::{
    ChangeOrderImpact, ChangeOrderStatus as CoreChangeOrderStatus, EstimateBaseline,
    MarginCalculator, MarginInputs, RollupError, RollupOutcome, validate_split_amounts,
};

use crate::entities::{
    change_orders, expense_splits, expenses, projects, quotes, receipts,
    sea_orm_active_enums::{ChangeOrderStatus, LineItemCategory, QuoteStatus},
};

use super::snapshot;

/// Error types for project financial operations.
#[derive(Debug, thiserror::Error)]
pub enum ProjectFinancialsError {
    /// Project not found.
    #[error("Project not found: {0}")]
    ProjectNotFound(Uuid),

    /// Expense not found.
    #[error("Expense not found: {0}")]
    ExpenseNotFound(Uuid),

    /// Quote not found.
    #[error("Quote not found: {0}")]
    QuoteNotFound(Uuid),

    /// Change order not found.
    #[error("Change order not found: {0}")]
    ChangeOrderNotFound(Uuid),

    /// Receipt not found.
    #[error("Receipt not found: {0}")]
    ReceiptNotFound(Uuid),

    /// Split rules violated.
    #[error(transparent)]
    Rollup(#[from] RollupError),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

/// Expense requested by a caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewExpense {
    /// Owning project.
    pub project_id: Uuid,
    /// Payee.
    #[serde(default)]
    pub payee_id: Option<Uuid>,
    /// Cost category.
    #[serde(default)]
    pub category: Option<LineItemCategory>,
    /// Amount; negative for credits and refunds.
    pub amount: Decimal,
    /// Date incurred.
    pub expense_date: NaiveDate,
    /// Free text.
    #[serde(default)]
    pub description: Option<String>,
}

/// A removed expense and the rollups it triggered.
#[derive(Debug, Clone, Serialize)]
pub struct ExpenseDeletion {
    /// Removed expense.
    pub expense_id: Uuid,
    /// Projects recomputed in the same transaction.
    pub recomputed: Vec<RecomputedProject>,
}

/// Split row requested by a caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSplit {
    /// Project the part is attributed to.
    pub project_id: Uuid,
    /// Amount attributed.
    pub amount: Decimal,
}

/// Rollup result of one project touched by a write.
#[derive(Debug, Clone, Serialize)]
pub struct RecomputedProject {
    /// Project.
    pub project_id: Uuid,
    /// Outcome.
    #[serde(flatten)]
    pub outcome: RollupOutcome,
}

/// An expense write and the rollups it triggered.
#[derive(Debug, Clone, Serialize)]
pub struct ExpenseWrite {
    /// Expense after the write.
    pub expense: expenses::Model,
    /// Split rows after the write.
    pub splits: Vec<expense_splits::Model>,
    /// Projects recomputed in the same transaction.
    pub recomputed: Vec<RecomputedProject>,
}

/// A quote status change and the rollup it triggered, if any.
#[derive(Debug, Clone, Serialize)]
pub struct QuoteStatusWrite {
    /// Quote after the write.
    pub quote: quotes::Model,
    /// Present when the transition touched `accepted`.
    pub recomputed: Option<RecomputedProject>,
}

/// A change-order status change and the rollup it triggered, if any.
#[derive(Debug, Clone, Serialize)]
pub struct ChangeOrderStatusWrite {
    /// Change order after the write.
    pub change_order: change_orders::Model,
    /// Present when the transition touched `approved`.
    pub recomputed: Option<RecomputedProject>,
}

/// Project financials repository.
#[derive(Debug, Clone)]
pub struct ProjectFinancialsRepository {
    db: DatabaseConnection,
}

impl ProjectFinancialsRepository {
    /// Creates a new project financials repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Returns the project with its cached margin fields.
    pub async fn get_margins(
        &self,
        project_id: Uuid,
    ) -> Result<projects::Model, ProjectFinancialsError> {
        projects::Entity::find_by_id(project_id)
            .one(&self.db)
            .await?
            .ok_or(ProjectFinancialsError::ProjectNotFound(project_id))
    }

    /// Recomputes and stores the derived fields of one project.
    pub async fn recompute(
        &self,
        project_id: Uuid,
    ) -> Result<RollupOutcome, ProjectFinancialsError> {
        let txn = self.db.begin().await?;
        let outcome = recompute_in(&txn, project_id).await?;
        txn.commit().await?;
        Ok(outcome)
    }

    /// Records a new expense and recomputes its project.
    pub async fn create_expense(
        &self,
        new: NewExpense,
    ) -> Result<ExpenseWrite, ProjectFinancialsError> {
        let txn = self.db.begin().await?;

        let project_id = new.project_id;
        projects::Entity::find_by_id(project_id)
            .one(&txn)
            .await?
            .ok_or(ProjectFinancialsError::ProjectNotFound(project_id))?;

        let now = Utc::now();
        let expense = expenses::ActiveModel {
            id: Set(Uuid::new_v4()),
            project_id: Set(project_id),
            payee_id: Set(new.payee_id),
            category: Set(new.category),
            amount: Set(new.amount),
            expense_date: Set(new.expense_date),
            description: Set(new.description),
            is_split: Set(false),
            receipt_id: Set(None),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        }
        .insert(&txn)
        .await?;

        let recomputed = vec![RecomputedProject {
            project_id,
            outcome: recompute_in(&txn, project_id).await?,
        }];

        txn.commit().await?;
        tracing::info!(
            expense_id = %expense.id,
            project_id = %project_id,
            amount = %expense.amount,
            "expense created"
        );

        Ok(ExpenseWrite {
            expense,
            splits: vec![],
            recomputed,
        })
    }

    /// Deletes an expense with its splits and correlations, then recomputes
    /// the owning project and every project a split pointed at.
    pub async fn delete_expense(
        &self,
        expense_id: Uuid,
    ) -> Result<ExpenseDeletion, ProjectFinancialsError> {
        let txn = self.db.begin().await?;

        let expense = lock_expense(&txn, expense_id).await?;
        let splits = expense_splits::Entity::find()
            .filter(expense_splits::Column::ExpenseId.eq(expense_id))
            .all(&txn)
            .await?;

        let mut affected: BTreeSet<Uuid> = BTreeSet::from([expense.project_id]);
        affected.extend(splits.iter().map(|s| s.project_id));

        expenses::Entity::delete_by_id(expense_id).exec(&txn).await?;

        let recomputed = recompute_all(&txn, affected).await?;

        txn.commit().await?;
        tracing::info!(
            expense_id = %expense_id,
            splits = splits.len(),
            "expense deleted"
        );

        Ok(ExpenseDeletion {
            expense_id,
            recomputed,
        })
    }

    /// Moves an expense to another project and recomputes both.
    ///
    /// Split rows keep their own projects; they are recomputed as well since
    /// the owner change alters which splits each project loads.
    pub async fn reassign_expense(
        &self,
        expense_id: Uuid,
        project_id: Uuid,
    ) -> Result<ExpenseWrite, ProjectFinancialsError> {
        let txn = self.db.begin().await?;

        let expense = lock_expense(&txn, expense_id).await?;
        projects::Entity::find_by_id(project_id)
            .one(&txn)
            .await?
            .ok_or(ProjectFinancialsError::ProjectNotFound(project_id))?;

        let splits = expense_splits::Entity::find()
            .filter(expense_splits::Column::ExpenseId.eq(expense_id))
            .all(&txn)
            .await?;

        let previous_project = expense.project_id;
        let mut affected: BTreeSet<Uuid> = BTreeSet::from([previous_project, project_id]);
        affected.extend(splits.iter().map(|s| s.project_id));

        let mut active: expenses::ActiveModel = expense.into();
        active.project_id = Set(project_id);
        active.updated_at = Set(Utc::now().into());
        let expense = active.update(&txn).await?;

        let recomputed = recompute_all(&txn, affected).await?;

        txn.commit().await?;
        tracing::info!(
            expense_id = %expense_id,
            from = %previous_project,
            to = %project_id,
            "expense reassigned"
        );

        Ok(ExpenseWrite {
            expense,
            splits,
            recomputed,
        })
    }

    /// Changes an expense amount.
    ///
    /// Rejected when the expense has split rows that would no longer add up.
    pub async fn update_expense_amount(
        &self,
        expense_id: Uuid,
        amount: Decimal,
    ) -> Result<ExpenseWrite, ProjectFinancialsError> {
        let txn = self.db.begin().await?;

        let expense = lock_expense(&txn, expense_id).await?;
        let splits = expense_splits::Entity::find()
            .filter(expense_splits::Column::ExpenseId.eq(expense_id))
            .all(&txn)
            .await?;

        let split_amounts: Vec<Decimal> = splits.iter().map(|s| s.split_amount).collect();
        validate_split_amounts(amount, &split_amounts)?;

        let project_id = expense.project_id;
        let mut active: expenses::ActiveModel = expense.into();
        active.amount = Set(amount);
        active.updated_at = Set(Utc::now().into());
        let expense = active.update(&txn).await?;

        let recomputed = vec![RecomputedProject {
            project_id,
            outcome: recompute_in(&txn, project_id).await?,
        }];

        txn.commit().await?;
        tracing::info!(expense_id = %expense_id, amount = %amount, "expense amount updated");

        Ok(ExpenseWrite {
            expense,
            splits,
            recomputed,
        })
    }

    /// Replaces the split rows of an expense.
    ///
    /// An empty list un-splits the expense. Correlations attached to the
    /// removed rows go with them.
    pub async fn replace_expense_splits(
        &self,
        expense_id: Uuid,
        new_splits: &[NewSplit],
    ) -> Result<ExpenseWrite, ProjectFinancialsError> {
        let txn = self.db.begin().await?;

        let expense = lock_expense(&txn, expense_id).await?;
        let amounts: Vec<Decimal> = new_splits.iter().map(|s| s.amount).collect();
        validate_split_amounts(expense.amount, &amounts)?;

        let previous = expense_splits::Entity::find()
            .filter(expense_splits::Column::ExpenseId.eq(expense_id))
            .all(&txn)
            .await?;

        let mut affected: BTreeSet<Uuid> = BTreeSet::from([expense.project_id]);
        affected.extend(previous.iter().map(|s| s.project_id));
        affected.extend(new_splits.iter().map(|s| s.project_id));

        expense_splits::Entity::delete_many()
            .filter(expense_splits::Column::ExpenseId.eq(expense_id))
            .exec(&txn)
            .await?;

        let now = Utc::now();
        let mut splits = Vec::with_capacity(new_splits.len());
        for split in new_splits {
            let row = expense_splits::ActiveModel {
                id: Set(Uuid::new_v4()),
                expense_id: Set(expense_id),
                project_id: Set(split.project_id),
                split_amount: Set(split.amount),
                created_at: Set(now.into()),
            };
            splits.push(row.insert(&txn).await?);
        }

        let mut active: expenses::ActiveModel = expense.into();
        active.is_split = Set(!new_splits.is_empty());
        active.updated_at = Set(now.into());
        let expense = active.update(&txn).await?;

        let recomputed = recompute_all(&txn, affected).await?;

        txn.commit().await?;
        tracing::info!(
            expense_id = %expense_id,
            removed = previous.len(),
            added = splits.len(),
            "expense splits replaced"
        );

        Ok(ExpenseWrite {
            expense,
            splits,
            recomputed,
        })
    }

    /// Attaches or detaches a receipt. Receipts never enter any total, so
    /// nothing is recomputed.
    pub async fn set_expense_receipt(
        &self,
        expense_id: Uuid,
        receipt_id: Option<Uuid>,
    ) -> Result<expenses::Model, ProjectFinancialsError> {
        if let Some(receipt_id) = receipt_id {
            receipts::Entity::find_by_id(receipt_id)
                .one(&self.db)
                .await?
                .ok_or(ProjectFinancialsError::ReceiptNotFound(receipt_id))?;
        }

        let expense = expenses::Entity::find_by_id(expense_id)
            .one(&self.db)
            .await?
            .ok_or(ProjectFinancialsError::ExpenseNotFound(expense_id))?;

        let mut active: expenses::ActiveModel = expense.into();
        active.receipt_id = Set(receipt_id);
        active.updated_at = Set(Utc::now().into());
        Ok(active.update(&self.db).await?)
    }

    /// Changes a quote status, recomputing the project when the quote enters
    /// or leaves `accepted`.
    pub async fn update_quote_status(
        &self,
        quote_id: Uuid,
        status: CoreQuoteStatus,
    ) -> Result<QuoteStatusWrite, ProjectFinancialsError> {
        let txn = self.db.begin().await?;

        let quote = quotes::Entity::find_by_id(quote_id)
            .lock_exclusive()
            .one(&txn)
            .await?
            .ok_or(ProjectFinancialsError::QuoteNotFound(quote_id))?;

        let new_status = QuoteStatus::from(status);
        let touches_baseline = quote.status != new_status
            && (quote.status == QuoteStatus::Accepted || new_status == QuoteStatus::Accepted);
        let project_id = quote.project_id;

        let accepted_date = match new_status {
            QuoteStatus::Accepted => quote.accepted_date.or_else(|| Some(Utc::now().date_naive())),
            _ => None,
        };

        let mut active: quotes::ActiveModel = quote.into();
        active.status = Set(new_status);
        active.accepted_date = Set(accepted_date);
        active.updated_at = Set(Utc::now().into());
        let quote = active.update(&txn).await?;

        let recomputed = if touches_baseline {
            Some(RecomputedProject {
                project_id,
                outcome: recompute_in(&txn, project_id).await?,
            })
        } else {
            None
        };

        txn.commit().await?;
        tracing::info!(quote_id = %quote_id, status = ?new_status, "quote status updated");

        Ok(QuoteStatusWrite { quote, recomputed })
    }

    /// Changes a change-order status, recomputing the project when the order
    /// enters or leaves `approved`.
    pub async fn update_change_order_status(
        &self,
        change_order_id: Uuid,
        status: CoreChangeOrderStatus,
    ) -> Result<ChangeOrderStatusWrite, ProjectFinancialsError> {
        let txn = self.db.begin().await?;

        let change_order = change_orders::Entity::find_by_id(change_order_id)
            .lock_exclusive()
            .one(&txn)
            .await?
            .ok_or(ProjectFinancialsError::ChangeOrderNotFound(change_order_id))?;

        let new_status = ChangeOrderStatus::from(status);
        let touches_rollup = change_order.status != new_status
            && (change_order.status == ChangeOrderStatus::Approved
                || new_status == ChangeOrderStatus::Approved);
        let project_id = change_order.project_id;

        let approved_at = match new_status {
            ChangeOrderStatus::Approved => change_order
                .approved_at
                .or_else(|| Some(Utc::now().into())),
            _ => None,
        };

        let mut active: change_orders::ActiveModel = change_order.into();
        active.status = Set(new_status);
        active.approved_at = Set(approved_at);
        active.updated_at = Set(Utc::now().into());
        let change_order = active.update(&txn).await?;

        let recomputed = if touches_rollup {
            Some(RecomputedProject {
                project_id,
                outcome: recompute_in(&txn, project_id).await?,
            })
        } else {
            None
        };

        txn.commit().await?;
        tracing::info!(
            change_order_id = %change_order_id,
            status = ?new_status,
            "change order status updated"
        );

        Ok(ChangeOrderStatusWrite {
            change_order,
            recomputed,
        })
    }
}

async fn lock_expense<C: ConnectionTrait>(
    conn: &C,
    expense_id: Uuid,
) -> Result<expenses::Model, ProjectFinancialsError> {
    expenses::Entity::find_by_id(expense_id)
        .lock_exclusive()
        .one(conn)
        .await?
        .ok_or(ProjectFinancialsError::ExpenseNotFound(expense_id))
}

/// Recomputes each project in ascending ID order, which keeps project lock
/// acquisition consistent across concurrent writers.
async fn recompute_all<C: ConnectionTrait>(
    conn: &C,
    projects: BTreeSet<Uuid>,
) -> Result<Vec<RecomputedProject>, ProjectFinancialsError> {
    let mut recomputed = Vec::with_capacity(projects.len());
    for project_id in projects {
        recomputed.push(RecomputedProject {
            project_id,
            outcome: recompute_in(conn, project_id).await?,
        });
    }
    Ok(recomputed)
}

/// Recomputes one project on an open transaction.
///
/// Locks the project row, re-reads every input and writes all derived fields.
/// Skipped projects are left untouched.
pub async fn recompute_in<C: ConnectionTrait>(
    conn: &C,
    project_id: Uuid,
) -> Result<RollupOutcome, ProjectFinancialsError> {
    let project = projects::Entity::find_by_id(project_id)
        .lock_exclusive()
        .one(conn)
        .await?
        .ok_or(ProjectFinancialsError::ProjectNotFound(project_id))?;

    let inputs = load_inputs(conn, &project).await?;
    let outcome = MarginCalculator::compute(&inputs);

    match &outcome {
        RollupOutcome::Computed { margins, warnings } => {
            for warning in warnings {
                tracing::warn!(project_id = %project_id, ?warning, "rollup data anomaly");
            }

            let mut active: projects::ActiveModel = project.into();
            active.total_expenses = Set(Some(margins.total_expenses));
            active.contracted_amount = Set(Some(margins.contracted_amount));
            active.current_margin = Set(Some(margins.current_margin));
            active.current_margin_percentage = Set(Some(margins.current_margin_percentage));
            active.original_est_costs = Set(margins.original_est_costs);
            active.adjusted_est_costs = Set(margins.adjusted_est_costs);
            active.projected_margin = Set(margins.projected_margin);
            active.original_margin = Set(margins.original_margin);
            active.contingency_amount = Set(margins.contingency_amount);
            active.contingency_used = Set(margins.contingency_used);
            active.contingency_remaining = Set(margins.contingency_remaining);
            active.margins_recomputed_at = Set(Some(Utc::now().into()));
            active.update(conn).await?;

            tracing::info!(
                project_id = %project_id,
                total_expenses = %margins.total_expenses,
                current_margin = %margins.current_margin,
                "project margins recomputed"
            );
        }
        RollupOutcome::Skipped { category } => {
            tracing::info!(project_id = %project_id, %category, "margin rollup skipped");
        }
    }

    Ok(outcome)
}

async fn load_inputs<C: ConnectionTrait>(
    conn: &C,
    project: &projects::Model,
) -> Result<MarginInputs, DbErr> {
    let estimate = match snapshot::current_approved_estimate(conn, project.id).await? {
        Some(estimate) => Some(EstimateBaseline {
            estimate_id: estimate.id,
            total_cost: estimate.total_cost,
            contingency_amount: estimate.contingency_amount,
            line_items: snapshot::estimate_items(conn, estimate.id).await?,
        }),
        None => None,
    };

    let quotes = snapshot::project_quotes(conn, project.id).await?;
    let change_orders = snapshot::change_orders(conn, project.id)
        .await?
        .into_iter()
        .map(|co| ChangeOrderImpact {
            id: co.id,
            status: co.status.into(),
            cost_impact: co.cost_impact,
            client_amount: co.client_amount,
            includes_contingency: co.includes_contingency,
            contingency_amount_used: co.contingency_amount_used,
        })
        .collect();
    let (expenses, splits) = snapshot::project_expenses(conn, project.id).await?;

    Ok(MarginInputs {
        project_id: project.id,
        category: project.category.into(),
        original_contract_amount: project.original_contract_amount,
        estimate,
        quotes,
        change_orders,
        expenses,
        splits,
        existing_original_margin: project.original_margin,
    })
}

#[cfg(test)]
#[path = "project_financials_tests.rs"]
mod tests;
