//! Allocation repository: coverage summaries and expense match suggestions.

use chrono::Days;
use sea_orm::{DatabaseConnection, DbErr, EntityTrait};
use serde::Serialize;
use uuid::Uuid;

use buildledger_core::allocation::{
    AllocationEngine, AllocationSummary, ExpenseToMatch, LineItemRef, MatchCandidate, MatchWeights,
    SUGGESTION_THRESHOLD, ScoredCandidate, calculate_match_confidence, rank_candidates,
    suggest_line_item_allocation,
};
use buildledger_shared::MatchingConfig;

use crate::entities::{expense_splits, expenses, projects};

use super::snapshot;

/// Number of ranked alternatives returned with a suggestion.
const RANKED_CANDIDATES: usize = 5;

/// Error types for allocation reads.
#[derive(Debug, thiserror::Error)]
pub enum AllocationRepoError {
    /// Project not found.
    #[error("Project not found: {0}")]
    ProjectNotFound(Uuid),

    /// Expense not found.
    #[error("Expense not found: {0}")]
    ExpenseNotFound(Uuid),

    /// Split not found on the expense.
    #[error("Expense split {split_id} not found on expense {expense_id}")]
    SplitNotFound {
        /// Expense.
        expense_id: Uuid,
        /// Split.
        split_id: Uuid,
    },

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

/// Advisory suggestion for one expense or split.
#[derive(Debug, Clone, Serialize)]
pub struct ExpenseSuggestion {
    /// Expense.
    pub expense_id: Uuid,
    /// Split, when a split was matched.
    pub split_id: Option<Uuid>,
    /// Amount matched.
    pub amount: rust_decimal::Decimal,
    /// Best candidate, if anything scored.
    pub suggested_item: Option<LineItemRef>,
    /// Best score, 0..=100.
    pub confidence: u8,
    /// Whether the confidence reaches the display threshold.
    pub suggested: bool,
    /// Best candidates in rank order.
    pub candidates: Vec<ScoredCandidate>,
}

/// Allocation repository.
#[derive(Debug, Clone)]
pub struct AllocationRepository {
    db: DatabaseConnection,
    weights: MatchWeights,
    candidate_window_days: u32,
}

impl AllocationRepository {
    /// Creates a new allocation repository.
    #[must_use]
    pub fn new(db: DatabaseConnection, matching: &MatchingConfig) -> Self {
        Self {
            db,
            weights: MatchWeights::from(matching),
            candidate_window_days: matching.candidate_window_days,
        }
    }

    /// Computes the coverage summary of a project.
    ///
    /// A project without an approved current estimate yields an empty summary.
    pub async fn compute_summary(
        &self,
        project_id: Uuid,
    ) -> Result<AllocationSummary, AllocationRepoError> {
        projects::Entity::find_by_id(project_id)
            .one(&self.db)
            .await?
            .ok_or(AllocationRepoError::ProjectNotFound(project_id))?;

        let graph = snapshot::project_graph(&self.db, project_id).await?;
        let summary = AllocationEngine::compute_summary(&graph, &self.weights);

        for warning in &summary.warnings {
            tracing::warn!(project_id = %project_id, ?warning, "allocation data anomaly");
        }
        tracing::debug!(
            project_id = %project_id,
            items = summary.total_external_line_items,
            allocated = summary.allocated_count,
            unmatched = summary.unmatched_expenses.len(),
            "allocation summary computed"
        );

        Ok(summary)
    }

    /// Scores line items for an expense, or one of its splits.
    ///
    /// Candidates are the billable items of the expense's project (or the
    /// split's project) plus lines of accepted quotes in other projects dated
    /// within the configured window around the expense date. Quote lines
    /// pointing at internal, deleted or superseded items are dropped.
    pub async fn suggest_for_expense(
        &self,
        expense_id: Uuid,
        split_id: Option<Uuid>,
    ) -> Result<ExpenseSuggestion, AllocationRepoError> {
        let expense = expenses::Entity::find_by_id(expense_id)
            .one(&self.db)
            .await?
            .ok_or(AllocationRepoError::ExpenseNotFound(expense_id))?;

        let (project_id, amount) = match split_id {
            Some(split_id) => {
                let split = expense_splits::Entity::find_by_id(split_id)
                    .one(&self.db)
                    .await?
                    .filter(|s| s.expense_id == expense_id)
                    .ok_or(AllocationRepoError::SplitNotFound {
                        expense_id,
                        split_id,
                    })?;
                (split.project_id, split.split_amount)
            }
            None => (expense.project_id, expense.amount),
        };

        let to_match = ExpenseToMatch {
            expense_id,
            project_id,
            payee_id: expense.payee_id,
            amount,
            date: expense.expense_date,
        };

        let candidates = self.candidates_for(&to_match).await?;

        let confidence = calculate_match_confidence(&to_match, &candidates, &self.weights);
        let mut ranked = rank_candidates(&to_match, &candidates, &self.weights);
        ranked.truncate(RANKED_CANDIDATES);

        Ok(ExpenseSuggestion {
            expense_id,
            split_id,
            amount,
            suggested_item: suggest_line_item_allocation(&to_match, &candidates, &self.weights),
            confidence,
            suggested: confidence >= SUGGESTION_THRESHOLD,
            candidates: ranked,
        })
    }

    async fn candidates_for(
        &self,
        expense: &ExpenseToMatch,
    ) -> Result<Vec<MatchCandidate>, DbErr> {
        let graph = snapshot::project_graph(&self.db, expense.project_id).await?;
        let mut candidates = AllocationEngine::line_item_candidates(&graph);

        let window = Days::new(u64::from(self.candidate_window_days));
        let from = expense.date.checked_sub_days(window).unwrap_or(expense.date);
        let to = expense.date.checked_add_days(window).unwrap_or(expense.date);

        let quotes =
            snapshot::accepted_quotes_between(&self.db, expense.project_id, from, to).await?;
        let quoted: Vec<MatchCandidate> = quotes
            .iter()
            .flat_map(|quote| {
                quote.lines.iter().filter_map(|line| {
                    line.target.map(|item| MatchCandidate {
                        item,
                        project_id: quote.project_id,
                        payee_id: quote.payee_id,
                        amount: line.total_cost,
                        reference_date: quote.quote_date,
                    })
                })
            })
            .collect();

        if !quoted.is_empty() {
            let refs: Vec<LineItemRef> = quoted.iter().map(|c| c.item).collect();
            let billable = snapshot::billable_targets(&self.db, &refs).await?;
            candidates.extend(quoted.into_iter().filter(|c| billable.contains(&c.item)));
        }

        Ok(candidates)
    }
}

#[cfg(test)]
#[path = "allocation_tests.rs"]
mod tests;
