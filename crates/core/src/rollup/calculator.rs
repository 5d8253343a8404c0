//! Margin rollup calculator.
//!
//! Each derived field depends only on fields computed before it, and the
//! calculator is a pure function of its inputs, so recomputing with unchanged
//! inputs always yields the same values.

use std::collections::HashMap;

use rust_decimal::Decimal;
use uuid::Uuid;

use buildledger_shared::types::{CENT, percent_of};

use crate::allocation::{Expense, ExpenseSplit, LineItemSource, select_quoted_baselines};

use super::types::{
    ChangeOrderImpact, EstimateBaseline, MarginInputs, ProjectCategory, ProjectMargins,
    RollupOutcome, RollupWarning,
};

/// Margin calculator.
pub struct MarginCalculator;

impl MarginCalculator {
    /// Computes every derived field for a project.
    ///
    /// Non-construction projects are skipped. Missing estimate inputs yield
    /// null estimate-dependent fields rather than an error.
    #[must_use]
    pub fn compute(inputs: &MarginInputs) -> RollupOutcome {
        if inputs.category != ProjectCategory::Construction {
            return RollupOutcome::Skipped {
                category: inputs.category,
            };
        }

        let approved: Vec<&ChangeOrderImpact> =
            inputs.change_orders.iter().filter(|co| co.is_approved()).collect();

        let (total_expenses, warnings) =
            Self::total_expenses(inputs.project_id, &inputs.expenses, &inputs.splits);

        let contracted_amount = inputs.original_contract_amount
            + approved.iter().map(|co| co.client_amount).sum::<Decimal>();
        let current_margin = contracted_amount - total_expenses;
        let current_margin_percentage = percent_of(current_margin, contracted_amount);

        let mut margins = ProjectMargins {
            total_expenses,
            contracted_amount,
            current_margin,
            current_margin_percentage,
            original_est_costs: None,
            adjusted_est_costs: None,
            projected_margin: None,
            original_margin: inputs.existing_original_margin,
            contingency_amount: None,
            contingency_used: None,
            contingency_remaining: None,
        };

        if let Some(estimate) = &inputs.estimate {
            let original_est_costs = estimate.total_cost;
            let adjusted_est_costs = Self::adjusted_costs(estimate, inputs, &approved);
            let (used, remaining) = Self::contingency(estimate.contingency_amount, &approved);

            margins.original_est_costs = Some(original_est_costs);
            margins.adjusted_est_costs = Some(adjusted_est_costs);
            margins.projected_margin = Some(contracted_amount - adjusted_est_costs);
            margins.original_margin = inputs
                .existing_original_margin
                .or(Some(inputs.original_contract_amount - original_est_costs));
            margins.contingency_amount = Some(estimate.contingency_amount);
            margins.contingency_used = Some(used);
            margins.contingency_remaining = Some(remaining);
        }

        RollupOutcome::Computed { margins, warnings }
    }

    /// Actual spend attributed to `project_id`.
    ///
    /// Owned expenses without split rows count in full. Owned expenses with
    /// split rows count only through the rows attributed to this project, as
    /// do rows of other projects' expenses attributed here.
    #[must_use]
    pub fn total_expenses(
        project_id: Uuid,
        expenses: &[Expense],
        splits: &[ExpenseSplit],
    ) -> (Decimal, Vec<RollupWarning>) {
        let mut splits_by_expense: HashMap<Uuid, Decimal> = HashMap::new();
        for split in splits {
            *splits_by_expense.entry(split.expense_id).or_default() += split.split_amount;
        }

        let mut warnings = Vec::new();
        let mut total = Decimal::ZERO;

        for expense in expenses.iter().filter(|e| e.project_id == project_id) {
            match splits_by_expense.get(&expense.id) {
                Some(splits_total) => {
                    if (*splits_total - expense.amount).abs() >= CENT {
                        warnings.push(RollupWarning::SplitMismatch {
                            expense_id: expense.id,
                            expense_amount: expense.amount,
                            splits_total: *splits_total,
                        });
                    }
                }
                None => total += expense.amount,
            }
        }

        total += splits
            .iter()
            .filter(|s| s.project_id == project_id)
            .map(|s| s.split_amount)
            .sum::<Decimal>();

        (total, warnings)
    }

    /// Estimated cost with accepted quotes substituted for estimate line
    /// items, plus approved change-order cost impacts.
    fn adjusted_costs(
        estimate: &EstimateBaseline,
        inputs: &MarginInputs,
        approved: &[&ChangeOrderImpact],
    ) -> Decimal {
        let (baselines, _) = select_quoted_baselines(&inputs.quotes);

        let substitution: Decimal = estimate
            .line_items
            .iter()
            .filter(|li| li.item.source == LineItemSource::Estimate && !li.is_deleted)
            .filter_map(|li| baselines.get(&li.item).map(|q| q.cost - li.total_cost))
            .sum();

        estimate.total_cost
            + substitution
            + approved.iter().map(|co| co.cost_impact).sum::<Decimal>()
    }

    /// Contingency drawn by approved change orders, capped at the budget.
    fn contingency(budget: Decimal, approved: &[&ChangeOrderImpact]) -> (Decimal, Decimal) {
        let drawn: Decimal = approved
            .iter()
            .filter(|co| co.includes_contingency)
            .map(|co| co.contingency_amount_used)
            .sum();
        let used = drawn.min(budget).max(Decimal::ZERO);

        (used, (budget - used).max(Decimal::ZERO))
    }
}
