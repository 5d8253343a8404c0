//! Rollup domain types.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::allocation::{Expense, ExpenseSplit, LineItem, Quote};

/// Project category. Only construction projects carry financial rollups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectCategory {
    /// Client construction job.
    Construction,
    /// Internal system bucket.
    System,
    /// Overhead bucket.
    Overhead,
}

impl ProjectCategory {
    /// Database representation.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Construction => "construction",
            Self::System => "system",
            Self::Overhead => "overhead",
        }
    }
}

impl fmt::Display for ProjectCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProjectCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "construction" => Ok(Self::Construction),
            "system" => Ok(Self::System),
            "overhead" => Ok(Self::Overhead),
            _ => Err(format!("Unknown project category: {s}")),
        }
    }
}

/// Change order status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeOrderStatus {
    /// Awaiting client decision.
    Pending,
    /// Approved; contributes to the rollup.
    Approved,
    /// Rejected.
    Rejected,
}

impl ChangeOrderStatus {
    /// Database representation.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

impl FromStr for ChangeOrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            _ => Err(format!("Unknown change order status: {s}")),
        }
    }
}

/// The approved current-version estimate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EstimateBaseline {
    /// Estimate ID.
    pub estimate_id: Uuid,
    /// Estimated total cost.
    pub total_cost: Decimal,
    /// Contingency budget.
    pub contingency_amount: Decimal,
    /// Line items, used for quote substitution.
    pub line_items: Vec<LineItem>,
}

/// Financial effect of one change order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeOrderImpact {
    /// Change order ID.
    pub id: Uuid,
    /// Status.
    pub status: ChangeOrderStatus,
    /// Change in cost.
    pub cost_impact: Decimal,
    /// Change in contract value.
    pub client_amount: Decimal,
    /// Whether this change order draws on contingency.
    pub includes_contingency: bool,
    /// Contingency it draws.
    pub contingency_amount_used: Decimal,
}

impl ChangeOrderImpact {
    /// Returns true if approved.
    #[must_use]
    pub fn is_approved(&self) -> bool {
        self.status == ChangeOrderStatus::Approved
    }
}

/// Everything the calculator reads for one project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarginInputs {
    /// Project.
    pub project_id: Uuid,
    /// Category.
    pub category: ProjectCategory,
    /// Contract value before change orders.
    pub original_contract_amount: Decimal,
    /// Approved current estimate.
    pub estimate: Option<EstimateBaseline>,
    /// Project quotes (only accepted ones matter).
    pub quotes: Vec<Quote>,
    /// Project change orders (only approved ones matter).
    pub change_orders: Vec<ChangeOrderImpact>,
    /// Expenses owned by the project.
    pub expenses: Vec<Expense>,
    /// Splits of owned expenses plus splits attributed to the project.
    pub splits: Vec<ExpenseSplit>,
    /// Snapshot already stored, if any.
    pub existing_original_margin: Option<Decimal>,
}

/// Derived fields written to the project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectMargins {
    /// Actual spend attributed to the project.
    pub total_expenses: Decimal,
    /// Contract value including approved change orders.
    pub contracted_amount: Decimal,
    /// Contract value minus actual spend.
    pub current_margin: Decimal,
    /// Current margin over contract value, 0 when contract value is 0.
    pub current_margin_percentage: Decimal,
    /// As-estimated cost.
    pub original_est_costs: Option<Decimal>,
    /// Cost after quote substitution and change orders.
    pub adjusted_est_costs: Option<Decimal>,
    /// Contract value minus adjusted cost.
    pub projected_margin: Option<Decimal>,
    /// Margin at estimate approval; a snapshot.
    pub original_margin: Option<Decimal>,
    /// Contingency budget.
    pub contingency_amount: Option<Decimal>,
    /// Contingency drawn by approved change orders.
    pub contingency_used: Option<Decimal>,
    /// Contingency left, never negative.
    pub contingency_remaining: Option<Decimal>,
}

/// Data anomaly found while rolling up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RollupWarning {
    /// Split rows do not add up to the parent expense.
    SplitMismatch {
        /// Expense.
        expense_id: Uuid,
        /// Parent amount.
        expense_amount: Decimal,
        /// Sum of its split rows.
        splits_total: Decimal,
    },
}

/// Result of a rollup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RollupOutcome {
    /// Fields computed.
    Computed {
        /// New field values.
        margins: ProjectMargins,
        /// Anomalies.
        warnings: Vec<RollupWarning>,
    },
    /// Project does not participate in rollups.
    Skipped {
        /// Its category.
        category: ProjectCategory,
    },
}
