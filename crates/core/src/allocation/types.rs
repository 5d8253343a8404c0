//! Allocation domain types.
//!
//! The input side is a [`ProjectGraph`]: a snapshot of one project's line items,
//! quotes, expenses, splits and correlations as read from the store. The output
//! side is an [`AllocationSummary`].

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Line item category.
///
/// Internal categories are covered by tracked labor hours, not vendor expenses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineItemCategory {
    /// In-house labor.
    LaborInternal,
    /// Project management.
    Management,
    /// Subcontracted work.
    Subcontractors,
    /// Materials.
    Materials,
    /// Equipment rental or purchase.
    Equipment,
    /// Permits and fees.
    Permits,
    /// Anything else.
    Other,
}

impl LineItemCategory {
    /// All categories in display order.
    pub const ALL: [Self; 7] = [
        Self::LaborInternal,
        Self::Management,
        Self::Subcontractors,
        Self::Materials,
        Self::Equipment,
        Self::Permits,
        Self::Other,
    ];

    /// Database / wire representation.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::LaborInternal => "labor_internal",
            Self::Management => "management",
            Self::Subcontractors => "subcontractors",
            Self::Materials => "materials",
            Self::Equipment => "equipment",
            Self::Permits => "permits",
            Self::Other => "other",
        }
    }

    /// Returns true for categories excluded from allocation tracking.
    pub const fn is_internal(self) -> bool {
        matches!(self, Self::LaborInternal | Self::Management)
    }
}

impl fmt::Display for LineItemCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LineItemCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| format!("Unknown line item category: {s}"))
    }
}

/// Which document a line item belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineItemSource {
    /// Line item of an estimate.
    Estimate,
    /// Line item of a change order.
    ChangeOrder,
}

/// Reference to an estimate or change-order line item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LineItemRef {
    /// Owning document kind.
    pub source: LineItemSource,
    /// Line item ID.
    pub id: Uuid,
}

impl LineItemRef {
    /// Reference to an estimate line item.
    #[must_use]
    pub const fn estimate(id: Uuid) -> Self {
        Self {
            source: LineItemSource::Estimate,
            id,
        }
    }

    /// Reference to a change-order line item.
    #[must_use]
    pub const fn change_order(id: Uuid) -> Self {
        Self {
            source: LineItemSource::ChangeOrder,
            id,
        }
    }
}

/// An estimate or change-order line item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineItem {
    /// Reference (source + ID).
    pub item: LineItemRef,
    /// Category.
    pub category: LineItemCategory,
    /// Description.
    pub description: String,
    /// Estimated (or change-order) total cost.
    pub total_cost: Decimal,
    /// Soft-deleted items stay in the store but are ignored.
    pub is_deleted: bool,
}

impl LineItem {
    /// Billable means external and not deleted.
    #[must_use]
    pub const fn is_billable(&self) -> bool {
        !self.category.is_internal() && !self.is_deleted
    }
}

/// Vendor quote status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuoteStatus {
    /// Awaiting a decision.
    Pending,
    /// Accepted; replaces the line-item cost baseline.
    Accepted,
    /// Rejected.
    Rejected,
    /// Expired.
    Expired,
}

/// One line of a vendor quote.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteLine {
    /// Quote line item ID.
    pub id: Uuid,
    /// The estimate or change-order line item this line bids against.
    pub target: Option<LineItemRef>,
    /// Quoted cost.
    pub total_cost: Decimal,
}

/// A vendor quote with its lines.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quote {
    /// Quote ID.
    pub id: Uuid,
    /// Project the quote is attached to.
    pub project_id: Uuid,
    /// Vendor.
    pub payee_id: Option<Uuid>,
    /// Status.
    pub status: QuoteStatus,
    /// Date printed on the quote.
    pub quote_date: Option<NaiveDate>,
    /// Date the quote was accepted.
    pub accepted_date: Option<NaiveDate>,
    /// Quote lines.
    pub lines: Vec<QuoteLine>,
}

impl Quote {
    /// Returns true if the quote is accepted.
    #[must_use]
    pub fn is_accepted(&self) -> bool {
        self.status == QuoteStatus::Accepted
    }
}

/// A vendor invoice or cost entry.
///
/// Receipts are absent: they never enter a total.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Expense {
    /// Expense ID.
    pub id: Uuid,
    /// Owning project.
    pub project_id: Uuid,
    /// Vendor.
    pub payee_id: Option<Uuid>,
    /// Full amount.
    pub amount: Decimal,
    /// Transaction date.
    pub expense_date: NaiveDate,
    /// Split flag as stored.
    pub is_split: bool,
}

/// Part of an expense attributed to a (possibly different) project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpenseSplit {
    /// Split ID.
    pub id: Uuid,
    /// Parent expense.
    pub expense_id: Uuid,
    /// Project this part is attributed to.
    pub project_id: Uuid,
    /// Amount attributed.
    pub split_amount: Decimal,
}

/// What a correlation points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum CorrelationTarget {
    /// An estimate line item.
    EstimateLineItem(Uuid),
    /// A change-order line item.
    ChangeOrderLineItem(Uuid),
    /// A vendor quote (resolved through its lines).
    Quote(Uuid),
}

impl CorrelationTarget {
    /// The correlation type implied by the target.
    #[must_use]
    pub const fn correlation_type(self) -> CorrelationType {
        match self {
            Self::EstimateLineItem(_) => CorrelationType::Estimated,
            Self::ChangeOrderLineItem(_) => CorrelationType::ChangeOrder,
            Self::Quote(_) => CorrelationType::Quoted,
        }
    }

    /// Target as a line item reference, if it is one.
    #[must_use]
    pub const fn line_item(self) -> Option<LineItemRef> {
        match self {
            Self::EstimateLineItem(id) => Some(LineItemRef::estimate(id)),
            Self::ChangeOrderLineItem(id) => Some(LineItemRef::change_order(id)),
            Self::Quote(_) => None,
        }
    }
}

impl From<LineItemRef> for CorrelationTarget {
    fn from(item: LineItemRef) -> Self {
        match item.source {
            LineItemSource::Estimate => Self::EstimateLineItem(item.id),
            LineItemSource::ChangeOrder => Self::ChangeOrderLineItem(item.id),
        }
    }
}

/// Correlation type as stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrelationType {
    /// Against an estimate line item.
    Estimated,
    /// Against a vendor quote.
    Quoted,
    /// Against a change-order line item.
    ChangeOrder,
}

impl CorrelationType {
    /// Database representation.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Estimated => "estimated",
            Self::Quoted => "quoted",
            Self::ChangeOrder => "change_order",
        }
    }
}

/// Link between one expense (or split) and one target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Correlation {
    /// Correlation ID.
    pub id: Uuid,
    /// Expense.
    pub expense_id: Uuid,
    /// Split, when only part of the expense is linked.
    pub split_id: Option<Uuid>,
    /// Target.
    pub target: CorrelationTarget,
    /// System-suggested rather than human-confirmed.
    pub auto_correlated: bool,
    /// Score recorded when the correlation was suggested.
    pub confidence_score: Option<u8>,
}

/// Snapshot of everything the allocation engine reads for one project.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectGraph {
    /// Project ID.
    pub project_id: Uuid,
    /// Current approved estimate, if any.
    pub estimate_id: Option<Uuid>,
    /// Estimate line items plus line items of approved change orders.
    pub line_items: Vec<LineItem>,
    /// Quotes attached to the project.
    pub quotes: Vec<Quote>,
    /// Expenses owned by the project and parents of splits attributed to it.
    pub expenses: Vec<Expense>,
    /// Splits of the loaded expenses and splits attributed to the project.
    pub splits: Vec<ExpenseSplit>,
    /// Correlations touching the project's expenses, line items or quotes.
    pub correlations: Vec<Correlation>,
}

/// Coverage status of a billable line item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllocationStatus {
    /// Allocated amount covers the baseline.
    Full,
    /// Some, but not all, of the baseline is covered.
    Partial,
    /// Nothing allocated.
    None,
}

/// Where a line item's baseline cost comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BaselineSource {
    /// The line item's own estimated cost.
    Estimated,
    /// An accepted quote's line.
    Quoted {
        /// The quote supplying the baseline.
        quote_id: Uuid,
    },
}

/// Allocation result for one billable line item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineItemAllocation {
    /// Line item.
    pub item: LineItemRef,
    /// Category.
    pub category: LineItemCategory,
    /// Description.
    pub description: String,
    /// Estimated (or change-order) cost.
    pub estimated_cost: Decimal,
    /// Cost measured against.
    pub baseline_cost: Decimal,
    /// Origin of the baseline.
    pub baseline_source: BaselineSource,
    /// Sum of contributing expense amounts.
    pub allocated_amount: Decimal,
    /// Baseline not yet covered, never negative.
    pub outstanding_amount: Decimal,
    /// Coverage status.
    pub status: AllocationStatus,
    /// Correlations contributing to this item.
    pub correlation_ids: Vec<Uuid>,
}

/// Line items of one category with subtotals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryGroup {
    /// Category.
    pub category: LineItemCategory,
    /// Items in the category.
    pub line_items: Vec<LineItemAllocation>,
    /// Sum of estimated costs.
    pub estimated_total: Decimal,
    /// Sum of baseline (quoted where available) costs.
    pub baseline_total: Decimal,
    /// Sum of allocated amounts.
    pub allocated_total: Decimal,
    /// Items with full or partial allocation.
    pub allocated_count: usize,
}

/// Data anomaly detected while computing a summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AllocationWarning {
    /// More than one accepted quote bids on the same line item.
    DuplicateQuoteAcceptance {
        /// Line item.
        item: LineItemRef,
        /// Quote used as baseline.
        chosen_quote_id: Uuid,
        /// Other accepted quotes ignored.
        ignored_quote_ids: Vec<Uuid>,
    },
    /// Correlation targets a quote that is not accepted.
    CorrelationToUnacceptedQuote {
        /// Correlation.
        correlation_id: Uuid,
        /// Quote.
        quote_id: Uuid,
    },
    /// Correlation target or source cannot be resolved.
    DanglingCorrelation {
        /// Correlation.
        correlation_id: Uuid,
        /// What is missing.
        reason: String,
    },
}

/// Advisory match for an uncorrelated expense (or split).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationSuggestion {
    /// Expense.
    pub expense_id: Uuid,
    /// Split, when the unmatched unit is a split.
    pub split_id: Option<Uuid>,
    /// Amount of the unmatched unit.
    pub amount: Decimal,
    /// Best candidate, if any scored above zero.
    pub suggested_item: Option<LineItemRef>,
    /// Best score (0..=100).
    pub confidence: u8,
}

/// Coverage summary for a project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationSummary {
    /// Project.
    pub project_id: Uuid,
    /// Estimate the items came from.
    pub estimate_id: Option<Uuid>,
    /// Items grouped by category.
    pub groups: Vec<CategoryGroup>,
    /// Number of billable line items.
    pub total_external_line_items: usize,
    /// Items with full or partial allocation.
    pub allocated_count: usize,
    /// Items with no allocation.
    pub pending_count: usize,
    /// `allocated_count / total * 100`, or 100 when there is nothing to allocate.
    pub allocation_percent: Decimal,
    /// Sum of estimated costs.
    pub estimated_total: Decimal,
    /// Sum of baselines.
    pub baseline_total: Decimal,
    /// Sum of allocated amounts.
    pub allocated_total: Decimal,
    /// Sum of outstanding amounts.
    pub outstanding_total: Decimal,
    /// Data anomalies.
    pub warnings: Vec<AllocationWarning>,
    /// Uncorrelated expenses with suggestions.
    pub unmatched_expenses: Vec<AllocationSuggestion>,
}

impl AllocationSummary {
    /// Iterates over every line item across groups.
    pub fn line_items(&self) -> impl Iterator<Item = &LineItemAllocation> {
        self.groups.iter().flat_map(|g| g.line_items.iter())
    }
}
