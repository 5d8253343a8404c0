//! Allocation summary computation.

use std::collections::{BTreeMap, HashMap, HashSet};

use rust_decimal::Decimal;
use uuid::Uuid;

use buildledger_shared::types::{CENT, percent_of, reaches};

use super::graph::{
    QuotedBaseline, TargetResolution, contributing_amount, resolve_correlation_targets,
    select_quoted_baselines,
};
use super::matching::{
    ExpenseToMatch, MatchCandidate, MatchWeights, calculate_match_confidence,
    suggest_line_item_allocation,
};
use super::types::{
    AllocationStatus, AllocationSuggestion, AllocationSummary, AllocationWarning, BaselineSource,
    CategoryGroup, Expense, ExpenseSplit, LineItem, LineItemAllocation, LineItemCategory,
    LineItemRef, ProjectGraph, Quote,
};

/// Tolerance when comparing allocated amounts against baselines.
pub const ALLOCATION_EPSILON: Decimal = CENT;

/// Allocation engine.
pub struct AllocationEngine;

impl AllocationEngine {
    /// Computes the coverage summary for one project snapshot.
    ///
    /// A project without an approved current estimate yields an empty summary.
    /// Correlations whose target lies outside the snapshot (another project's
    /// line item or quote) are skipped; soft-deleted targets are flagged.
    #[must_use]
    pub fn compute_summary(graph: &ProjectGraph, weights: &MatchWeights) -> AllocationSummary {
        if graph.estimate_id.is_none() {
            return AllocationSummary::empty(graph.project_id);
        }

        let items_by_ref: HashMap<LineItemRef, &LineItem> =
            graph.line_items.iter().map(|li| (li.item, li)).collect();

        let (baselines, duplicate_warnings) = select_quoted_baselines(&graph.quotes);
        let mut warnings: Vec<AllocationWarning> = duplicate_warnings
            .into_iter()
            .filter(|w| match w {
                AllocationWarning::DuplicateQuoteAcceptance { item, .. } => items_by_ref
                    .get(item)
                    .is_some_and(|li| li.is_billable()),
                _ => true,
            })
            .collect();

        let allocations = Self::allocate(graph, &items_by_ref, &mut warnings);

        let mut groups: BTreeMap<LineItemCategory, Vec<LineItemAllocation>> = BTreeMap::new();
        for line_item in graph.line_items.iter().filter(|li| li.is_billable()) {
            let (allocated_amount, correlation_ids) = allocations
                .get(&line_item.item)
                .cloned()
                .unwrap_or_default();
            let allocation = Self::line_item_allocation(
                line_item,
                baselines.get(&line_item.item),
                allocated_amount,
                correlation_ids,
            );
            groups
                .entry(line_item.category)
                .or_default()
                .push(allocation);
        }

        let groups: Vec<CategoryGroup> = LineItemCategory::ALL
            .into_iter()
            .filter_map(|category| {
                groups
                    .remove(&category)
                    .map(|items| Self::category_group(category, items))
            })
            .collect();

        let unmatched_expenses = Self::unmatched_expenses(graph, weights);

        Self::assemble(graph, groups, warnings, unmatched_expenses)
    }

    /// Classifies a line item's coverage.
    ///
    /// `None` wins when nothing is allocated, so a zero baseline with no
    /// expenses is still pending. A net credit (negative total) covers nothing.
    #[must_use]
    pub fn classify(allocated: Decimal, baseline: Decimal) -> AllocationStatus {
        if allocated <= Decimal::ZERO {
            AllocationStatus::None
        } else if reaches(allocated, baseline, ALLOCATION_EPSILON) {
            AllocationStatus::Full
        } else {
            AllocationStatus::Partial
        }
    }

    /// Billable line items of the snapshot as match candidates.
    ///
    /// Items covered by an accepted quote carry the quote's payee, date and
    /// cost; the rest carry their own cost and no document date.
    #[must_use]
    pub fn line_item_candidates(graph: &ProjectGraph) -> Vec<MatchCandidate> {
        let (baselines, _) = select_quoted_baselines(&graph.quotes);
        let quotes: HashMap<Uuid, &Quote> = graph.quotes.iter().map(|q| (q.id, q)).collect();

        graph
            .line_items
            .iter()
            .filter(|li| li.is_billable())
            .map(|li| {
                let quoted = baselines
                    .get(&li.item)
                    .and_then(|b| quotes.get(&b.quote_id).map(|q| (b, *q)));
                match quoted {
                    Some((baseline, quote)) => MatchCandidate {
                        item: li.item,
                        project_id: graph.project_id,
                        payee_id: quote.payee_id,
                        amount: baseline.cost,
                        reference_date: quote.quote_date.or(quote.accepted_date),
                    },
                    None => MatchCandidate {
                        item: li.item,
                        project_id: graph.project_id,
                        payee_id: None,
                        amount: li.total_cost,
                        reference_date: None,
                    },
                }
            })
            .collect()
    }

    /// Sums contributions per billable item.
    fn allocate(
        graph: &ProjectGraph,
        items_by_ref: &HashMap<LineItemRef, &LineItem>,
        warnings: &mut Vec<AllocationWarning>,
    ) -> HashMap<LineItemRef, (Decimal, Vec<Uuid>)> {
        let expenses: HashMap<Uuid, &Expense> = graph.expenses.iter().map(|e| (e.id, e)).collect();
        let splits: HashMap<Uuid, &ExpenseSplit> =
            graph.splits.iter().map(|s| (s.id, s)).collect();
        let quotes: HashMap<Uuid, &Quote> = graph.quotes.iter().map(|q| (q.id, q)).collect();

        let mut allocations: HashMap<LineItemRef, (Decimal, Vec<Uuid>)> = HashMap::new();

        for correlation in &graph.correlations {
            let Some(amount) = contributing_amount(correlation, &expenses, &splits) else {
                warnings.push(AllocationWarning::DanglingCorrelation {
                    correlation_id: correlation.id,
                    reason: match correlation.split_id {
                        Some(split_id) => format!("expense split {split_id} not found"),
                        None => format!("expense {} not found", correlation.expense_id),
                    },
                });
                continue;
            };

            let parts = match resolve_correlation_targets(correlation.target, amount, &quotes) {
                TargetResolution::Items(parts) => parts,
                TargetResolution::UnacceptedQuote(quote_id) => {
                    warnings.push(AllocationWarning::CorrelationToUnacceptedQuote {
                        correlation_id: correlation.id,
                        quote_id,
                    });
                    continue;
                }
                TargetResolution::QuoteWithoutLineItems(quote_id) => {
                    warnings.push(AllocationWarning::DanglingCorrelation {
                        correlation_id: correlation.id,
                        reason: format!("quote {quote_id} references no line items"),
                    });
                    continue;
                }
                // Another project's quote.
                TargetResolution::UnknownQuote(_) => continue,
            };

            for (item, share) in parts {
                let Some(line_item) = items_by_ref.get(&item) else {
                    continue;
                };
                if line_item.is_deleted {
                    warnings.push(AllocationWarning::DanglingCorrelation {
                        correlation_id: correlation.id,
                        reason: format!("line item {} is deleted", item.id),
                    });
                    continue;
                }
                if line_item.category.is_internal() {
                    continue;
                }

                let entry = allocations.entry(item).or_default();
                entry.0 += share;
                if !entry.1.contains(&correlation.id) {
                    entry.1.push(correlation.id);
                }
            }
        }

        allocations
    }

    fn line_item_allocation(
        line_item: &LineItem,
        quoted: Option<&QuotedBaseline>,
        allocated_amount: Decimal,
        correlation_ids: Vec<Uuid>,
    ) -> LineItemAllocation {
        let (baseline_cost, baseline_source) = match quoted {
            Some(q) => (
                q.cost,
                BaselineSource::Quoted {
                    quote_id: q.quote_id,
                },
            ),
            None => (line_item.total_cost, BaselineSource::Estimated),
        };

        LineItemAllocation {
            item: line_item.item,
            category: line_item.category,
            description: line_item.description.clone(),
            estimated_cost: line_item.total_cost,
            baseline_cost,
            baseline_source,
            allocated_amount,
            outstanding_amount: (baseline_cost - allocated_amount).max(Decimal::ZERO),
            status: Self::classify(allocated_amount, baseline_cost),
            correlation_ids,
        }
    }

    fn category_group(
        category: LineItemCategory,
        line_items: Vec<LineItemAllocation>,
    ) -> CategoryGroup {
        CategoryGroup {
            category,
            estimated_total: line_items.iter().map(|li| li.estimated_cost).sum(),
            baseline_total: line_items.iter().map(|li| li.baseline_cost).sum(),
            allocated_total: line_items.iter().map(|li| li.allocated_amount).sum(),
            allocated_count: line_items
                .iter()
                .filter(|li| li.status != AllocationStatus::None)
                .count(),
            line_items,
        }
    }

    /// Expenses and splits attributed to the project that no correlation covers.
    ///
    /// An expense with split rows is represented by its splits for this
    /// project; a whole-expense correlation covers all of its splits.
    fn unmatched_expenses(
        graph: &ProjectGraph,
        weights: &MatchWeights,
    ) -> Vec<AllocationSuggestion> {
        let whole: HashSet<Uuid> = graph
            .correlations
            .iter()
            .filter(|c| c.split_id.is_none())
            .map(|c| c.expense_id)
            .collect();
        let by_split: HashSet<Uuid> = graph
            .correlations
            .iter()
            .filter_map(|c| c.split_id)
            .collect();
        let split_parents: HashSet<Uuid> = graph.splits.iter().map(|s| s.expense_id).collect();

        let candidates = Self::line_item_candidates(graph);
        let mut unmatched = Vec::new();

        for expense in &graph.expenses {
            if whole.contains(&expense.id) {
                continue;
            }

            let units: Vec<(Option<Uuid>, Uuid, Decimal)> = if split_parents.contains(&expense.id) {
                graph
                    .splits
                    .iter()
                    .filter(|s| s.expense_id == expense.id && s.project_id == graph.project_id)
                    .filter(|s| !by_split.contains(&s.id))
                    .map(|s| (Some(s.id), s.project_id, s.split_amount))
                    .collect()
            } else if expense.project_id == graph.project_id {
                vec![(None, expense.project_id, expense.amount)]
            } else {
                vec![]
            };

            for (split_id, project_id, amount) in units {
                let to_match = ExpenseToMatch {
                    expense_id: expense.id,
                    project_id,
                    payee_id: expense.payee_id,
                    amount,
                    date: expense.expense_date,
                };
                unmatched.push(AllocationSuggestion {
                    expense_id: expense.id,
                    split_id,
                    amount,
                    suggested_item: suggest_line_item_allocation(&to_match, &candidates, weights),
                    confidence: calculate_match_confidence(&to_match, &candidates, weights),
                });
            }
        }

        unmatched
    }

    fn assemble(
        graph: &ProjectGraph,
        groups: Vec<CategoryGroup>,
        warnings: Vec<AllocationWarning>,
        unmatched_expenses: Vec<AllocationSuggestion>,
    ) -> AllocationSummary {
        let total_external_line_items: usize = groups.iter().map(|g| g.line_items.len()).sum();
        let allocated_count: usize = groups.iter().map(|g| g.allocated_count).sum();
        let outstanding_total = groups
            .iter()
            .flat_map(|g| g.line_items.iter())
            .map(|li| li.outstanding_amount)
            .sum();

        AllocationSummary {
            project_id: graph.project_id,
            estimate_id: graph.estimate_id,
            total_external_line_items,
            allocated_count,
            pending_count: total_external_line_items - allocated_count,
            allocation_percent: allocation_percent(allocated_count, total_external_line_items),
            estimated_total: groups.iter().map(|g| g.estimated_total).sum(),
            baseline_total: groups.iter().map(|g| g.baseline_total).sum(),
            allocated_total: groups.iter().map(|g| g.allocated_total).sum(),
            outstanding_total,
            groups,
            warnings,
            unmatched_expenses,
        }
    }
}

impl AllocationSummary {
    /// Summary for a project with nothing to allocate yet.
    #[must_use]
    pub fn empty(project_id: Uuid) -> Self {
        Self {
            project_id,
            estimate_id: None,
            groups: vec![],
            total_external_line_items: 0,
            allocated_count: 0,
            pending_count: 0,
            allocation_percent: Decimal::ONE_HUNDRED,
            estimated_total: Decimal::ZERO,
            baseline_total: Decimal::ZERO,
            allocated_total: Decimal::ZERO,
            outstanding_total: Decimal::ZERO,
            warnings: vec![],
            unmatched_expenses: vec![],
        }
    }
}

/// Share of items with any allocation; 100 when there are none to allocate.
fn allocation_percent(allocated: usize, total: usize) -> Decimal {
    if total == 0 {
        return Decimal::ONE_HUNDRED;
    }
    percent_of(Decimal::from(allocated), Decimal::from(total))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocation::types::{
        Correlation, CorrelationTarget, QuoteLine, QuoteStatus,
    };
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    const PROJECT: Uuid = Uuid::from_u128(1);

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, d).unwrap()
    }

    fn item(id: u128, category: LineItemCategory, cost: Decimal) -> LineItem {
        LineItem {
            item: LineItemRef::estimate(Uuid::from_u128(id)),
            category,
            description: format!("item {id}"),
            total_cost: cost,
            is_deleted: false,
        }
    }

    fn expense(id: u128, amount: Decimal) -> Expense {
        Expense {
            id: Uuid::from_u128(id),
            project_id: PROJECT,
            payee_id: Some(Uuid::from_u128(900)),
            amount,
            expense_date: date(11),
            is_split: false,
        }
    }

    fn correlate(id: u128, expense_id: u128, target: CorrelationTarget) -> Correlation {
        Correlation {
            id: Uuid::from_u128(id),
            expense_id: Uuid::from_u128(expense_id),
            split_id: None,
            target,
            auto_correlated: false,
            confidence_score: None,
        }
    }

    fn graph() -> ProjectGraph {
        ProjectGraph {
            project_id: PROJECT,
            estimate_id: Some(Uuid::from_u128(2)),
            ..ProjectGraph::default()
        }
    }

    #[test]
    fn test_no_estimate_yields_empty_summary() {
        let mut g = graph();
        g.estimate_id = None;
        g.line_items = vec![item(10, LineItemCategory::Materials, dec!(100))];

        let summary = AllocationEngine::compute_summary(&g, &MatchWeights::default());

        assert!(summary.groups.is_empty());
        assert_eq!(summary.total_external_line_items, 0);
        assert_eq!(summary.allocation_percent, dec!(100));
    }

    #[test]
    fn test_statuses_and_aggregates() {
        let mut g = graph();
        g.line_items = vec![
            item(10, LineItemCategory::Materials, dec!(1000)),
            item(11, LineItemCategory::Materials, dec!(500)),
            item(12, LineItemCategory::Permits, dec!(200)),
            item(13, LineItemCategory::LaborInternal, dec!(5000)),
        ];
        g.expenses = vec![expense(20, dec!(1000)), expense(21, dec!(200))];
        g.correlations = vec![
            correlate(30, 20, CorrelationTarget::EstimateLineItem(Uuid::from_u128(10))),
            correlate(31, 21, CorrelationTarget::EstimateLineItem(Uuid::from_u128(11))),
        ];

        let summary = AllocationEngine::compute_summary(&g, &MatchWeights::default());

        assert_eq!(summary.total_external_line_items, 3);
        assert_eq!(summary.allocated_count, 2);
        assert_eq!(summary.pending_count, 1);
        assert_eq!(summary.allocation_percent, dec!(66.67));
        assert_eq!(summary.allocated_total, dec!(1200));
        assert_eq!(summary.outstanding_total, dec!(500));

        let statuses: Vec<_> = summary.line_items().map(|li| li.status).collect();
        assert_eq!(
            statuses,
            vec![
                AllocationStatus::Full,
                AllocationStatus::Partial,
                AllocationStatus::None
            ]
        );
        assert_eq!(summary.groups.len(), 2);
        assert_eq!(summary.groups[0].category, LineItemCategory::Materials);
    }

    #[test]
    fn test_internal_items_never_appear_even_when_correlated() {
        let mut g = graph();
        g.line_items = vec![item(13, LineItemCategory::Management, dec!(100))];
        g.expenses = vec![expense(20, dec!(100))];
        g.correlations = vec![correlate(
            30,
            20,
            CorrelationTarget::EstimateLineItem(Uuid::from_u128(13)),
        )];

        let summary = AllocationEngine::compute_summary(&g, &MatchWeights::default());

        assert_eq!(summary.line_items().count(), 0);
        assert!(summary.warnings.is_empty());
        assert_eq!(summary.allocation_percent, dec!(100));
    }

    #[test]
    fn test_accepted_quote_sets_baseline_and_two_hop_allocates() {
        let mut g = graph();
        g.line_items = vec![item(10, LineItemCategory::Subcontractors, dec!(500))];
        g.quotes = vec![Quote {
            id: Uuid::from_u128(40),
            project_id: PROJECT,
            payee_id: Some(Uuid::from_u128(900)),
            status: QuoteStatus::Accepted,
            quote_date: Some(date(1)),
            accepted_date: Some(date(2)),
            lines: vec![QuoteLine {
                id: Uuid::from_u128(41),
                target: Some(LineItemRef::estimate(Uuid::from_u128(10))),
                total_cost: dec!(420),
            }],
        }];
        g.expenses = vec![expense(20, dec!(420))];
        g.correlations = vec![correlate(30, 20, CorrelationTarget::Quote(Uuid::from_u128(40)))];

        let summary = AllocationEngine::compute_summary(&g, &MatchWeights::default());
        let li = summary.line_items().next().unwrap();

        assert_eq!(li.estimated_cost, dec!(500));
        assert_eq!(li.baseline_cost, dec!(420));
        assert_eq!(
            li.baseline_source,
            BaselineSource::Quoted {
                quote_id: Uuid::from_u128(40)
            }
        );
        assert_eq!(li.allocated_amount, dec!(420));
        assert_eq!(li.status, AllocationStatus::Full);
        assert_eq!(li.correlation_ids, vec![Uuid::from_u128(30)]);
    }

    #[test]
    fn test_epsilon_absorbs_rounding() {
        assert_eq!(
            AllocationEngine::classify(dec!(99.995), dec!(100)),
            AllocationStatus::Full
        );
        assert_eq!(
            AllocationEngine::classify(dec!(99.98), dec!(100)),
            AllocationStatus::Partial
        );
        assert_eq!(
            AllocationEngine::classify(Decimal::ZERO, Decimal::ZERO),
            AllocationStatus::None
        );
    }

    #[test]
    fn test_credit_only_item_is_not_allocated() {
        let mut g = graph();
        g.line_items = vec![item(10, LineItemCategory::Materials, dec!(500))];
        g.expenses = vec![expense(20, dec!(-100))];
        g.correlations = vec![correlate(
            30,
            20,
            CorrelationTarget::EstimateLineItem(Uuid::from_u128(10)),
        )];

        let summary = AllocationEngine::compute_summary(&g, &MatchWeights::default());
        let li = summary.line_items().next().unwrap();

        assert_eq!(li.allocated_amount, dec!(-100));
        assert_eq!(li.status, AllocationStatus::None);
        assert_eq!(summary.allocated_count, 0);
        assert_eq!(summary.pending_count, 1);
        assert_eq!(summary.allocation_percent, Decimal::ZERO);
        assert_eq!(
            AllocationEngine::classify(dec!(-0.01), Decimal::ZERO),
            AllocationStatus::None
        );
    }

    #[test]
    fn test_unaccepted_quote_and_deleted_item_warn() {
        let mut g = graph();
        let mut deleted = item(11, LineItemCategory::Materials, dec!(50));
        deleted.is_deleted = true;
        g.line_items = vec![item(10, LineItemCategory::Materials, dec!(100)), deleted];
        g.quotes = vec![Quote {
            id: Uuid::from_u128(40),
            project_id: PROJECT,
            payee_id: None,
            status: QuoteStatus::Pending,
            quote_date: None,
            accepted_date: None,
            lines: vec![],
        }];
        g.expenses = vec![expense(20, dec!(10)), expense(21, dec!(10))];
        g.correlations = vec![
            correlate(30, 20, CorrelationTarget::Quote(Uuid::from_u128(40))),
            correlate(31, 21, CorrelationTarget::EstimateLineItem(Uuid::from_u128(11))),
        ];

        let summary = AllocationEngine::compute_summary(&g, &MatchWeights::default());

        assert_eq!(summary.allocated_total, Decimal::ZERO);
        assert_eq!(summary.warnings.len(), 2);
        assert!(matches!(
            summary.warnings[0],
            AllocationWarning::CorrelationToUnacceptedQuote { .. }
        ));
        assert!(matches!(
            summary.warnings[1],
            AllocationWarning::DanglingCorrelation { .. }
        ));
        // Deleted items are not billable.
        assert_eq!(summary.total_external_line_items, 1);
    }

    #[test]
    fn test_split_correlation_uses_split_amount() {
        let mut g = graph();
        g.line_items = vec![item(10, LineItemCategory::Materials, dec!(1000))];
        let mut parent = expense(20, dec!(1000));
        parent.is_split = true;
        g.expenses = vec![parent];
        g.splits = vec![
            ExpenseSplit {
                id: Uuid::from_u128(50),
                expense_id: Uuid::from_u128(20),
                project_id: PROJECT,
                split_amount: dec!(500),
            },
            ExpenseSplit {
                id: Uuid::from_u128(51),
                expense_id: Uuid::from_u128(20),
                project_id: Uuid::from_u128(99),
                split_amount: dec!(500),
            },
        ];
        let mut c = correlate(30, 20, CorrelationTarget::EstimateLineItem(Uuid::from_u128(10)));
        c.split_id = Some(Uuid::from_u128(50));
        g.correlations = vec![c];

        let summary = AllocationEngine::compute_summary(&g, &MatchWeights::default());
        let li = summary.line_items().next().unwrap();

        assert_eq!(li.allocated_amount, dec!(500));
        assert_eq!(li.status, AllocationStatus::Partial);
        // The other split belongs to another project and is not listed here.
        assert!(summary.unmatched_expenses.is_empty());
    }

    #[test]
    fn test_unmatched_expenses_carry_suggestions() {
        let mut g = graph();
        g.line_items = vec![
            item(10, LineItemCategory::Materials, dec!(1000)),
            item(11, LineItemCategory::Equipment, dec!(300)),
        ];
        g.expenses = vec![expense(20, dec!(1000)), expense(21, dec!(7))];

        let summary = AllocationEngine::compute_summary(&g, &MatchWeights::default());

        assert_eq!(summary.unmatched_expenses.len(), 2);
        let first = &summary.unmatched_expenses[0];
        assert_eq!(
            first.suggested_item,
            Some(LineItemRef::estimate(Uuid::from_u128(10)))
        );
        // Exact amount plus same project.
        assert_eq!(first.confidence, 50);
    }
}
