//! Graph traversal over a project's linked documents.
//!
//! Two questions are answered here, both in isolation from the summary logic:
//! which accepted quote (if any) sets a line item's baseline, and which line
//! items a correlation effectively pays for. The second is a two-hop walk when
//! the correlation targets a quote: correlation -> quote -> quote line -> item.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use uuid::Uuid;

use super::proration::prorate;
use super::types::{
    AllocationWarning, Correlation, CorrelationTarget, Expense, ExpenseSplit, LineItemRef, Quote,
};

/// Baseline supplied by an accepted quote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotedBaseline {
    /// Winning quote.
    pub quote_id: Uuid,
    /// Quoted cost for the item.
    pub cost: Decimal,
}

/// Picks, for each line item, the accepted quote that supplies its baseline.
///
/// When several accepted quotes bid on the same item the most recently
/// accepted wins (`accepted_date` descending, then quote ID ascending) and a
/// [`AllocationWarning::DuplicateQuoteAcceptance`] is emitted.
#[must_use]
pub fn select_quoted_baselines(
    quotes: &[Quote],
) -> (BTreeMap<LineItemRef, QuotedBaseline>, Vec<AllocationWarning>) {
    let mut bids: BTreeMap<LineItemRef, Vec<(Option<NaiveDate>, Uuid, Decimal)>> = BTreeMap::new();

    for quote in quotes.iter().filter(|q| q.is_accepted()) {
        for line in &quote.lines {
            if let Some(target) = line.target {
                bids.entry(target)
                    .or_default()
                    .push((quote.accepted_date, quote.id, line.total_cost));
            }
        }
    }

    let mut baselines = BTreeMap::new();
    let mut warnings = Vec::new();

    for (item, mut candidates) in bids {
        // Option<NaiveDate> orders None first, so reversing puts undated last.
        candidates.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));

        let (_, quote_id, _) = candidates[0];
        // A quote may bid on the same item on several lines; those add up.
        let cost = candidates
            .iter()
            .filter(|(_, id, _)| *id == quote_id)
            .map(|(_, _, c)| *c)
            .sum();

        let mut ignored: Vec<Uuid> = candidates
            .iter()
            .map(|(_, id, _)| *id)
            .filter(|id| *id != quote_id)
            .collect();
        ignored.dedup();

        if !ignored.is_empty() {
            warnings.push(AllocationWarning::DuplicateQuoteAcceptance {
                item,
                chosen_quote_id: quote_id,
                ignored_quote_ids: ignored,
            });
        }

        baselines.insert(item, QuotedBaseline { quote_id, cost });
    }

    (baselines, warnings)
}

/// Amount a correlation contributes: the split amount when a split is linked,
/// the full expense amount otherwise. `None` when the source row is missing.
#[must_use]
pub fn contributing_amount(
    correlation: &Correlation,
    expenses: &HashMap<Uuid, &Expense>,
    splits: &HashMap<Uuid, &ExpenseSplit>,
) -> Option<Decimal> {
    match correlation.split_id {
        Some(split_id) => splits
            .get(&split_id)
            .filter(|s| s.expense_id == correlation.expense_id)
            .map(|s| s.split_amount),
        None => expenses.get(&correlation.expense_id).map(|e| e.amount),
    }
}

/// Outcome of resolving a correlation to line items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetResolution {
    /// The amount lands on these items.
    Items(Vec<(LineItemRef, Decimal)>),
    /// The correlation targets a quote that is not accepted.
    UnacceptedQuote(Uuid),
    /// The target quote is unknown.
    UnknownQuote(Uuid),
    /// The target quote has no lines referencing a line item.
    QuoteWithoutLineItems(Uuid),
}

/// Resolves the effective line items a correlation pays for.
///
/// A direct line-item target receives the full amount. A quote target is
/// walked through its lines; when it references several items the amount is
/// distributed pro-rata by quoted cost so the parts sum to the amount.
#[must_use]
pub fn resolve_correlation_targets(
    target: CorrelationTarget,
    amount: Decimal,
    quotes: &HashMap<Uuid, &Quote>,
) -> TargetResolution {
    let quote_id = match target {
        CorrelationTarget::EstimateLineItem(id) => {
            return TargetResolution::Items(vec![(LineItemRef::estimate(id), amount)]);
        }
        CorrelationTarget::ChangeOrderLineItem(id) => {
            return TargetResolution::Items(vec![(LineItemRef::change_order(id), amount)]);
        }
        CorrelationTarget::Quote(id) => id,
    };

    let Some(quote) = quotes.get(&quote_id) else {
        return TargetResolution::UnknownQuote(quote_id);
    };

    if !quote.is_accepted() {
        return TargetResolution::UnacceptedQuote(quote_id);
    }

    // Merge repeated targets so each item appears once.
    let mut weights: BTreeMap<LineItemRef, Decimal> = BTreeMap::new();
    for line in &quote.lines {
        if let Some(item) = line.target {
            *weights.entry(item).or_default() += line.total_cost;
        }
    }

    if weights.is_empty() {
        return TargetResolution::QuoteWithoutLineItems(quote_id);
    }

    let items: Vec<LineItemRef> = weights.keys().copied().collect();
    let costs: Vec<Decimal> = weights.values().copied().collect();
    let shares = prorate(amount, &costs);

    TargetResolution::Items(items.into_iter().zip(shares).collect())
}
