//! Confidence scoring for expense-to-line-item suggestions.
//!
//! Purely advisory: nothing here creates a correlation. The scorer returns raw
//! additive scores; whether a score is high enough to show as "suggested" is
//! the caller's policy (see [`SUGGESTION_THRESHOLD`]).

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use buildledger_shared::MatchingConfig;

use super::types::LineItemRef;

/// Score at which the UI presents a candidate as "suggested".
pub const SUGGESTION_THRESHOLD: u8 = 40;

/// Maximum confidence reported.
pub const MAX_CONFIDENCE: u8 = 100;

/// Additive bonuses for each matching signal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchWeights {
    /// Amounts equal.
    pub exact_amount: u8,
    /// Amounts within tolerance.
    pub near_amount: u8,
    /// Tolerance as a percentage of the expense amount.
    pub near_amount_percent: Decimal,
    /// Tolerance floor in currency units.
    pub near_amount_floor: Decimal,
    /// Same day.
    pub same_day: u8,
    /// Within 3 days.
    pub within_3_days: u8,
    /// Within 7 days.
    pub within_7_days: u8,
    /// Same payee.
    pub same_payee: u8,
    /// Same project.
    pub same_project: u8,
}

impl Default for MatchWeights {
    fn default() -> Self {
        Self::from(&MatchingConfig::default())
    }
}

impl From<&MatchingConfig> for MatchWeights {
    fn from(config: &MatchingConfig) -> Self {
        Self {
            exact_amount: config.exact_amount,
            near_amount: config.near_amount,
            near_amount_percent: config.near_amount_percent,
            near_amount_floor: config.near_amount_floor,
            same_day: config.same_day,
            within_3_days: config.within_3_days,
            within_7_days: config.within_7_days,
            same_payee: config.same_payee,
            same_project: config.same_project,
        }
    }
}

/// The expense side of a match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpenseToMatch {
    /// Expense.
    pub expense_id: Uuid,
    /// Owning project.
    pub project_id: Uuid,
    /// Vendor.
    pub payee_id: Option<Uuid>,
    /// Amount being matched (split amount for splits).
    pub amount: Decimal,
    /// Expense (or receipt) date.
    pub date: NaiveDate,
}

/// A line item that an expense could be allocated to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchCandidate {
    /// Line item.
    pub item: LineItemRef,
    /// Project owning the line item.
    pub project_id: Uuid,
    /// Vendor on the source document, when known.
    pub payee_id: Option<Uuid>,
    /// Amount the vendor document states for this item.
    pub amount: Decimal,
    /// Document date used for proximity and tie-breaking.
    pub reference_date: Option<NaiveDate>,
}

/// A candidate with its score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredCandidate {
    /// Line item.
    pub item: LineItemRef,
    /// Raw additive score.
    pub score: u16,
}

/// Scores one candidate against an expense.
#[must_use]
pub fn score_candidate(
    expense: &ExpenseToMatch,
    candidate: &MatchCandidate,
    weights: &MatchWeights,
) -> u16 {
    let mut score = 0u16;

    let difference = (expense.amount - candidate.amount).abs();
    let tolerance = (expense.amount.abs() * weights.near_amount_percent / Decimal::ONE_HUNDRED)
        .max(weights.near_amount_floor);
    if difference.is_zero() {
        score += u16::from(weights.exact_amount);
    } else if difference <= tolerance {
        score += u16::from(weights.near_amount);
    }

    if let Some(reference) = candidate.reference_date {
        let gap = (expense.date - reference).num_days().abs();
        score += match gap {
            0 => u16::from(weights.same_day),
            1..=3 => u16::from(weights.within_3_days),
            4..=7 => u16::from(weights.within_7_days),
            _ => 0,
        };
    }

    if expense.payee_id.is_some() && expense.payee_id == candidate.payee_id {
        score += u16::from(weights.same_payee);
    }

    if expense.project_id == candidate.project_id {
        score += u16::from(weights.same_project);
    }

    score
}

/// Scores every candidate and returns them best first.
///
/// Order: score descending, then most recent reference date, then line item
/// ID ascending so the result is deterministic.
#[must_use]
pub fn rank_candidates(
    expense: &ExpenseToMatch,
    candidates: &[MatchCandidate],
    weights: &MatchWeights,
) -> Vec<ScoredCandidate> {
    let mut scored: Vec<(&MatchCandidate, u16)> = candidates
        .iter()
        .map(|c| (c, score_candidate(expense, c, weights)))
        .collect();

    scored.sort_by(|(a, sa), (b, sb)| {
        sb.cmp(sa)
            .then(b.reference_date.cmp(&a.reference_date))
            .then(a.item.id.cmp(&b.item.id))
    });

    scored
        .into_iter()
        .map(|(c, score)| ScoredCandidate {
            item: c.item,
            score,
        })
        .collect()
}

/// Suggests the best line item for an expense, or `None` when nothing scores.
#[must_use]
pub fn suggest_line_item_allocation(
    expense: &ExpenseToMatch,
    candidates: &[MatchCandidate],
    weights: &MatchWeights,
) -> Option<LineItemRef> {
    rank_candidates(expense, candidates, weights)
        .into_iter()
        .next()
        .filter(|best| best.score > 0)
        .map(|best| best.item)
}

/// Best score across candidates, capped at 100. Zero with no candidates.
#[must_use]
pub fn calculate_match_confidence(
    expense: &ExpenseToMatch,
    candidates: &[MatchCandidate],
    weights: &MatchWeights,
) -> u8 {
    let best = candidates
        .iter()
        .map(|c| score_candidate(expense, c, weights))
        .max()
        .unwrap_or(0);

    u8::try_from(best.min(u16::from(MAX_CONFIDENCE))).unwrap_or(MAX_CONFIDENCE)
}
