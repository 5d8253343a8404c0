//! Expense-to-line-item allocation.
//!
//! Computes how much of each billable line item's baseline cost is covered by
//! correlated vendor expenses, and scores advisory matches for expenses that
//! are not yet correlated.

pub mod correlation;
pub mod engine;
pub mod error;
pub mod graph;
pub mod matching;
pub mod proration;
pub mod types;


pub use correlation::{NewCorrelation, ValidatedCorrelation};
pub use engine::{ALLOCATION_EPSILON, AllocationEngine};
pub use error::AllocationError;
pub use graph::{
    QuotedBaseline, TargetResolution, contributing_amount, resolve_correlation_targets,
    select_quoted_baselines,
};
pub use matching::{
    ExpenseToMatch, MAX_CONFIDENCE, MatchCandidate, MatchWeights, SUGGESTION_THRESHOLD,
    ScoredCandidate, calculate_match_confidence, rank_candidates, score_candidate,
    suggest_line_item_allocation,
};
pub use proration::prorate;
pub use types::{
    AllocationStatus, AllocationSuggestion, AllocationSummary, AllocationWarning, BaselineSource,
    CategoryGroup, Correlation, CorrelationTarget, CorrelationType, Expense, ExpenseSplit,
    LineItem, LineItemAllocation, LineItemCategory, LineItemRef, LineItemSource, ProjectGraph,
    Quote, QuoteLine, QuoteStatus,
};
