//! Project financial rollup.
//!
//! Derives the cached margin and contingency fields of a project from its
//! estimate, accepted quotes, approved change orders and expenses.

pub mod calculator;
pub mod error;
pub mod splits;
pub mod types;


pub use calculator::MarginCalculator;
pub use error::RollupError;
pub use splits::validate_split_amounts;
pub use types::{
    ChangeOrderImpact, ChangeOrderStatus, EstimateBaseline, MarginInputs, ProjectCategory,
    ProjectMargins, RollupOutcome, RollupWarning,
};
