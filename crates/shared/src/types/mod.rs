//! Common types used across the application.

pub mod money;

pub use money::{CENT, MONEY_DP, percent_of, reaches, round_money};
