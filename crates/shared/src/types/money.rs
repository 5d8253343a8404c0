//! Decimal money helpers.
//!
//! CRITICAL: Never use floating-point for money calculations.
//! Every amount in the system is a `rust_decimal::Decimal`.

use rust_decimal::{Decimal, RoundingStrategy};

/// One cent; the smallest unit amounts are compared at.
pub const CENT: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Number of decimal places stored for currency amounts.
pub const MONEY_DP: u32 = 2;

/// Rounds an amount to currency precision using banker's rounding.
#[must_use]
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(MONEY_DP, RoundingStrategy::MidpointNearestEven)
}

/// Returns `part / whole * 100` rounded to two places, or zero when `whole` is zero.
#[must_use]
pub fn percent_of(part: Decimal, whole: Decimal) -> Decimal {
    if whole.is_zero() {
        return Decimal::ZERO;
    }
    (part / whole * Decimal::ONE_HUNDRED).round_dp(2)
}

/// Returns true if `value` reaches `target` once `tolerance` is allowed for.
#[must_use]
pub fn reaches(value: Decimal, target: Decimal, tolerance: Decimal) -> bool {
    value + tolerance >= target
}
