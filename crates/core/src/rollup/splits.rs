//! Rules for expense split rows.
//!
//! Split rows replace the parent amount in every total, so they must add up
//! to it exactly.

use rust_decimal::Decimal;

use super::error::RollupError;

/// Checks a full set of split amounts against the parent expense amount.
///
/// An empty set is valid and means the expense is not split.
///
/// # Errors
///
/// Returns `RollupError::NonPositiveSplit` for the first amount that is not
/// above zero, otherwise `SplitTotalMismatch` when the sum differs from
/// `expense_amount`.
pub fn validate_split_amounts(
    expense_amount: Decimal,
    amounts: &[Decimal],
) -> Result<(), RollupError> {
    if amounts.is_empty() {
        return Ok(());
    }

    if let Some((index, amount)) = amounts
        .iter()
        .enumerate()
        .find(|(_, a)| **a <= Decimal::ZERO)
    {
        return Err(RollupError::NonPositiveSplit {
            index,
            amount: *amount,
        });
    }

    let splits_total: Decimal = amounts.iter().copied().sum();
    if splits_total != expense_amount {
        return Err(RollupError::SplitTotalMismatch {
            expense_amount,
            splits_total,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_empty_means_unsplit() {
        assert_eq!(validate_split_amounts(dec!(100), &[]), Ok(()));
    }

    #[test]
    fn test_exact_sum_is_accepted() {
        assert_eq!(
            validate_split_amounts(dec!(1000), &[dec!(500), dec!(500.00)]),
            Ok(())
        );
    }

    #[test]
    fn test_rejects_zero_split() {
        assert_eq!(
            validate_split_amounts(dec!(100), &[dec!(100), dec!(0)]),
            Err(RollupError::NonPositiveSplit {
                index: 1,
                amount: dec!(0)
            })
        );
    }

    #[test]
    fn test_rejects_mismatch() {
        assert_eq!(
            validate_split_amounts(dec!(100), &[dec!(60), dec!(39.99)]),
            Err(RollupError::SplitTotalMismatch {
                expense_amount: dec!(100),
                splits_total: dec!(99.99),
            })
        );
    }
}
