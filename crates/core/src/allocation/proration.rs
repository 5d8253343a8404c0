//! Pro-rata distribution of an amount using the Largest Remainder Method.
//!
//! Used when one expense is correlated to a quote that covers several line
//! items: each item receives a share weighted by its quoted cost, and the
//! shares always sum exactly to the expense amount.

use rust_decimal::prelude::*;

use buildledger_shared::types::MONEY_DP;

/// Distributes `total` across `weights`.
///
/// Rules:
/// - Empty weights yield an empty vector.
/// - Negative weights count as zero.
/// - When every weight is zero the total is split equally.
/// - Shares are rounded to cents and the sum equals `total` rounded to cents.
#[must_use]
pub fn prorate(total: Decimal, weights: &[Decimal]) -> Vec<Decimal> {
    if weights.is_empty() {
        return vec![];
    }

    let weights: Vec<Decimal> = weights.iter().map(|w| (*w).max(Decimal::ZERO)).collect();
    let weight_sum: Decimal = weights.iter().copied().sum();

    let weights = if weight_sum.is_zero() {
        vec![Decimal::ONE; weights.len()]
    } else {
        weights
    };
    let weight_sum: Decimal = weights.iter().copied().sum();

    let unit = Decimal::new(1, MONEY_DP);
    let total_rounded = total.round_dp_with_strategy(MONEY_DP, RoundingStrategy::MidpointNearestEven);
    let negative = total_rounded.is_sign_negative();
    let magnitude = total_rounded.abs();

    let exact: Vec<Decimal> = weights.iter().map(|w| magnitude * *w / weight_sum).collect();

    let mut rounded: Vec<Decimal> = exact
        .iter()
        .map(|a| a.round_dp_with_strategy(MONEY_DP, RoundingStrategy::ToZero))
        .collect();

    let remainder = magnitude - rounded.iter().copied().sum::<Decimal>();
    let units = (remainder / unit)
        .round_dp_with_strategy(0, RoundingStrategy::ToZero)
        .to_u64()
        .and_then(|u| usize::try_from(u).ok())
        .unwrap_or(0);

    if units > 0 {
        let mut remainders: Vec<(usize, Decimal)> = exact
            .iter()
            .zip(rounded.iter())
            .enumerate()
            .map(|(i, (e, r))| (i, *e - *r))
            .collect();

        // Largest fractional part first; earlier index wins ties.
        remainders.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

        for (idx, _) in remainders.iter().take(units) {
            rounded[*idx] += unit;
        }
    }

    if negative {
        rounded.iter_mut().for_each(|r| *r = -*r);
    }
    rounded
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_prorate_empty() {
        assert!(prorate(dec!(100), &[]).is_empty());
    }

    #[test]
    fn test_prorate_single_takes_everything() {
        assert_eq!(prorate(dec!(1000), &[dec!(420)]), vec![dec!(1000)]);
    }

    #[test]
    fn test_prorate_by_cost() {
        // Quote lines of 300 and 100 share a 1000 invoice 3:1.
        let shares = prorate(dec!(1000), &[dec!(300), dec!(100)]);
        assert_eq!(shares, vec![dec!(750), dec!(250)]);
    }

    #[test]
    fn test_prorate_thirds_keep_every_cent() {
        let shares = prorate(dec!(100), &[dec!(1), dec!(1), dec!(1)]);
        assert_eq!(shares, vec![dec!(33.34), dec!(33.33), dec!(33.33)]);
    }

    #[test]
    fn test_prorate_zero_weights_split_equally() {
        let shares = prorate(dec!(10), &[Decimal::ZERO, Decimal::ZERO]);
        assert_eq!(shares, vec![dec!(5), dec!(5)]);
    }

    #[test]
    fn test_prorate_negative_total() {
        // Vendor credits are distributed the same way.
        let shares = prorate(dec!(-100), &[dec!(1), dec!(1), dec!(1)]);
        assert_eq!(shares.iter().copied().sum::<Decimal>(), dec!(-100));
        assert_eq!(shares[0], dec!(-33.34));
    }

    proptest! {
        #[test]
        fn prop_prorate_sum_invariant(
            total_cents in 0i64..100_000_000,
            weights in prop::collection::vec(0i64..1_000_000, 1..12),
        ) {
            let total = Decimal::new(total_cents, 2);
            let weights: Vec<Decimal> = weights.into_iter().map(|w| Decimal::new(w, 2)).collect();
            let shares = prorate(total, &weights);

            prop_assert_eq!(shares.len(), weights.len());
            prop_assert_eq!(shares.iter().copied().sum::<Decimal>(), total);
            prop_assert!(shares.iter().all(|s| *s >= Decimal::ZERO));
        }
    }
}
