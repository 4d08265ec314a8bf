//! LMSR and LS-LMSR cost functions
//!
//! `cost(q, b) = max(q) + b * ln(Σ exp((q_i - max(q)) / b))`, with
//! `cost(q, 0) = max(q)`. The liquidity-sensitive variant derives the depth
//! from the quantities themselves: `b = alpha * Σq`.
//!
//! A trade is priced by evaluating the cost before and after it; there is no
//! closed-form shortcut on the payment path.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::fixed::{add, div, exp, ln, mul, sub, EXP_CUTOFF, LN_2};
use crate::common::errors::{MathError, MathResult};

/// Step used for finite-difference marginal prices
pub const PRICE_EPSILON: Decimal = dec!(0.000000001);

/// A cost function bound to its liquidity parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CostFunction {
    /// Fixed liquidity depth `b`
    Lmsr { depth: Decimal },
    /// Depth scales with outstanding quantity, `b = alpha * Σq`
    LsLmsr { alpha: Decimal },
}

impl CostFunction {
    /// Liquidity depth in effect for `q`
    pub fn depth(&self, q: &[Decimal]) -> MathResult<Decimal> {
        match *self {
            CostFunction::Lmsr { depth } => Ok(depth),
            CostFunction::LsLmsr { alpha } => mul(alpha, sum_quantities(q)?),
        }
    }

    /// Cost of holding the outcome vector `q`
    pub fn evaluate(&self, q: &[Decimal]) -> MathResult<Decimal> {
        cost(q, self.depth(q)?)
    }

    /// `cost(after) - cost(before)`
    pub fn delta(&self, before: &[Decimal], after: &[Decimal]) -> MathResult<Decimal> {
        sub(self.evaluate(after)?, self.evaluate(before)?)
    }

    /// Marginal price of every outcome bucket
    ///
    /// LMSR with positive depth uses the exact softmax. Everything else uses
    /// a forward difference with step [`PRICE_EPSILON`].
    pub fn prices(&self, q: &[Decimal]) -> MathResult<Vec<Decimal>> {
        match *self {
            CostFunction::Lmsr { depth } if depth > Decimal::ZERO => softmax(q, depth),
            _ => self.finite_difference_prices(q),
        }
    }

    fn finite_difference_prices(&self, q: &[Decimal]) -> MathResult<Vec<Decimal>> {
        let base = self.evaluate(q)?;
        let mut bumped = q.to_vec();
        let mut prices = Vec::with_capacity(q.len());
        for i in 0..q.len() {
            bumped[i] = add(q[i], PRICE_EPSILON)?;
            let shifted = self.evaluate(&bumped)?;
            prices.push(div(sub(shifted, base)?, PRICE_EPSILON)?);
            bumped[i] = q[i];
        }
        Ok(prices)
    }
}

/// Convert a worst-case loss per unit of quantity into LS-LMSR alpha
///
/// `alpha = loss / (2 ln 2)`
pub fn alpha_from_max_loss(max_loss: Decimal) -> MathResult<Decimal> {
    div(max_loss, mul(Decimal::TWO, LN_2)?)
}

fn validate(q: &[Decimal]) -> MathResult<Decimal> {
    let max = q.iter().copied().max().ok_or(MathError::EmptyQuantities)?;
    if q.iter().any(|qi| qi.is_sign_negative() && !qi.is_zero()) {
        return Err(MathError::NegativeQuantity);
    }
    Ok(max)
}

fn sum_quantities(q: &[Decimal]) -> MathResult<Decimal> {
    q.iter().try_fold(Decimal::ZERO, |acc, qi| add(acc, *qi))
}

/// `Σ exp((q_i - max) / b)`, skipping terms below decimal precision
fn shifted_exp_sum(q: &[Decimal], max: Decimal, b: Decimal) -> MathResult<(Decimal, Vec<Decimal>)> {
    // When b * cutoff overflows every gap is within range.
    let limit = b.checked_mul(EXP_CUTOFF);
    let mut terms = Vec::with_capacity(q.len());
    for &qi in q {
        let gap = max - qi;
        let term = if gap.is_zero() {
            Decimal::ONE
        } else if limit.is_some_and(|limit| gap > limit) {
            Decimal::ZERO
        } else {
            exp(-div(gap, b)?)?
        };
        terms.push(term);
    }
    let sum = terms
        .iter()
        .try_fold(Decimal::ZERO, |acc, term| add(acc, *term))?;
    Ok((sum, terms))
}

/// LMSR cost at depth `b`
pub fn cost(q: &[Decimal], b: Decimal) -> MathResult<Decimal> {
    let max = validate(q)?;
    if b.is_sign_negative() && !b.is_zero() {
        return Err(MathError::NegativeDepth);
    }
    if b.is_zero() {
        return Ok(max);
    }
    let (sum, _) = shifted_exp_sum(q, max, b)?;
    add(max, mul(b, ln(sum)?)?)
}

/// LS-LMSR cost, `cost(q, alpha * Σq)`
pub fn ls_cost(q: &[Decimal], alpha: Decimal) -> MathResult<Decimal> {
    CostFunction::LsLmsr { alpha }.evaluate(q)
}

fn softmax(q: &[Decimal], b: Decimal) -> MathResult<Vec<Decimal>> {
    let max = validate(q)?;
    let (sum, terms) = shifted_exp_sum(q, max, b)?;
    terms.into_iter().map(|term| div(term, sum)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const TOLERANCE: Decimal = dec!(0.00000000000000000001);

    fn assert_close(actual: Decimal, expected: Decimal, tolerance: Decimal) {
        let diff = (actual - expected).abs();
        assert!(
            diff <= tolerance,
            "expected {expected}, got {actual} (diff {diff})"
        );
    }

    fn ls_alpha() -> Decimal {
        alpha_from_max_loss(dec!(0.1)).unwrap()
    }

    #[test]
    fn test_cost_reference_values() {
        assert_close(
            cost(&[dec!(0), dec!(2), dec!(2), dec!(2), dec!(2)], dec!(10)).unwrap(),
            dec!(17.72510564148344379184006691),
            TOLERANCE,
        );
        assert_close(
            cost(&[Decimal::ZERO; 5], dec!(10)).unwrap(),
            dec!(16.09437912434100374600759333),
            TOLERANCE,
        );
        assert_close(
            cost(&[dec!(0), dec!(0), dec!(1), dec!(1), dec!(1)], dec!(10)).unwrap(),
            dec!(16.70629480184325744854673737),
            TOLERANCE,
        );
        assert_close(
            cost(&[dec!(2), dec!(0), dec!(1), dec!(3), dec!(3)], dec!(15)).unwrap(),
            dec!(25.98644487792625419358925501),
            TOLERANCE,
        );
    }

    #[test]
    fn test_zero_depth_is_max() {
        assert_eq!(cost(&[dec!(1), dec!(7), dec!(3)], Decimal::ZERO).unwrap(), dec!(7));
        assert_eq!(cost(&[Decimal::ZERO; 3], Decimal::ZERO).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_ls_cost_reference_values() {
        let alpha = ls_alpha();
        let cases = [
            ([dec!(1), dec!(0)], dec!(1.000000068793027542056910053)),
            ([dec!(10), dec!(0)], dec!(10.00000068793027542056910053)),
            ([dec!(1), dec!(1)], dec!(1.1)),
            ([dec!(3), dec!(11)], dec!(11.00036631188036661852158662)),
            ([dec!(10), dec!(15)], dec!(15.10932855156292426031758251)),
            ([dec!(6), dec!(2)], dec!(6.000563277757123355562644067)),
        ];
        for (q, expected) in cases {
            assert_close(ls_cost(&q, alpha).unwrap(), expected, TOLERANCE);
        }

        assert_close(
            ls_cost(&[dec!(0), dec!(2), dec!(2), dec!(2), dec!(2)], dec!(0.1)).unwrap(),
            dec!(3.125286309567732804757341437),
            TOLERANCE,
        );
    }

    #[test]
    fn test_ls_cost_empty_market_is_zero() {
        assert_eq!(ls_cost(&[Decimal::ZERO; 4], ls_alpha()).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_cost_bounded_below_by_max_and_monotonic() {
        let base = [dec!(0.5), dec!(3), dec!(2.25), dec!(0), dec!(1)];
        for b in [dec!(0), dec!(0.001), dec!(1), dec!(10), dec!(1000)] {
            let value = cost(&base, b).unwrap();
            assert!(value >= dec!(3));
            for i in 0..base.len() {
                let mut bumped = base;
                bumped[i] += dec!(0.01);
                assert!(cost(&bumped, b).unwrap() >= value, "not monotonic at {i}, b={b}");
            }
        }
    }

    #[test]
    fn test_large_quantities_and_tiny_depth() {
        let q = [dec!(1000000000000000000), dec!(0), dec!(999999999999999999)];
        assert_eq!(cost(&q, dec!(0.000000001)).unwrap(), dec!(1000000000000000000));

        let deep = cost(&q, dec!(1000000000000000000)).unwrap();
        assert!(deep > dec!(1000000000000000000));

        let ls = ls_cost(&q, dec!(0.01)).unwrap();
        assert!(ls > dec!(1000000000000000000));
    }

    #[test]
    fn test_rejects_bad_input() {
        assert_eq!(cost(&[], dec!(1)), Err(MathError::EmptyQuantities));
        assert_eq!(cost(&[dec!(-1), dec!(1)], dec!(1)), Err(MathError::NegativeQuantity));
        assert_eq!(cost(&[dec!(1)], dec!(-1)), Err(MathError::NegativeDepth));
    }

    #[test]
    fn test_lmsr_prices_sum_to_one() {
        let f = CostFunction::Lmsr { depth: dec!(10) };
        let prices = f.prices(&[dec!(0), dec!(2), dec!(2), dec!(2), dec!(2)]).unwrap();
        let total: Decimal = prices.iter().sum();
        assert_close(total, Decimal::ONE, dec!(0.0000000000000000000001));
        assert!(prices[0] < prices[1]);
    }

    #[test]
    fn test_ls_prices_sum_above_one() {
        let f = CostFunction::LsLmsr { alpha: ls_alpha() };
        let prices = f.prices(&[dec!(10), dec!(15)]).unwrap();
        let total: Decimal = prices.iter().sum();
        assert!(total > Decimal::ONE);
        assert!(total < dec!(1.2));
        assert!(prices[1] > prices[0]);
    }

    #[test]
    fn test_delta_matches_two_evaluations() {
        let f = CostFunction::Lmsr { depth: dec!(10) };
        let before = [Decimal::ZERO; 5];
        let after = [dec!(0), dec!(2), dec!(2), dec!(2), dec!(2)];
        assert_close(
            f.delta(&before, &after).unwrap(),
            dec!(1.630726517142440045832473575),
            TOLERANCE,
        );
    }
}
