use rust_decimal::Decimal;

use crate::common::errors::MathResult;
use crate::common::types::OptionKind;
use crate::math::fixed::{add, mul};
use crate::math::round_up;

/// Notional trading fee
///
/// The fee is a fraction of the notional traded, charged on buys and on
/// sells alike:
/// - Calls: `size * rate` (notional in the base asset)
/// - Puts: `size * strike * rate` (notional in the quote asset)
///
/// Fees are collateral owed to the pool, so they round up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeSchedule {
    pub kind: OptionKind,
    pub rate: Decimal,
}

impl FeeSchedule {
    pub fn new(kind: OptionKind, rate: Decimal) -> Self {
        Self { kind, rate }
    }

    /// Notional of `size` units at `strike`, in collateral units
    pub fn notional(&self, strike: Decimal, size: Decimal) -> MathResult<Decimal> {
        match self.kind {
            OptionKind::Call => Ok(size),
            OptionKind::Put => mul(size, strike),
        }
    }

    /// Fee for a single-strike trade
    pub fn trade_fee(&self, strike: Decimal, size: Decimal) -> MathResult<Decimal> {
        if self.rate.is_zero() {
            return Ok(Decimal::ZERO);
        }
        Ok(round_up(mul(self.notional(strike, size)?, self.rate)?))
    }

    /// Fee for a batch of per-strike sizes, e.g. a combined depth+trade
    ///
    /// Each strike is rounded on its own so the batch never charges less than
    /// the same trades made one at a time.
    pub fn batch_fee(&self, strikes: &[Decimal], sizes: &[Decimal]) -> MathResult<Decimal> {
        strikes
            .iter()
            .zip(sizes)
            .try_fold(Decimal::ZERO, |acc, (strike, size)| {
                add(acc, self.trade_fee(*strike, *size)?)
            })
    }
}
