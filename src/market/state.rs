//! Persisted market record and the derived LMSR outcome vector

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::common::errors::{MarketError, MathResult, Result};
use crate::common::types::{Arm, OptionKind};
use crate::math::fixed::{add, div, mul};
use crate::math::{round_up, CostFunction};

use super::fees::FeeSchedule;

/// Default window for correcting the settlement price
pub const DEFAULT_DISPUTE_PERIOD_SECS: i64 = 3600;

/// How the liquidity depth is determined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Curve {
    /// Explicit depth `b`, funded by liquidity shares
    Depth,
    /// `b = alpha * Σq`
    LiquiditySensitive { alpha: Decimal },
}

/// Fields captured by `settle()`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settlement {
    /// Price of record
    pub price: Decimal,
    pub settled_at: DateTime<Utc>,
    /// Collateral cost of the outstanding positions at settlement
    pub cost_at_settlement: Decimal,
    /// Payoff of every position outstanding at settlement, at `price`
    pub total_payoff: Decimal,
    /// Part of `cost_at_settlement` held back for position holders
    pub reserved: Decimal,
    /// The price was corrected once
    pub disputed: bool,
    /// Collateral paid out by redemptions so far
    pub redeemed: Decimal,
}

/// Complete state of one market
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketState {
    pub strike_prices: Vec<Decimal>,
    pub kind: OptionKind,
    pub curve: Curve,
    /// Depth `b` for [`Curve::Depth`]; zero otherwise
    pub depth: Decimal,
    pub long_supply: Vec<Decimal>,
    pub short_supply: Vec<Decimal>,
    pub trading_fee: Decimal,
    /// 0 = unlimited
    pub balance_cap: Decimal,
    /// 0 = unlimited
    pub supply_cap: Decimal,
    pub expiry_time: DateTime<Utc>,
    pub dispute_period_secs: i64,
    pub settlement: Option<Settlement>,
    /// Fees charged since the last collection
    pub fees_accrued: Decimal,
    pub paused: bool,
}

impl MarketState {
    pub fn num_strikes(&self) -> usize {
        self.strike_prices.len()
    }

    /// Largest strike; put costs are quoted in these units
    pub fn max_strike(&self) -> Decimal {
        self.strike_prices.last().copied().unwrap_or(Decimal::ZERO)
    }

    pub fn supply(&self, arm: Arm, strike_index: usize) -> Decimal {
        let supplies = match arm {
            Arm::Long => &self.long_supply,
            Arm::Short => &self.short_supply,
        };
        supplies.get(strike_index).copied().unwrap_or(Decimal::ZERO)
    }

    fn supply_mut(&mut self, arm: Arm, strike_index: usize) -> Result<&mut Decimal> {
        let len = self.strike_prices.len();
        let supplies = match arm {
            Arm::Long => &mut self.long_supply,
            Arm::Short => &mut self.short_supply,
        };
        supplies
            .get_mut(strike_index)
            .ok_or(MarketError::IndexOutOfRange {
                index: strike_index,
                len,
            })
    }

    /// Increase a supply by exactly `size`
    pub fn add_position(&mut self, arm: Arm, strike_index: usize, size: Decimal) -> Result<()> {
        let supply = self.supply_mut(arm, strike_index)?;
        let updated = add(*supply, size)?;
        if updated - *supply != size {
            return Err(MarketError::PrecisionLoss { size });
        }
        *supply = updated;
        Ok(())
    }

    /// Decrease a supply by exactly `size`
    pub fn remove_position(&mut self, arm: Arm, strike_index: usize, size: Decimal) -> Result<()> {
        let supply = self.supply_mut(arm, strike_index)?;
        if size > *supply {
            return Err(MarketError::InsufficientSupply {
                arm,
                strike_index,
                supply: *supply,
                requested: size,
            });
        }
        let updated = *supply - size;
        if *supply - updated != size {
            return Err(MarketError::PrecisionLoss { size });
        }
        *supply = updated;
        Ok(())
    }

    /// LMSR quantity of each of the N+1 price buckets
    pub fn quantities(&self) -> MathResult<Vec<Decimal>> {
        outcome_vector(self.kind, &self.long_supply, &self.short_supply)
    }

    pub fn cost_function(&self) -> CostFunction {
        match self.curve {
            Curve::Depth => CostFunction::Lmsr { depth: self.depth },
            Curve::LiquiditySensitive { alpha } => CostFunction::LsLmsr { alpha },
        }
    }

    /// Liquidity depth currently in effect
    pub fn effective_depth(&self) -> MathResult<Decimal> {
        self.cost_function().depth(&self.quantities()?)
    }

    /// Collateral the pool must hold for the current state
    ///
    /// Put costs are scaled by the largest strike since their collateral is
    /// the quote asset.
    pub fn collateral_cost(&self) -> MathResult<Decimal> {
        let raw = self.cost_function().evaluate(&self.quantities()?)?;
        match self.kind {
            OptionKind::Call => Ok(raw),
            OptionKind::Put => mul(raw, self.max_strike()),
        }
    }

    pub fn fee_schedule(&self) -> FeeSchedule {
        FeeSchedule::new(self.kind, self.trading_fee)
    }

    /// Long plus short supply across every strike
    pub fn total_position_supply(&self) -> MathResult<Decimal> {
        self.long_supply
            .iter()
            .chain(self.short_supply.iter())
            .try_fold(Decimal::ZERO, |acc, s| add(acc, *s))
    }

    /// Payoff of one unit of a position at `price`, in quote units
    pub fn payoff_per_unit(&self, arm: Arm, strike_index: usize, price: Decimal) -> Decimal {
        let strike = self
            .strike_prices
            .get(strike_index)
            .copied()
            .unwrap_or(Decimal::ZERO);
        match (self.kind, arm) {
            (OptionKind::Call, Arm::Long) => (price - strike).max(Decimal::ZERO),
            (OptionKind::Put, Arm::Long) => (strike - price).max(Decimal::ZERO),
            (_, Arm::Short) => price.min(strike),
        }
    }

    /// Payoff of every outstanding position at `price`
    pub fn total_payoff(&self, price: Decimal) -> MathResult<Decimal> {
        let mut total = Decimal::ZERO;
        for i in 0..self.num_strikes() {
            for arm in [Arm::Long, Arm::Short] {
                let payoff = mul(self.supply(arm, i), self.payoff_per_unit(arm, i, price))?;
                total = add(total, payoff)?;
            }
        }
        Ok(total)
    }

    /// Convert a quote-unit payoff into collateral units
    ///
    /// Call collateral is the base asset, so payoffs are divided by the
    /// price. Every call payoff is zero at a zero price.
    pub fn payoff_in_collateral(&self, payoff: Decimal, price: Decimal) -> MathResult<Decimal> {
        match self.kind {
            OptionKind::Call if price.is_zero() => Ok(Decimal::ZERO),
            OptionKind::Call => div(payoff, price),
            OptionKind::Put => Ok(payoff),
        }
    }

    /// Collateral owed to position holders once settled at `price`
    ///
    /// On the LS curve the whole `cost_at_settlement` is apportioned. With an
    /// explicit depth holders are owed their exact payoff, and whatever the
    /// subsidy left over goes back to the provider through the skim.
    pub fn settlement_reserve(
        &self,
        cost_at_settlement: Decimal,
        total_payoff: Decimal,
        price: Decimal,
    ) -> MathResult<Decimal> {
        match self.curve {
            Curve::LiquiditySensitive { .. } => Ok(cost_at_settlement),
            Curve::Depth => {
                let owed = round_up(self.payoff_in_collateral(total_payoff, price)?);
                Ok(owed.min(cost_at_settlement))
            }
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expiry_time
    }

    pub fn is_settled(&self) -> bool {
        self.settlement.is_some()
    }

    pub fn dispute_period(&self) -> Duration {
        Duration::seconds(self.dispute_period_secs)
    }

    /// End of the dispute window, once settled
    pub fn dispute_deadline(&self) -> Option<DateTime<Utc>> {
        self.settlement
            .as_ref()
            .map(|s| s.settled_at + self.dispute_period())
    }

    pub fn in_dispute_period(&self, now: DateTime<Utc>) -> bool {
        self.dispute_deadline().is_some_and(|deadline| now < deadline)
    }
}

/// Map per-strike supplies onto the N+1 price buckets
///
/// Bucket `j` covers prices between strike `j-1` and strike `j`. A call long
/// at strike `i` pays in buckets above `i`, its cover in buckets `0..=i`.
/// Puts are mirrored.
pub fn outcome_vector(kind: OptionKind, long: &[Decimal], short: &[Decimal]) -> MathResult<Vec<Decimal>> {
    let n = long.len();
    // below[j] = Σ_{i<j}, above[j] = Σ_{i>=j}
    let (below_src, above_src) = match kind {
        OptionKind::Call => (long, short),
        OptionKind::Put => (short, long),
    };

    let mut above = vec![Decimal::ZERO; n + 1];
    for i in (0..n).rev() {
        above[i] = add(above[i + 1], above_src[i])?;
    }

    let mut q = Vec::with_capacity(n + 1);
    let mut below = Decimal::ZERO;
    for j in 0..=n {
        q.push(add(below, above[j])?);
        if j < n {
            below = add(below, below_src[j])?;
        }
    }
    Ok(q)
}
