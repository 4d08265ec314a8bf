//! Settlement, dispute, redemption and fee collection

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::state::{Curve, Settlement};
use super::Market;
use crate::common::access::AccessContext;
use crate::common::errors::{MarketError, OracleError, Result};
use crate::common::ledger::LedgerBatch;
use crate::common::traits::Ledger;
use crate::common::types::{Arm, Asset, MarketEvent};
use crate::math::fixed::{add, div, mul, sub};
use crate::math::{round_down, round_up};

/// Outcome of a redemption
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RedeemReceipt {
    pub arm: Arm,
    pub strike_index: usize,
    /// Position units burned
    pub burned: Decimal,
    /// Collateral paid out
    pub payout: Decimal,
}

impl<L: Ledger> Market<L> {
    /// Capture the settlement price once the market has expired
    ///
    /// Reads the oracle exactly once. An oracle failure leaves the market
    /// unsettled so the call can be retried.
    pub fn settle(&mut self, ctx: &AccessContext) -> Result<Decimal> {
        self.ensure_not_paused(ctx)?;
        if !self.is_expired() {
            return Err(MarketError::NotYetExpired);
        }
        if self.state.is_settled() {
            return Err(MarketError::AlreadySettled);
        }

        let price = self.read_oracle()?;
        let cost_at_settlement = round_down(self.state.collateral_cost()?);
        let total_payoff = self.state.total_payoff(price)?;
        let reserved = self
            .state
            .settlement_reserve(cost_at_settlement, total_payoff, price)?;
        let now = self.now();

        let mut next = self.state.clone();
        next.settlement = Some(Settlement {
            price,
            settled_at: now,
            cost_at_settlement,
            total_payoff,
            reserved,
            disputed: false,
            redeemed: Decimal::ZERO,
        });
        let event = MarketEvent::Settled {
            price,
            cost_at_settlement,
            total_payoff,
            timestamp: now,
        };
        self.commit(next, LedgerBatch::new(), event)?;

        info!(%price, %cost_at_settlement, %total_payoff, %reserved, "Settled market");
        Ok(price)
    }

    /// Correct the settlement price once, inside the dispute window
    ///
    /// Owner only. The total payoff and the reserve are recomputed at the new
    /// price; `cost_at_settlement` is kept.
    pub fn dispute_expiry_price(&mut self, ctx: &AccessContext, price: Decimal) -> Result<()> {
        self.ensure_owner(ctx)?;
        let settlement = self
            .state
            .settlement
            .as_ref()
            .ok_or(MarketError::NotYetSettled)?;
        let now = self.now();
        if !self.state.in_dispute_period(now) {
            return Err(MarketError::DisputeWindowClosed);
        }
        if settlement.disputed {
            return Err(MarketError::AlreadyDisputed);
        }
        if price < Decimal::ZERO {
            return Err(OracleError::InvalidPrice(price).into());
        }

        let previous_price = settlement.price;
        let total_payoff = self.state.total_payoff(price)?;
        let reserved = self
            .state
            .settlement_reserve(settlement.cost_at_settlement, total_payoff, price)?;
        let mut next = self.state.clone();
        if let Some(s) = next.settlement.as_mut() {
            s.price = price;
            s.total_payoff = total_payoff;
            s.reserved = reserved;
            s.disputed = true;
        }
        let event = MarketEvent::Disputed {
            previous_price,
            price,
            timestamp: now,
        };
        self.commit(next, LedgerBatch::new(), event)?;

        info!(%previous_price, %price, "Corrected settlement price");
        Ok(())
    }

    /// Burn the caller's whole position and pay it out
    ///
    /// With an explicit depth the position pays its payoff in collateral
    /// units. On the LS curve it pays
    /// `cost_at_settlement * position_payoff / total_payoff`. Both are rounded
    /// down and never exceed what is left of the reserve.
    pub fn redeem(&mut self, ctx: &AccessContext, arm: Arm, strike_index: usize) -> Result<RedeemReceipt> {
        self.ensure_not_paused(ctx)?;
        self.ensure_index(strike_index)?;
        let now = self.now();
        if !self.state.is_expired(now) {
            return Err(MarketError::NotYetExpired);
        }
        let settlement = self
            .state
            .settlement
            .as_ref()
            .ok_or(MarketError::NotYetSettled)?;
        if self.state.in_dispute_period(now) {
            return Err(MarketError::InDisputePeriod);
        }
        let asset = Asset::position(arm, strike_index);
        let balance = self.ledger.balance_of(asset, &ctx.caller);
        if balance <= Decimal::ZERO {
            return Err(MarketError::BalanceMustBePositive);
        }

        let unit_payoff = self.state.payoff_per_unit(arm, strike_index, settlement.price);
        let position_payoff = mul(balance, unit_payoff)?;
        let remaining = sub(settlement.reserved, settlement.redeemed)?;
        let payout = match self.state.curve {
            Curve::Depth => self
                .state
                .payoff_in_collateral(position_payoff, settlement.price)?,
            Curve::LiquiditySensitive { .. } if settlement.total_payoff.is_zero() => Decimal::ZERO,
            Curve::LiquiditySensitive { .. } => {
                let share = div(position_payoff, settlement.total_payoff)?;
                mul(settlement.cost_at_settlement, share)?
            }
        };
        let payout = round_down(payout).min(remaining).max(Decimal::ZERO);

        let mut next = self.state.clone();
        next.remove_position(arm, strike_index, balance)?;
        if let Some(s) = next.settlement.as_mut() {
            s.redeemed = add(s.redeemed, payout)?;
        }
        let batch = LedgerBatch::new()
            .burn(asset, &ctx.caller, balance)
            .transfer_out(&ctx.caller, payout);
        let event = MarketEvent::Redeemed {
            account: ctx.caller.clone(),
            arm,
            strike_index,
            burned: balance,
            payout,
            timestamp: now,
        };
        self.commit(next, batch, event)?;

        info!(caller = %ctx.caller, %arm, strike_index, burned = %balance, %payout, "Redeemed position");
        Ok(RedeemReceipt {
            arm,
            strike_index,
            burned: balance,
            payout,
        })
    }

    /// Collateral held above what the pool still owes
    ///
    /// Before settlement the pool owes the current cost; afterwards it owes
    /// the unredeemed part of the settlement reserve.
    pub fn calc_skim_amount(&self) -> Result<Decimal> {
        let owed = match &self.state.settlement {
            None => round_up(self.state.collateral_cost()?),
            Some(s) => sub(s.reserved, s.redeemed)?,
        };
        let excess = round_down(sub(self.ledger.pool_balance(), owed)?);
        Ok(excess.max(Decimal::ZERO))
    }

    /// Pay the skim amount to the caller
    ///
    /// Owner only. Resets `fees_accrued`; a second call pays 0.
    pub fn collect_fees(&mut self, ctx: &AccessContext) -> Result<Decimal> {
        self.ensure_owner(ctx)?;
        let amount = self.calc_skim_amount()?;

        let mut next = self.state.clone();
        next.fees_accrued = Decimal::ZERO;
        let batch = LedgerBatch::new().transfer_out(&ctx.caller, amount);
        let event = MarketEvent::FeesCollected {
            recipient: ctx.caller.clone(),
            amount,
            timestamp: self.now(),
        };
        self.commit(next, batch, event)?;

        info!(recipient = %ctx.caller, %amount, "Collected fees");
        Ok(amount)
    }

    fn read_oracle(&self) -> Result<Decimal> {
        let price = self.oracle.get_price()?;
        if price < Decimal::ZERO {
            return Err(OracleError::InvalidPrice(price).into());
        }
        Ok(price)
    }
}
