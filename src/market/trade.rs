//! Buying and selling positions against the pool

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::state::{Curve, MarketState};
use super::Market;
use crate::common::access::AccessContext;
use crate::common::errors::{MarketError, Result};
use crate::common::ledger::LedgerBatch;
use crate::common::traits::Ledger;
use crate::common::types::{Arm, Asset, MarketEvent, Side};
use crate::math::fixed::{add, sub};
use crate::math::{round_down, round_up};

/// Priced trade
///
/// Returned by the quote methods and, once filled, by `buy` and `sell`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeQuote {
    pub side: Side,
    pub arm: Arm,
    pub strike_index: usize,
    pub size: Decimal,
    /// Cost-function delta, rounded against the trader
    pub cost: Decimal,
    pub fee: Decimal,
    /// Collateral paid in (buy: `cost + fee`) or out (sell: `cost - fee`)
    pub total: Decimal,
}

impl<L: Ledger> Market<L> {
    /// Price a buy without executing it
    pub fn quote_buy(&self, arm: Arm, strike_index: usize, size: Decimal) -> Result<TradeQuote> {
        let (quote, _) = self.price_trade(Side::Buy, arm, strike_index, size)?;
        debug!(?quote, "Quoted buy");
        Ok(quote)
    }

    /// Price a sell without executing it
    pub fn quote_sell(&self, arm: Arm, strike_index: usize, size: Decimal) -> Result<TradeQuote> {
        let (quote, _) = self.price_trade(Side::Sell, arm, strike_index, size)?;
        debug!(?quote, "Quoted sell");
        Ok(quote)
    }

    /// Buy `size` of a position, paying at most `max_cost` collateral
    pub fn buy(
        &mut self,
        ctx: &AccessContext,
        arm: Arm,
        strike_index: usize,
        size: Decimal,
        max_cost: Decimal,
    ) -> Result<TradeQuote> {
        self.ensure_not_paused(ctx)?;
        self.ensure_index(strike_index)?;
        ensure_positive_size(size)?;
        self.ensure_trading_open()?;
        if self.state.curve == Curve::Depth && self.state.depth.is_zero() {
            return Err(MarketError::NotYetLiquid);
        }

        let (quote, mut next) = self.price_trade(Side::Buy, arm, strike_index, size)?;
        if quote.total > max_cost {
            return Err(MarketError::SlippageExceeded {
                amount: quote.total,
                limit: max_cost,
            });
        }
        self.ensure_caps(quote.total, next.total_position_supply()?)?;
        self.ensure_balance(Asset::Collateral, &ctx.caller, quote.total)?;

        next.fees_accrued = add(next.fees_accrued, quote.fee)?;
        let batch = LedgerBatch::new()
            .transfer_in(&ctx.caller, quote.total)
            .mint(Asset::position(arm, strike_index), &ctx.caller, size);
        let event = self.trade_event(ctx, &quote);
        self.commit(next, batch, event)?;

        info!(
            caller = %ctx.caller,
            %arm,
            strike_index,
            %size,
            paid = %quote.total,
            "Bought position"
        );
        Ok(quote)
    }

    /// Sell `size` of a position back to the pool, receiving at least `min_out`
    pub fn sell(
        &mut self,
        ctx: &AccessContext,
        arm: Arm,
        strike_index: usize,
        size: Decimal,
        min_out: Decimal,
    ) -> Result<TradeQuote> {
        self.ensure_not_paused(ctx)?;
        self.ensure_index(strike_index)?;
        ensure_positive_size(size)?;
        self.ensure_trading_open()?;
        let asset = Asset::position(arm, strike_index);
        self.ensure_balance(asset, &ctx.caller, size)?;

        let (quote, mut next) = self.price_trade(Side::Sell, arm, strike_index, size)?;
        if quote.total <= Decimal::ZERO {
            return Err(MarketError::AmountOutMustBePositive(quote.total));
        }
        if quote.total < min_out {
            return Err(MarketError::SlippageExceeded {
                amount: quote.total,
                limit: min_out,
            });
        }

        next.fees_accrued = add(next.fees_accrued, quote.fee)?;
        let batch = LedgerBatch::new()
            .burn(asset, &ctx.caller, size)
            .transfer_out(&ctx.caller, quote.total);
        let event = self.trade_event(ctx, &quote);
        self.commit(next, batch, event)?;

        info!(
            caller = %ctx.caller,
            %arm,
            strike_index,
            %size,
            received = %quote.total,
            "Sold position"
        );
        Ok(quote)
    }

    /// Price a trade and build the state it leads to
    fn price_trade(
        &self,
        side: Side,
        arm: Arm,
        strike_index: usize,
        size: Decimal,
    ) -> Result<(TradeQuote, MarketState)> {
        self.ensure_index(strike_index)?;
        ensure_positive_size(size)?;

        let mut next = self.state.clone();
        match side {
            Side::Buy => next.add_position(arm, strike_index, size)?,
            Side::Sell => next.remove_position(arm, strike_index, size)?,
        }

        let before = self.state.collateral_cost()?;
        let after = next.collateral_cost()?;
        let strike = self.state.strike_prices[strike_index];
        let fee = self.state.fee_schedule().trade_fee(strike, size)?;

        let (cost, total) = match side {
            Side::Buy => {
                let cost = round_up(sub(after, before)?);
                (cost, add(cost, fee)?)
            }
            Side::Sell => {
                let cost = round_down(sub(before, after)?);
                (cost, sub(cost, fee)?)
            }
        };

        let quote = TradeQuote {
            side,
            arm,
            strike_index,
            size,
            cost,
            fee,
            total,
        };
        Ok((quote, next))
    }

    fn trade_event(&self, ctx: &AccessContext, quote: &TradeQuote) -> MarketEvent {
        MarketEvent::Trade {
            account: ctx.caller.clone(),
            side: quote.side,
            arm: quote.arm,
            strike_index: quote.strike_index,
            size: quote.size,
            cost: quote.cost,
            fee: quote.fee,
            amount: quote.total,
            timestamp: self.now(),
        }
    }
}

pub(crate) fn ensure_positive_size(size: Decimal) -> Result<()> {
    if size <= Decimal::ZERO {
        return Err(MarketError::SizeMustBePositive(size));
    }
    Ok(())
}
