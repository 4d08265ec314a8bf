//! Liquidity depth changes
//!
//! One liquidity share is one unit of depth `b`, so the share supply always
//! equals the depth. Shares are priced by the same cost-function delta as
//! trades, evaluated against the live quantities:
//!
//! - deposit pays `C(q, b + s) - C(q, b)`
//! - withdraw receives `C(q, b) - C(q, b - s)`
//!
//! The cost is a function of `(q, b)` alone, so deposit, trade, sell back and
//! withdraw by one account nets exactly the fees plus rounding, never a gain.
//!
//! Depth is provided by the owner only. After settlement the owner gets back
//! whatever the holders are not owed through `collect_fees`, so shares need
//! no redemption of their own.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::state::Curve;
use super::Market;
use crate::common::access::AccessContext;
use crate::common::errors::{MarketError, Result};
use crate::common::ledger::LedgerBatch;
use crate::common::traits::Ledger;
use crate::common::types::{Arm, Asset, MarketEvent};
use crate::math::fixed::{add, sub};
use crate::math::{round_down, round_up};

/// Outcome of a depth change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiquidityReceipt {
    /// Shares minted or burned
    pub shares: Decimal,
    /// Collateral paid in or out, including any trading fee
    pub amount: Decimal,
    /// Fee part of `amount`
    pub fee: Decimal,
    /// Depth after the change
    pub depth: Decimal,
}

impl<L: Ledger> Market<L> {
    /// Add `shares` units of depth, paying at most `max_cost`. Owner only.
    pub fn deposit(&mut self, ctx: &AccessContext, shares: Decimal, max_cost: Decimal) -> Result<LiquidityReceipt> {
        self.ensure_owner(ctx)?;
        self.ensure_adjustable()?;
        ensure_positive_shares(shares)?;
        self.ensure_trading_open()?;

        let mut next = self.state.clone();
        next.depth = add(self.state.depth, shares)?;
        if next.depth - self.state.depth != shares {
            return Err(MarketError::PrecisionLoss { size: shares });
        }
        let amount = round_up(sub(next.collateral_cost()?, self.state.collateral_cost()?)?);
        if amount > max_cost {
            return Err(MarketError::SlippageExceeded {
                amount,
                limit: max_cost,
            });
        }
        self.ensure_caps(amount, next.total_position_supply()?)?;
        self.ensure_balance(Asset::Collateral, &ctx.caller, amount)?;

        let depth = next.depth;
        let batch = LedgerBatch::new()
            .transfer_in(&ctx.caller, amount)
            .mint(Asset::LiquidityShare, &ctx.caller, shares);
        let event = self.liquidity_event(ctx, shares, amount, depth);
        self.commit(next, batch, event)?;

        info!(caller = %ctx.caller, %shares, %amount, %depth, "Deposited liquidity");
        Ok(LiquidityReceipt {
            shares,
            amount,
            fee: Decimal::ZERO,
            depth,
        })
    }

    /// Remove `shares` units of depth, receiving at least `min_out`. Owner only.
    ///
    /// Depth may shrink while positions are open but never to zero.
    pub fn withdraw(&mut self, ctx: &AccessContext, shares: Decimal, min_out: Decimal) -> Result<LiquidityReceipt> {
        self.ensure_owner(ctx)?;
        self.ensure_adjustable()?;
        ensure_positive_shares(shares)?;
        self.ensure_trading_open()?;
        self.ensure_balance(Asset::LiquidityShare, &ctx.caller, shares)?;

        let current = self.state.depth;
        let insufficient = MarketError::InsufficientLiquidity {
            depth: current,
            requested: shares,
        };
        if shares > current {
            return Err(insufficient);
        }
        let mut next = self.state.clone();
        next.depth = current - shares;
        if next.depth.is_zero() && !self.state.total_position_supply()?.is_zero() {
            return Err(insufficient);
        }

        let amount = round_down(sub(self.state.collateral_cost()?, next.collateral_cost()?)?);
        if amount <= Decimal::ZERO {
            return Err(MarketError::AmountOutMustBePositive(amount));
        }
        if amount < min_out {
            return Err(MarketError::SlippageExceeded {
                amount,
                limit: min_out,
            });
        }

        let depth = next.depth;
        let batch = LedgerBatch::new()
            .burn(Asset::LiquidityShare, &ctx.caller, shares)
            .transfer_out(&ctx.caller, amount);
        let event = self.liquidity_event(ctx, -shares, -amount, depth);
        self.commit(next, batch, event)?;

        info!(caller = %ctx.caller, %shares, %amount, %depth, "Withdrew liquidity");
        Ok(LiquidityReceipt {
            shares,
            amount,
            fee: Decimal::ZERO,
            depth,
        })
    }

    /// Raise the depth to `new_depth` and buy positions in one step
    ///
    /// Owner only. `long_sizes` and `short_sizes` hold one size per strike
    /// (zero for none). The cost is `C(q', new_depth) - C(q, depth)` plus the
    /// notional fee on every size. Shares for the added depth and all the
    /// positions are minted to the caller.
    pub fn increase_liquidity(
        &mut self,
        ctx: &AccessContext,
        new_depth: Decimal,
        long_sizes: &[Decimal],
        short_sizes: &[Decimal],
        max_cost: Decimal,
    ) -> Result<LiquidityReceipt> {
        self.ensure_owner(ctx)?;
        self.ensure_adjustable()?;
        let n = self.state.num_strikes();
        for sizes in [long_sizes, short_sizes] {
            if sizes.len() != n {
                return Err(MarketError::LengthMismatch {
                    expected: n,
                    actual: sizes.len(),
                });
            }
        }
        self.ensure_trading_open()?;
        let current = self.state.depth;
        if new_depth <= current {
            return Err(MarketError::LiquidityMustIncrease {
                current,
                requested: new_depth,
            });
        }

        let mut next = self.state.clone();
        next.depth = new_depth;
        let mut batch = LedgerBatch::new();
        for (arm, sizes) in [(Arm::Long, long_sizes), (Arm::Short, short_sizes)] {
            for (i, size) in sizes.iter().copied().enumerate() {
                if size.is_zero() {
                    continue;
                }
                if size < Decimal::ZERO {
                    return Err(MarketError::SizeMustBePositive(size));
                }
                next.add_position(arm, i, size)?;
                batch = batch.mint(Asset::position(arm, i), &ctx.caller, size);
            }
        }

        let cost = round_up(sub(next.collateral_cost()?, self.state.collateral_cost()?)?);
        let fees = self.state.fee_schedule();
        let fee = add(
            fees.batch_fee(&self.state.strike_prices, long_sizes)?,
            fees.batch_fee(&self.state.strike_prices, short_sizes)?,
        )?;
        let amount = add(cost, fee)?;
        if amount > max_cost {
            return Err(MarketError::SlippageExceeded {
                amount,
                limit: max_cost,
            });
        }
        self.ensure_caps(amount, next.total_position_supply()?)?;
        self.ensure_balance(Asset::Collateral, &ctx.caller, amount)?;

        next.fees_accrued = add(next.fees_accrued, fee)?;
        let shares = new_depth - current;
        let batch = LedgerBatch::new()
            .transfer_in(&ctx.caller, amount)
            .mint(Asset::LiquidityShare, &ctx.caller, shares)
            .extend(batch);
        let event = self.liquidity_event(ctx, shares, amount, new_depth);
        self.commit(next, batch, event)?;

        info!(caller = %ctx.caller, %new_depth, %amount, %fee, "Increased liquidity depth");
        Ok(LiquidityReceipt {
            shares,
            amount,
            fee,
            depth: new_depth,
        })
    }

    fn ensure_adjustable(&self) -> Result<()> {
        match self.state.curve {
            Curve::Depth => Ok(()),
            Curve::LiquiditySensitive { .. } => Err(MarketError::LiquidityNotAdjustable),
        }
    }

    fn liquidity_event(&self, ctx: &AccessContext, shares: Decimal, amount: Decimal, depth: Decimal) -> MarketEvent {
        MarketEvent::LiquidityChanged {
            account: ctx.caller.clone(),
            shares,
            amount,
            depth,
            timestamp: self.now(),
        }
    }
}

fn ensure_positive_shares(shares: Decimal) -> Result<()> {
    if shares <= Decimal::ZERO {
        return Err(MarketError::SharesMustBePositive(shares));
    }
    Ok(())
}
