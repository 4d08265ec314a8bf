//! Market engine
//!
//! A single market holds N strictly increasing strikes and trades a long and
//! a short (cover) arm at each of them against one collateral pool. Prices
//! come from the LMSR / LS-LMSR cost function over the N+1 price buckets the
//! strikes define.
//!
//! # Lifecycle
//!
//! ```text
//!   Trading ──(now >= expiry)──▶ Expired ──settle()──▶ Settled
//!                                                        │
//!                                     dispute window ◀───┘
//!                                          │
//!                                          ▼
//!                              Finalized: redeem(), collect_fees()
//! ```
//!
//! # Operation discipline
//!
//! Every state-changing operation validates, prices against the current
//! state, builds the next state, and only then issues ledger calls. If any
//! ledger call fails the previous state is restored and the ledger calls
//! already made are reverted.
//!
//! # Components
//!
//! - [`state`]: the persisted [`MarketState`] record
//! - [`fees`]: notional [`FeeSchedule`]
//! - `trade`: `buy`, `sell` and quotes
//! - `liquidity`: `deposit`, `withdraw`, `increase_liquidity`
//! - `settlement`: `settle`, `dispute_expiry_price`, `redeem`, `collect_fees`
//! - `admin`: pause and owner parameter changes

mod admin;
pub mod fees;
mod liquidity;
mod settlement;
pub mod state;
mod trade;

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use crate::common::access::AccessContext;
use crate::common::errors::{MarketError, Result};
use crate::common::ledger::{InMemoryLedger, LedgerBatch};
use crate::common::traits::{AccessControl, BoxedAccessControl, BoxedOracle, Clock, Ledger, PriceOracle};
use crate::common::types::{AccountId, Arm, Asset, MarketEvent, OptionKind};
use crate::math::fixed::add;

pub use fees::FeeSchedule;
pub use liquidity::LiquidityReceipt;
pub use settlement::RedeemReceipt;
pub use state::{Curve, MarketState, Settlement, DEFAULT_DISPUTE_PERIOD_SECS};
pub use trade::TradeQuote;

/// Construction parameters, fixed for the life of the market except for the
/// owner-adjustable caps and expiry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketParams {
    pub strike_prices: Vec<Decimal>,
    pub kind: OptionKind,
    pub curve: Curve,
    pub trading_fee: Decimal,
    pub balance_cap: Decimal,
    pub supply_cap: Decimal,
    pub expiry_time: DateTime<Utc>,
    pub dispute_period_secs: i64,
}

impl MarketParams {
    /// Call market with an explicit depth curve, no fee and no caps
    pub fn new(strike_prices: Vec<Decimal>, expiry_time: DateTime<Utc>) -> Self {
        Self {
            strike_prices,
            kind: OptionKind::Call,
            curve: Curve::Depth,
            trading_fee: Decimal::ZERO,
            balance_cap: Decimal::ZERO,
            supply_cap: Decimal::ZERO,
            expiry_time,
            dispute_period_secs: DEFAULT_DISPUTE_PERIOD_SECS,
        }
    }

    pub fn with_kind(mut self, kind: OptionKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_curve(mut self, curve: Curve) -> Self {
        self.curve = curve;
        self
    }

    pub fn with_trading_fee(mut self, trading_fee: Decimal) -> Self {
        self.trading_fee = trading_fee;
        self
    }

    pub fn with_caps(mut self, balance_cap: Decimal, supply_cap: Decimal) -> Self {
        self.balance_cap = balance_cap;
        self.supply_cap = supply_cap;
        self
    }

    pub fn with_dispute_period(mut self, period: Duration) -> Self {
        self.dispute_period_secs = period.num_seconds();
        self
    }

    /// Check every construction invariant
    pub fn validate(&self, now: DateTime<Utc>) -> Result<()> {
        if self.strike_prices.is_empty() {
            return Err(MarketError::EmptyStrikes);
        }
        for (index, strike) in self.strike_prices.iter().enumerate() {
            if *strike <= Decimal::ZERO {
                return Err(MarketError::StrikeMustBePositive { index });
            }
            if index > 0 && *strike <= self.strike_prices[index - 1] {
                return Err(MarketError::StrikesNotStrictlyIncreasing { index });
            }
        }
        if self.trading_fee < Decimal::ZERO || self.trading_fee >= Decimal::ONE {
            return Err(MarketError::FeeOutOfRange(self.trading_fee));
        }
        if let Curve::LiquiditySensitive { alpha } = self.curve {
            if alpha <= Decimal::ZERO || alpha >= Decimal::ONE {
                return Err(MarketError::AlphaOutOfRange(alpha));
            }
        }
        validate_caps(self.balance_cap, self.supply_cap)?;
        if self.dispute_period_secs < 0 {
            return Err(MarketError::Configuration(format!(
                "dispute period must be >= 0, got {}s",
                self.dispute_period_secs
            )));
        }
        if now >= self.expiry_time {
            return Err(MarketError::AlreadyExpiredAtCreation);
        }
        Ok(())
    }

    fn into_state(self) -> MarketState {
        let n = self.strike_prices.len();
        MarketState {
            strike_prices: self.strike_prices,
            kind: self.kind,
            curve: self.curve,
            depth: Decimal::ZERO,
            long_supply: vec![Decimal::ZERO; n],
            short_supply: vec![Decimal::ZERO; n],
            trading_fee: self.trading_fee,
            balance_cap: self.balance_cap,
            supply_cap: self.supply_cap,
            expiry_time: self.expiry_time,
            dispute_period_secs: self.dispute_period_secs,
            settlement: None,
            fees_accrued: Decimal::ZERO,
            paused: false,
        }
    }
}

pub(crate) fn validate_caps(balance_cap: Decimal, supply_cap: Decimal) -> Result<()> {
    if balance_cap < Decimal::ZERO || supply_cap < Decimal::ZERO {
        return Err(MarketError::Configuration(format!(
            "caps must be >= 0, got balance cap {} and supply cap {}",
            balance_cap, supply_cap
        )));
    }
    Ok(())
}

/// LS-LMSR options market
pub struct Market<L: Ledger = InMemoryLedger> {
    state: MarketState,
    ledger: L,
    oracle: BoxedOracle,
    access: BoxedAccessControl,
    clock: Arc<dyn Clock>,
    events: Vec<MarketEvent>,
}

impl<L: Ledger> std::fmt::Debug for Market<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Market")
            .field("state", &self.state)
            .field("pool_balance", &self.ledger.pool_balance())
            .field("pending_events", &self.events.len())
            .finish()
    }
}

impl<L: Ledger> Market<L> {
    /// Create a market after validating `params`
    ///
    /// The depth of a [`Curve::Depth`] market starts at zero; trading opens
    /// with the first `deposit` or `increase_liquidity`.
    pub fn new(
        params: MarketParams,
        ledger: L,
        oracle: impl PriceOracle + 'static,
        access: impl AccessControl + 'static,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        params.validate(clock.now())?;
        info!(
            strikes = params.strike_prices.len(),
            kind = %params.kind,
            curve = ?params.curve,
            expiry = %params.expiry_time,
            "Created market"
        );
        Ok(Self {
            state: params.into_state(),
            ledger,
            oracle: Box::new(oracle),
            access: Box::new(access),
            clock,
            events: Vec::new(),
        })
    }

    /// Resolve the caller's permissions for one operation
    pub fn context(&self, caller: impl Into<AccountId>) -> AccessContext {
        AccessContext::new(caller.into(), self.access.as_ref())
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    // ------------------------------------------------------------------
    // Read-only accessors
    // ------------------------------------------------------------------

    pub fn state(&self) -> &MarketState {
        &self.state
    }

    pub fn strike_prices(&self) -> &[Decimal] {
        &self.state.strike_prices
    }

    pub fn kind(&self) -> OptionKind {
        self.state.kind
    }

    pub fn is_put(&self) -> bool {
        self.state.kind.is_put()
    }

    pub fn curve(&self) -> Curve {
        self.state.curve
    }

    pub fn long_supply(&self, strike_index: usize) -> Decimal {
        self.state.supply(Arm::Long, strike_index)
    }

    pub fn short_supply(&self, strike_index: usize) -> Decimal {
        self.state.supply(Arm::Short, strike_index)
    }

    /// Liquidity depth in effect, derived from quantities on an LS curve
    pub fn depth(&self) -> Result<Decimal> {
        Ok(self.state.effective_depth()?)
    }

    pub fn trading_fee(&self) -> Decimal {
        self.state.trading_fee
    }

    pub fn balance_cap(&self) -> Decimal {
        self.state.balance_cap
    }

    pub fn supply_cap(&self) -> Decimal {
        self.state.supply_cap
    }

    pub fn expiry_time(&self) -> DateTime<Utc> {
        self.state.expiry_time
    }

    pub fn dispute_period(&self) -> Duration {
        self.state.dispute_period()
    }

    pub fn is_settled(&self) -> bool {
        self.state.is_settled()
    }

    pub fn settlement_price(&self) -> Option<Decimal> {
        self.state.settlement.as_ref().map(|s| s.price)
    }

    pub fn cost_at_settlement(&self) -> Option<Decimal> {
        self.state.settlement.as_ref().map(|s| s.cost_at_settlement)
    }

    /// Collateral held back for position holders at settlement
    pub fn settlement_reserve(&self) -> Option<Decimal> {
        self.state.settlement.as_ref().map(|s| s.reserved)
    }

    pub fn fees_accrued(&self) -> Decimal {
        self.state.fees_accrued
    }

    pub fn is_paused(&self) -> bool {
        self.state.paused
    }

    pub fn is_expired(&self) -> bool {
        self.state.is_expired(self.now())
    }

    /// Collateral the pool must hold for the current quantities and depth
    pub fn current_cost(&self) -> Result<Decimal> {
        Ok(self.state.collateral_cost()?)
    }

    /// Marginal price of each of the N+1 price buckets
    pub fn prices(&self) -> Result<Vec<Decimal>> {
        let q = self.state.quantities()?;
        Ok(self.state.cost_function().prices(&q)?)
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    /// Host-side access to the ledger, e.g. to fund participants
    pub fn ledger_mut(&mut self) -> &mut L {
        &mut self.ledger
    }

    pub fn events(&self) -> &[MarketEvent] {
        &self.events
    }

    /// Hand out and clear the recorded events
    pub fn drain_events(&mut self) -> Vec<MarketEvent> {
        std::mem::take(&mut self.events)
    }

    // ------------------------------------------------------------------
    // Guards shared by the operation modules
    // ------------------------------------------------------------------

    pub(crate) fn ensure_not_paused(&self, ctx: &AccessContext) -> Result<()> {
        if self.state.paused && !ctx.is_owner {
            return Err(MarketError::Paused);
        }
        Ok(())
    }

    pub(crate) fn ensure_owner(&self, ctx: &AccessContext) -> Result<()> {
        if !ctx.is_owner {
            warn!(caller = %ctx.caller, "Rejected owner-only call");
            return Err(MarketError::Unauthorized(ctx.caller.clone()));
        }
        Ok(())
    }

    pub(crate) fn ensure_index(&self, strike_index: usize) -> Result<()> {
        let len = self.state.num_strikes();
        if strike_index >= len {
            return Err(MarketError::IndexOutOfRange {
                index: strike_index,
                len,
            });
        }
        Ok(())
    }

    pub(crate) fn ensure_trading_open(&self) -> Result<()> {
        if self.is_expired() {
            return Err(MarketError::AlreadyExpired);
        }
        Ok(())
    }

    pub(crate) fn ensure_balance(&self, asset: Asset, holder: &AccountId, required: Decimal) -> Result<()> {
        if self.ledger.has_balance(asset, holder, required) {
            return Ok(());
        }
        Err(MarketError::InsufficientBalance {
            asset,
            holder: holder.clone(),
            required,
            available: self.ledger.balance_of(asset, holder),
        })
    }

    /// Check both caps against the state after an inflow
    ///
    /// `supply_after` is the total position supply once the operation
    /// completes. Reaching a cap exactly is allowed.
    pub(crate) fn ensure_caps(&self, collateral_in: Decimal, supply_after: Decimal) -> Result<()> {
        let cap = self.state.balance_cap;
        if !cap.is_zero() {
            let balance = add(self.ledger.pool_balance(), collateral_in)?;
            if balance > cap {
                return Err(MarketError::BalanceCapExceeded { balance, cap });
            }
        }
        let cap = self.state.supply_cap;
        if !cap.is_zero() && supply_after > cap {
            return Err(MarketError::SupplyCapExceeded {
                supply: supply_after,
                cap,
            });
        }
        Ok(())
    }

    /// Install `next` and apply the ledger calls, or change nothing
    pub(crate) fn commit(&mut self, next: MarketState, batch: LedgerBatch, event: MarketEvent) -> Result<()> {
        let previous = std::mem::replace(&mut self.state, next);
        if let Err(e) = batch.commit(&mut self.ledger) {
            warn!(error = %e, "Ledger call failed, state restored");
            self.state = previous;
            return Err(e.into());
        }
        self.events.push(event);
        Ok(())
    }
}
