//! Owner-only controls

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::info;

use super::{validate_caps, Market};
use crate::common::access::AccessContext;
use crate::common::errors::{MarketError, Result};
use crate::common::ledger::LedgerBatch;
use crate::common::traits::{Ledger, PriceOracle};
use crate::common::types::MarketEvent;

impl<L: Ledger> Market<L> {
    /// Stop non-owners from calling state-changing operations
    pub fn pause(&mut self, ctx: &AccessContext) -> Result<()> {
        self.set_paused(ctx, true)
    }

    pub fn unpause(&mut self, ctx: &AccessContext) -> Result<()> {
        self.set_paused(ctx, false)
    }

    fn set_paused(&mut self, ctx: &AccessContext, paused: bool) -> Result<()> {
        self.ensure_owner(ctx)?;
        let mut next = self.state.clone();
        next.paused = paused;
        let event = MarketEvent::PauseChanged {
            paused,
            timestamp: self.now(),
        };
        self.commit(next, LedgerBatch::new(), event)?;
        info!(paused, "Pause state changed");
        Ok(())
    }

    /// Replace both caps; 0 means unlimited
    ///
    /// Lowering a cap below the current value only blocks further inflows.
    pub fn set_caps(&mut self, ctx: &AccessContext, balance_cap: Decimal, supply_cap: Decimal) -> Result<()> {
        self.ensure_owner(ctx)?;
        validate_caps(balance_cap, supply_cap)?;
        let mut next = self.state.clone();
        next.balance_cap = balance_cap;
        next.supply_cap = supply_cap;
        let event = self.parameters_event(next.balance_cap, next.supply_cap, next.expiry_time);
        self.commit(next, LedgerBatch::new(), event)?;
        info!(%balance_cap, %supply_cap, "Caps updated");
        Ok(())
    }

    /// Move the expiry time; only possible before settlement
    pub fn set_expiry_time(&mut self, ctx: &AccessContext, expiry_time: DateTime<Utc>) -> Result<()> {
        self.ensure_owner(ctx)?;
        if self.state.is_settled() {
            return Err(MarketError::AlreadySettled);
        }
        let mut next = self.state.clone();
        next.expiry_time = expiry_time;
        let event = self.parameters_event(next.balance_cap, next.supply_cap, expiry_time);
        self.commit(next, LedgerBatch::new(), event)?;
        info!(%expiry_time, "Expiry time updated");
        Ok(())
    }

    /// Swap the settlement price source
    pub fn set_oracle(&mut self, ctx: &AccessContext, oracle: impl PriceOracle + 'static) -> Result<()> {
        self.ensure_owner(ctx)?;
        if self.state.is_settled() {
            return Err(MarketError::AlreadySettled);
        }
        self.oracle = Box::new(oracle);
        info!("Oracle replaced");
        Ok(())
    }

    fn parameters_event(&self, balance_cap: Decimal, supply_cap: Decimal, expiry_time: DateTime<Utc>) -> MarketEvent {
        MarketEvent::ParametersChanged {
            balance_cap,
            supply_cap,
            expiry_time,
            timestamp: self.now(),
        }
    }
}
