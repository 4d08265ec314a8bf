//! Common test utilities and fixtures

#![allow(dead_code)]

use chrono::{DateTime, Duration, Utc};
use mockall::mock;
use once_cell::sync::Lazy;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;

use lslmsr_market::{
    AccessContext, AccountId, Asset, Curve, InMemoryLedger, Ledger, LedgerError, ManualClock,
    ManualOracle, Market, MarketParams, OptionKind, OracleError, PriceOracle, SingleOwner,
};

pub const OWNER: &str = "owner";
pub const ALICE: &str = "alice";
pub const BOB: &str = "bob";
pub const CAROL: &str = "carol";

/// Collateral credited to every participant
pub const FUNDS: Decimal = dec!(1000000);

/// Market creation time
pub static START: Lazy<DateTime<Utc>> =
    Lazy::new(|| DateTime::from_timestamp(1_704_067_200, 0).unwrap());

pub fn expiry() -> DateTime<Utc> {
    *START + Duration::days(7)
}

pub fn strikes() -> Vec<Decimal> {
    vec![dec!(300), dec!(400), dec!(500), dec!(600)]
}

mock! {
    pub Oracle {}

    impl PriceOracle for Oracle {
        fn get_price(&self) -> Result<Decimal, OracleError>;
    }
}

/// A market with a controllable clock and oracle
pub struct Fixture<L: Ledger = InMemoryLedger> {
    pub market: Market<L>,
    pub clock: ManualClock,
    pub oracle: ManualOracle,
}

impl Fixture<InMemoryLedger> {
    pub fn new(params: MarketParams) -> Self {
        let mut ledger = InMemoryLedger::new();
        for who in [OWNER, ALICE, BOB, CAROL] {
            ledger.fund(&AccountId::from(who), FUNDS);
        }
        Self::with_ledger(params, ledger)
    }

    pub fn collateral(&self, who: &str) -> Decimal {
        self.market
            .ledger()
            .balance_of(Asset::Collateral, &AccountId::from(who))
    }

    pub fn balance(&self, asset: Asset, who: &str) -> Decimal {
        self.market.ledger().balance_of(asset, &AccountId::from(who))
    }
}

impl<L: Ledger> Fixture<L> {
    pub fn with_ledger(params: MarketParams, ledger: L) -> Self {
        let clock = ManualClock::new(*START);
        let oracle = ManualOracle::new();
        let market = Market::new(
            params,
            ledger,
            oracle.clone(),
            SingleOwner::new(OWNER),
            Arc::new(clock.clone()),
        )
        .expect("valid market parameters");
        Self {
            market,
            clock,
            oracle,
        }
    }

    pub fn ctx(&self, who: &str) -> AccessContext {
        self.market.context(who)
    }

    pub fn owner(&self) -> AccessContext {
        self.ctx(OWNER)
    }

    pub fn pool(&self) -> Decimal {
        self.market.ledger().pool_balance()
    }

    /// Move the clock to the expiry time
    pub fn expire(&self) {
        self.clock.set(expiry());
    }

    /// Expire and settle at `price`
    pub fn settle_at(&mut self, price: Decimal) {
        self.oracle.set_price(price);
        self.expire();
        let ctx = self.ctx(ALICE);
        self.market.settle(&ctx).expect("settle");
    }

    /// Move past the dispute window
    pub fn finish_dispute_period(&self) {
        self.clock.advance(self.market.dispute_period() + Duration::seconds(1));
    }
}

/// Call or put market on the default strikes with an explicit depth curve
pub fn depth_params(kind: OptionKind, fee: Decimal) -> MarketParams {
    MarketParams::new(strikes(), expiry())
        .with_kind(kind)
        .with_trading_fee(fee)
}

/// Market whose owner has already deposited `depth` liquidity shares
pub fn depth_market(kind: OptionKind, fee: Decimal, depth: Decimal) -> Fixture {
    let mut fx = Fixture::new(depth_params(kind, fee));
    let ctx = fx.owner();
    fx.market
        .deposit(&ctx, depth, Decimal::MAX)
        .expect("initial deposit");
    fx.market.drain_events();
    fx
}

/// LS-LMSR market on the default strikes
pub fn ls_market(kind: OptionKind, fee: Decimal, alpha: Decimal) -> Fixture {
    Fixture::new(
        depth_params(kind, fee).with_curve(Curve::LiquiditySensitive { alpha }),
    )
}

pub fn assert_close(actual: Decimal, expected: Decimal, tolerance: Decimal) {
    let diff = (actual - expected).abs();
    assert!(
        diff <= tolerance,
        "expected {expected}, got {actual} (diff {diff}, tolerance {tolerance})"
    );
}

/// Ledger that can be told to reject mints
pub struct FlakyLedger {
    pub inner: InMemoryLedger,
    pub fail_mints: bool,
}

impl FlakyLedger {
    pub fn funded() -> Self {
        let mut inner = InMemoryLedger::new();
        for who in [OWNER, ALICE, BOB, CAROL] {
            inner.fund(&AccountId::from(who), FUNDS);
        }
        Self {
            inner,
            fail_mints: false,
        }
    }
}

impl Ledger for FlakyLedger {
    fn balance_of(&self, asset: Asset, holder: &AccountId) -> Decimal {
        self.inner.balance_of(asset, holder)
    }

    fn total_supply(&self, asset: Asset) -> Decimal {
        self.inner.total_supply(asset)
    }

    fn pool_balance(&self) -> Decimal {
        self.inner.pool_balance()
    }

    fn mint(&mut self, asset: Asset, holder: &AccountId, amount: Decimal) -> Result<(), LedgerError> {
        if self.fail_mints {
            return Err(LedgerError::Backend("mint rejected".to_string()));
        }
        self.inner.mint(asset, holder, amount)
    }

    fn burn(&mut self, asset: Asset, holder: &AccountId, amount: Decimal) -> Result<(), LedgerError> {
        self.inner.burn(asset, holder, amount)
    }

    fn transfer_in(&mut self, from: &AccountId, amount: Decimal) -> Result<(), LedgerError> {
        self.inner.transfer_in(from, amount)
    }

    fn transfer_out(&mut self, to: &AccountId, amount: Decimal) -> Result<(), LedgerError> {
        self.inner.transfer_out(to, amount)
    }
}
