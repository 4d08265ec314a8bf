//! LS-LMSR Options Market Library
//!
//! A cost-function market maker for multi-strike options. Liquidity
//! providers fund a single collateral pool; traders buy and sell long and
//! cover positions at each strike against it, priced by the LMSR or the
//! liquidity-sensitive LS-LMSR cost function. After expiry the market takes
//! one oracle price, allows a single owner correction, and pays position
//! holders out of the pool.
//!
//! All arithmetic is done in `rust_decimal::Decimal`.

pub mod common;
pub mod config;
pub mod market;
pub mod math;

// Re-export commonly used types
pub use common::access::{AccessContext, SingleOwner};
pub use common::clock::{ManualClock, SystemClock};
pub use common::errors::{LedgerError, MarketError, MathError, OracleError, Result};
pub use common::ledger::{InMemoryLedger, LedgerBatch};
pub use common::oracle::ManualOracle;
pub use common::traits::{AccessControl, Clock, Ledger, PriceOracle};
pub use common::types::{AccountId, Arm, Asset, MarketEvent, OptionKind, Side};
pub use config::types::AppConfig;
pub use market::{
    Curve, FeeSchedule, LiquidityReceipt, Market, MarketParams, MarketState, RedeemReceipt,
    Settlement, TradeQuote,
};
pub use math::CostFunction;
