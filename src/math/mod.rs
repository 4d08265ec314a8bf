//! Pricing math
//!
//! - [`fixed`]: checked `exp`/`ln` on `Decimal`
//! - [`cost`]: LMSR / LS-LMSR cost functions and marginal prices
//!
//! Collateral amounts are held to [`COLLATERAL_DECIMALS`] places. Amounts
//! charged to a caller round up and amounts paid out round down, so the pool
//! always keeps at least what the cost function says it owes.

pub mod cost;
pub mod fixed;

use rust_decimal::{Decimal, RoundingStrategy};

pub use cost::{alpha_from_max_loss, cost, ls_cost, CostFunction, PRICE_EPSILON};
pub use fixed::{exp, ln, E, LN_2};

/// Fractional digits of the collateral token
pub const COLLATERAL_DECIMALS: u32 = 18;

/// Round a collateral amount owed to the pool
pub fn round_up(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(COLLATERAL_DECIMALS, RoundingStrategy::ToPositiveInfinity)
}

/// Round a collateral amount paid by the pool
pub fn round_down(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(COLLATERAL_DECIMALS, RoundingStrategy::ToNegativeInfinity)
}
