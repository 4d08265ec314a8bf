//! Collaborator interfaces consumed by the market

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use super::errors::{LedgerError, OracleError};
use super::types::{AccountId, Asset};

/// Source of the settlement price
///
/// Called exactly once per successful settlement. A failure aborts the
/// settlement and leaves the market unchanged, so it can be retried.
pub trait PriceOracle: Send + Sync {
    /// Current price of the underlying in quote units
    fn get_price(&self) -> Result<Decimal, OracleError>;
}

/// Fungible balance ledger holding collateral, positions and LP shares
///
/// The market never keeps balances of its own; everything it pays or
/// collects goes through this interface.
pub trait Ledger: Send {
    /// Balance of `asset` held by `holder`
    fn balance_of(&self, asset: Asset, holder: &AccountId) -> Decimal;

    /// Outstanding supply of a minted asset
    fn total_supply(&self, asset: Asset) -> Decimal;

    /// Collateral held by the market pool
    fn pool_balance(&self) -> Decimal;

    /// Create `amount` of `asset` for `holder`
    fn mint(&mut self, asset: Asset, holder: &AccountId, amount: Decimal) -> Result<(), LedgerError>;

    /// Destroy `amount` of `asset` held by `holder`
    fn burn(&mut self, asset: Asset, holder: &AccountId, amount: Decimal) -> Result<(), LedgerError>;

    /// Move collateral from `from` into the pool
    fn transfer_in(&mut self, from: &AccountId, amount: Decimal) -> Result<(), LedgerError>;

    /// Move collateral from the pool to `to`
    fn transfer_out(&mut self, to: &AccountId, amount: Decimal) -> Result<(), LedgerError>;

    /// Check whether `holder` has at least `amount` of `asset`
    fn has_balance(&self, asset: Asset, holder: &AccountId, amount: Decimal) -> bool {
        self.balance_of(asset, holder) >= amount
    }
}

/// Owner/governance lookup
pub trait AccessControl: Send + Sync {
    fn is_owner(&self, account: &AccountId) -> bool;
}

/// Wall clock used for expiry and dispute checks
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Type alias for boxed oracles
pub type BoxedOracle = Box<dyn PriceOracle>;

/// Type alias for boxed access control
pub type BoxedAccessControl = Box<dyn AccessControl>;
