//! Error types for the market engine

use rust_decimal::Decimal;
use thiserror::Error;

use super::types::{AccountId, Arm, Asset};

/// Result type alias using our MarketError
pub type Result<T> = std::result::Result<T, MarketError>;

/// Result type alias for the pure math layer
pub type MathResult<T> = std::result::Result<T, MathError>;

/// Main error type for market operations
///
/// Every variant aborts the whole operation; no state is changed when one
/// is returned.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MarketError {
    // ---------------------------------------------------------------------
    // Validation
    // ---------------------------------------------------------------------
    /// Strike index outside `0..N`
    #[error("Index too large: {index} (market has {len} strikes)")]
    IndexOutOfRange { index: usize, len: usize },

    /// Per-strike input vector has the wrong length
    #[error("Lengths do not match: expected {expected}, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    /// No strikes supplied at construction
    #[error("Strike prices must not be empty")]
    EmptyStrikes,

    /// Strikes are not strictly increasing
    #[error("Strike prices must be increasing (index {index})")]
    StrikesNotStrictlyIncreasing { index: usize },

    /// A strike is zero or negative
    #[error("Strike prices must be > 0 (index {index})")]
    StrikeMustBePositive { index: usize },

    /// LS-LMSR alpha outside `(0, 1)`
    #[error("Alpha must be in (0, 1), got {0}")]
    AlphaOutOfRange(Decimal),

    /// Trading fee outside `[0, 1)`
    #[error("Trading fee must be in [0, 1), got {0}")]
    FeeOutOfRange(Decimal),

    /// Expiry already passed when the market was created
    #[error("Already expired at creation")]
    AlreadyExpiredAtCreation,

    /// Trade size is zero or negative
    #[error("Size must be > 0, got {0}")]
    SizeMustBePositive(Decimal),

    /// Liquidity share amount is zero or negative
    #[error("Shares must be > 0, got {0}")]
    SharesMustBePositive(Decimal),

    /// The size is too small to change the supply at decimal precision
    #[error("Size {size} is below the precision of the current supply")]
    PrecisionLoss { size: Decimal },

    // ---------------------------------------------------------------------
    // Timing
    // ---------------------------------------------------------------------
    /// Trading or liquidity change after expiry
    #[error("Already expired")]
    AlreadyExpired,

    /// Settlement or redemption before expiry
    #[error("Cannot be called before expiry")]
    NotYetExpired,

    /// Redemption or dispute before settlement
    #[error("Cannot be called before settlement")]
    NotYetSettled,

    /// Second settlement attempt
    #[error("Already settled")]
    AlreadySettled,

    /// Redemption while the dispute window is open
    #[error("Cannot be called during dispute period")]
    InDisputePeriod,

    /// Dispute after the window elapsed
    #[error("Not dispute period")]
    DisputeWindowClosed,

    /// The settlement price was already corrected once
    #[error("Settlement price was already disputed")]
    AlreadyDisputed,

    // ---------------------------------------------------------------------
    // Economic
    // ---------------------------------------------------------------------
    /// Computed amount is outside the caller's bound
    #[error("Max slippage exceeded: amount {amount}, limit {limit}")]
    SlippageExceeded { amount: Decimal, limit: Decimal },

    /// Pool collateral would exceed the balance cap
    #[error("Balance limit exceeded: {balance} > {cap}")]
    BalanceCapExceeded { balance: Decimal, cap: Decimal },

    /// Outstanding position supply would exceed the supply cap
    #[error("Total supply limit exceeded: {supply} > {cap}")]
    SupplyCapExceeded { supply: Decimal, cap: Decimal },

    /// A sell would pay out nothing after fees
    #[error("Amount out must be > 0, got {0}")]
    AmountOutMustBePositive(Decimal),

    /// The caller does not hold enough of an asset
    #[error("Insufficient {asset} balance for {holder}: need {required}, have {available}")]
    InsufficientBalance {
        asset: Asset,
        holder: AccountId,
        required: Decimal,
        available: Decimal,
    },

    /// Redemption with a zero position
    #[error("Balance must be > 0")]
    BalanceMustBePositive,

    /// Trading before any liquidity depth was provided
    #[error("Cannot be called before b is set")]
    NotYetLiquid,

    /// Withdrawal would leave the pool without the depth it needs
    #[error("Insufficient liquidity: depth {depth}, requested {requested}")]
    InsufficientLiquidity { depth: Decimal, requested: Decimal },

    /// Removing more of a position than is outstanding
    #[error("Insufficient {arm} supply at strike {strike_index}: have {supply}, requested {requested}")]
    InsufficientSupply {
        arm: Arm,
        strike_index: usize,
        supply: Decimal,
        requested: Decimal,
    },

    /// Combined depth increase that does not raise the depth
    #[error("New b must be higher: current {current}, requested {requested}")]
    LiquidityMustIncrease { current: Decimal, requested: Decimal },

    /// Depth is derived from quantities on this curve and cannot be set
    #[error("Liquidity depth is not adjustable on a liquidity-sensitive curve")]
    LiquidityNotAdjustable,

    // ---------------------------------------------------------------------
    // Authorization
    // ---------------------------------------------------------------------
    /// Owner-only operation called by someone else
    #[error("Unauthorized: {0} is not the owner")]
    Unauthorized(AccountId),

    /// Market is paused and the caller is not the owner
    #[error("This method has been paused")]
    Paused,

    // ---------------------------------------------------------------------
    // Collaborators
    // ---------------------------------------------------------------------
    /// Price oracle failure
    #[error("Oracle error: {0}")]
    Oracle(#[from] OracleError),

    /// Balance ledger failure
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// Fixed-point math failure
    #[error("Math error: {0}")]
    Math(#[from] MathError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Errors raised by the fixed-point cost engine
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MathError {
    /// Intermediate value does not fit in a decimal
    #[error("arithmetic overflow")]
    Overflow,

    /// `ln` of zero or a negative number
    #[error("logarithm of a non-positive value")]
    NonPositiveLogarithm,

    /// Cost evaluated over an empty outcome vector
    #[error("empty quantity vector")]
    EmptyQuantities,

    /// Outcome quantity below zero
    #[error("negative outcome quantity")]
    NegativeQuantity,

    /// Liquidity depth below zero
    #[error("negative liquidity depth")]
    NegativeDepth,
}

/// Errors reported by a price oracle
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OracleError {
    /// No price is available yet
    #[error("price unavailable: {0}")]
    Unavailable(String),

    /// The oracle returned a value that cannot be a price
    #[error("invalid price: {0}")]
    InvalidPrice(Decimal),
}

/// Errors reported by a balance ledger
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LedgerError {
    /// Debit larger than the holder's balance
    #[error("insufficient {asset} balance for {holder}: need {required}, have {available}")]
    InsufficientBalance {
        asset: Asset,
        holder: AccountId,
        required: Decimal,
        available: Decimal,
    },

    /// Pool cannot cover a payout
    #[error("insufficient pool collateral: need {required}, have {available}")]
    InsufficientPoolBalance { required: Decimal, available: Decimal },

    /// Negative amounts are never valid ledger inputs
    #[error("negative amount: {0}")]
    NegativeAmount(Decimal),

    /// Balance arithmetic overflowed
    #[error("balance overflow")]
    Overflow,

    /// Backend-specific failure
    #[error("{0}")]
    Backend(String),
}
