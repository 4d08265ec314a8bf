//! Shared types used across the engine

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Account identifier on the balance ledger
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(String);

impl AccountId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for AccountId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for AccountId {
    fn from(id: String) -> Self {
        Self::new(id)
    }
}

impl std::fmt::Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Position arm at a strike
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Arm {
    /// Pays the option payoff
    Long,
    /// Cover position, pays the complementary residual
    Short,
}

impl std::fmt::Display for Arm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Arm::Long => write!(f, "long"),
            Arm::Short => write!(f, "short"),
        }
    }
}

/// Option type of a market
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionKind {
    /// Collateral is the base asset, long pays `max(0, P - K)`
    #[default]
    Call,
    /// Collateral is the quote asset, long pays `max(0, K - P)`
    Put,
}

impl OptionKind {
    pub fn is_put(&self) -> bool {
        matches!(self, OptionKind::Put)
    }
}

impl std::fmt::Display for OptionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OptionKind::Call => write!(f, "call"),
            OptionKind::Put => write!(f, "put"),
        }
    }
}

/// Asset tracked by the balance ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "asset", content = "strike_index")]
pub enum Asset {
    /// The market's single collateral token
    Collateral,
    /// Long position token at a strike index
    Long(usize),
    /// Short (cover) position token at a strike index
    Short(usize),
    /// Liquidity provider share, one share per unit of depth
    LiquidityShare,
}

impl Asset {
    /// Position token for an arm at a strike
    pub fn position(arm: Arm, strike_index: usize) -> Self {
        match arm {
            Arm::Long => Asset::Long(strike_index),
            Arm::Short => Asset::Short(strike_index),
        }
    }
}

impl std::fmt::Display for Asset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Asset::Collateral => write!(f, "collateral"),
            Asset::Long(i) => write!(f, "long[{}]", i),
            Asset::Short(i) => write!(f, "short[{}]", i),
            Asset::LiquidityShare => write!(f, "liquidity share"),
        }
    }
}

/// Direction of a trade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Buy,
    Sell,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

/// State change recorded by the market
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MarketEvent {
    /// Position bought or sold
    Trade {
        account: AccountId,
        side: Side,
        arm: Arm,
        strike_index: usize,
        size: Decimal,
        /// Cost-function delta before fees
        cost: Decimal,
        fee: Decimal,
        /// Collateral paid in (buy) or out (sell)
        amount: Decimal,
        timestamp: DateTime<Utc>,
    },
    /// Liquidity depth changed
    LiquidityChanged {
        account: AccountId,
        /// Signed change in shares
        shares: Decimal,
        /// Collateral paid in (positive) or out (negative)
        amount: Decimal,
        depth: Decimal,
        timestamp: DateTime<Utc>,
    },
    /// Settlement price captured
    Settled {
        price: Decimal,
        cost_at_settlement: Decimal,
        total_payoff: Decimal,
        timestamp: DateTime<Utc>,
    },
    /// Settlement price corrected by the owner
    Disputed {
        previous_price: Decimal,
        price: Decimal,
        timestamp: DateTime<Utc>,
    },
    /// Position redeemed after settlement
    Redeemed {
        account: AccountId,
        arm: Arm,
        strike_index: usize,
        burned: Decimal,
        payout: Decimal,
        timestamp: DateTime<Utc>,
    },
    /// Excess collateral collected by the owner
    FeesCollected {
        recipient: AccountId,
        amount: Decimal,
        timestamp: DateTime<Utc>,
    },
    /// Circuit breaker toggled
    PauseChanged {
        paused: bool,
        timestamp: DateTime<Utc>,
    },
    /// Caps or timers changed by the owner
    ParametersChanged {
        balance_cap: Decimal,
        supply_cap: Decimal,
        expiry_time: DateTime<Utc>,
        timestamp: DateTime<Utc>,
    },
}
