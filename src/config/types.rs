//! Configuration types

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::common::errors::{MarketError, Result};
use crate::common::types::OptionKind;
use crate::market::{Curve, MarketParams, DEFAULT_DISPUTE_PERIOD_SECS};
use crate::math::alpha_from_max_loss;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Market to create
    pub market: MarketConfig,
    /// General application settings
    #[serde(default)]
    pub settings: AppSettings,
}

/// Market construction parameters as written in a config file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketConfig {
    /// Strictly increasing strike prices
    pub strike_prices: Vec<Decimal>,
    /// `call` or `put`
    #[serde(default)]
    pub kind: OptionKind,
    /// Expiry as an RFC 3339 timestamp
    pub expiry_time: DateTime<Utc>,
    /// Fraction of notional charged per trade
    #[serde(default)]
    pub trading_fee: Decimal,
    /// Maximum pool collateral (0 = unlimited)
    #[serde(default)]
    pub balance_cap: Decimal,
    /// Maximum outstanding position supply (0 = unlimited)
    #[serde(default)]
    pub supply_cap: Decimal,
    /// Window for correcting the settlement price
    #[serde(default = "default_dispute_period")]
    pub dispute_period_seconds: i64,
    #[serde(default)]
    pub curve: CurveConfig,
}

fn default_dispute_period() -> i64 {
    DEFAULT_DISPUTE_PERIOD_SECS
}

/// Liquidity curve selection
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CurveConfig {
    /// Depth funded by liquidity shares
    #[default]
    Depth,
    /// Depth proportional to outstanding quantity. Give either `alpha`
    /// directly or the worst-case loss `max_loss` it is derived from.
    LiquiditySensitive {
        #[serde(default)]
        alpha: Option<Decimal>,
        #[serde(default)]
        max_loss: Option<Decimal>,
    },
}

impl CurveConfig {
    pub fn to_curve(&self) -> Result<Curve> {
        match self {
            CurveConfig::Depth => Ok(Curve::Depth),
            CurveConfig::LiquiditySensitive {
                alpha: Some(alpha),
                max_loss: None,
            } => Ok(Curve::LiquiditySensitive { alpha: *alpha }),
            CurveConfig::LiquiditySensitive {
                alpha: None,
                max_loss: Some(max_loss),
            } => Ok(Curve::LiquiditySensitive {
                alpha: alpha_from_max_loss(*max_loss)?,
            }),
            CurveConfig::LiquiditySensitive { .. } => Err(MarketError::Configuration(
                "liquidity_sensitive curve needs exactly one of alpha or max_loss".to_string(),
            )),
        }
    }
}

impl MarketConfig {
    /// Convert into validated construction parameters
    pub fn to_params(&self, now: DateTime<Utc>) -> Result<MarketParams> {
        let params = MarketParams::new(self.strike_prices.clone(), self.expiry_time)
            .with_kind(self.kind)
            .with_curve(self.curve.to_curve()?)
            .with_trading_fee(self.trading_fee)
            .with_caps(self.balance_cap, self.supply_cap)
            .with_dispute_period(Duration::seconds(self.dispute_period_seconds));
        params.validate(now)?;
        Ok(params)
    }
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSettings {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Emit logs as JSON lines
    #[serde(default)]
    pub json_logs: bool,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logs: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
