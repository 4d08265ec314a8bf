//! Configuration loader

use config::{Config, Environment, File, FileFormat};
use std::path::Path;

use super::types::AppConfig;
use crate::common::errors::{MarketError, Result};

/// Prefix for environment overrides, e.g. `LSLMSR__MARKET__TRADING_FEE`
pub const ENV_PREFIX: &str = "LSLMSR";

/// Load configuration from file and environment variables
///
/// Priority (highest to lowest):
/// 1. Environment variables (prefixed with LSLMSR__)
/// 2. Configuration file (TOML format)
/// 3. Default values
pub fn load_config(config_path: Option<&str>) -> Result<AppConfig> {
    let mut builder = Config::builder();

    if let Some(path) = config_path {
        if Path::new(path).exists() {
            builder = builder.add_source(File::with_name(path).required(false));
        }
    }

    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder
        .build()
        .map_err(|e| MarketError::Configuration(e.to_string()))?;

    config
        .try_deserialize()
        .map_err(|e| MarketError::Configuration(e.to_string()))
}

/// Parse configuration from a TOML string
pub fn load_from_str(toml: &str) -> Result<AppConfig> {
    Config::builder()
        .add_source(File::from_str(toml, FileFormat::Toml))
        .build()
        .and_then(|config| config.try_deserialize())
        .map_err(|e| MarketError::Configuration(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::CurveConfig;
    use crate::common::types::OptionKind;
    use crate::market::Curve;
    use chrono::{DateTime, Utc};
    use rust_decimal_macros::dec;

    const MARKET_TOML: &str = r#"
        [market]
        strike_prices = ["300", "400", "500", "600"]
        kind = "put"
        expiry_time = "2030-01-01T08:00:00Z"
        trading_fee = "0.01"
        balance_cap = "40"

        [market.curve]
        type = "liquidity_sensitive"
        max_loss = "0.1"

        [settings]
        log_level = "debug"
    "#;

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    #[test]
    fn test_parse_market_config() {
        let config = load_from_str(MARKET_TOML).unwrap();
        let market = &config.market;
        assert_eq!(market.strike_prices, vec![dec!(300), dec!(400), dec!(500), dec!(600)]);
        assert_eq!(market.kind, OptionKind::Put);
        assert_eq!(market.trading_fee, dec!(0.01));
        assert_eq!(market.balance_cap, dec!(40));
        assert_eq!(market.supply_cap, dec!(0));
        assert_eq!(market.dispute_period_seconds, 3600);
        assert_eq!(config.settings.log_level, "debug");
        assert!(!config.settings.json_logs);
    }

    #[test]
    fn test_to_params_derives_alpha() {
        let config = load_from_str(MARKET_TOML).unwrap();
        let params = config.market.to_params(now()).unwrap();
        match params.curve {
            Curve::LiquiditySensitive { alpha } => {
                assert!((alpha - dec!(0.0721347520444481703680)).abs() < dec!(0.000000000000000001));
            }
            other => panic!("unexpected curve {:?}", other),
        }
    }

    #[test]
    fn test_default_curve_is_depth() {
        let toml = r#"
            [market]
            strike_prices = [100]
            expiry_time = "2030-01-01T00:00:00Z"
        "#;
        let config = load_from_str(toml).unwrap();
        assert_eq!(config.market.curve, CurveConfig::Depth);
        assert_eq!(config.market.kind, OptionKind::Call);
        assert!(config.market.to_params(now()).is_ok());
    }

    #[test]
    fn test_ambiguous_curve_rejected() {
        let curve = CurveConfig::LiquiditySensitive {
            alpha: Some(dec!(0.05)),
            max_loss: Some(dec!(0.1)),
        };
        assert!(matches!(curve.to_curve(), Err(MarketError::Configuration(_))));
    }

    #[test]
    fn test_invalid_strikes_rejected() {
        let toml = r#"
            [market]
            strike_prices = [500, 400]
            expiry_time = "2030-01-01T00:00:00Z"
        "#;
        let config = load_from_str(toml).unwrap();
        assert_eq!(
            config.market.to_params(now()).unwrap_err(),
            MarketError::StrikesNotStrictlyIncreasing { index: 1 }
        );
    }

    #[test]
    fn test_missing_file_without_env_fails() {
        let result = load_config(Some("does/not/exist.toml"));
        assert!(matches!(result, Err(MarketError::Configuration(_))));
    }
}
