//! Price oracle implementations

use rust_decimal::Decimal;
use std::sync::{Arc, RwLock};

use super::errors::OracleError;
use super::traits::PriceOracle;

/// Oracle whose price is set by hand
///
/// Clones share the same price. Reports [`OracleError::Unavailable`] until a
/// price is set.
#[derive(Debug, Clone, Default)]
pub struct ManualOracle {
    price: Arc<RwLock<Option<Decimal>>>,
}

impl ManualOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_price(price: Decimal) -> Self {
        let oracle = Self::new();
        oracle.set_price(price);
        oracle
    }

    pub fn set_price(&self, price: Decimal) {
        if let Ok(mut guard) = self.price.write() {
            *guard = Some(price);
        }
    }

    pub fn clear(&self) {
        if let Ok(mut guard) = self.price.write() {
            *guard = None;
        }
    }
}

impl PriceOracle for ManualOracle {
    fn get_price(&self) -> Result<Decimal, OracleError> {
        let guard = self
            .price
            .read()
            .map_err(|e| OracleError::Unavailable(e.to_string()))?;
        match *guard {
            Some(price) if price.is_sign_negative() && !price.is_zero() => {
                Err(OracleError::InvalidPrice(price))
            }
            Some(price) => Ok(price),
            None => Err(OracleError::Unavailable("no price set".to_string())),
        }
    }
}
