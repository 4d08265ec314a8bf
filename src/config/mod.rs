//! Market configuration loading

pub mod loader;
pub mod types;

pub use loader::{load_config, load_from_str};
pub use types::{AppConfig, AppSettings, CurveConfig, MarketConfig};
