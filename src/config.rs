//! Configuration loading
//!
//! TOML file plus `PAPERTRADE_`-prefixed environment overrides. Every section
//! deserializes from partial (or empty) TOML; defaults fill the rest, so a
//! missing config file is not an error.

use crate::error::Result;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub trading: TradingConfig,
    #[serde(default)]
    pub market: MarketConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub model: ModelConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TradingConfig {
    /// Cash a fresh portfolio starts with.
    #[serde(default = "default_starting_cash")]
    pub starting_cash: Decimal,
    /// Symbols refreshed by the background market loop.
    #[serde(default = "default_watchlist")]
    pub watchlist: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MarketConfig {
    #[serde(default = "default_binance_url")]
    pub binance_url: String,
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_secs: u64,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    /// Generate a synthetic quote when a symbol has no cached price. Disabling
    /// this makes unknown-symbol lookups fail with `PriceUnavailable`.
    #[serde(default = "default_true")]
    pub synthetic_fallback: bool,
    /// Optional RNG seed for reproducible synthetic prices.
    #[serde(default)]
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Directory holding the persisted portfolio and model state.
    #[serde(default = "default_state_dir")]
    pub state_dir: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    /// Feed each backtest report to the model trainer. The coupling is explicit
    /// and can be disabled per-run from the CLI.
    #[serde(default = "default_true")]
    pub train_on_backtest: bool,
}

impl Config {
    /// Load from a TOML file (optional) with environment overrides, e.g.
    /// `PAPERTRADE_TRADING__STARTING_CASH=50000`.
    pub fn load(path: &str) -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix("PAPERTRADE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;
        Ok(cfg.try_deserialize()?)
    }
}

impl StorageConfig {
    /// State directory with `~` expanded.
    pub fn state_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.state_dir).into_owned())
    }
}

impl Default for TradingConfig {
    fn default() -> Self {
        Self {
            starting_cash: default_starting_cash(),
            watchlist: default_watchlist(),
        }
    }
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            binance_url: default_binance_url(),
            refresh_interval_secs: default_refresh_interval(),
            request_timeout_secs: default_request_timeout(),
            synthetic_fallback: true,
            seed: None,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            state_dir: default_state_dir(),
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            train_on_backtest: true,
        }
    }
}

fn default_starting_cash() -> Decimal {
    dec!(100000)
}

fn default_watchlist() -> Vec<String> {
    ["SPY", "QQQ", "BTCUSDT", "ETHUSDT"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_binance_url() -> String {
    "https://api.binance.com".to_string()
}

fn default_refresh_interval() -> u64 {
    5
}

fn default_request_timeout() -> u64 {
    10
}

fn default_state_dir() -> String {
    "~/.papertrade".to_string()
}

fn default_true() -> bool {
    true
}
