//! Crate-wide error taxonomy
//!
//! Trading errors (`InvalidOrder`, `InsufficientFunds`, `InsufficientShares`,
//! `InvalidBacktestParams`) are local and non-fatal: the caller surfaces a
//! message and state is left untouched. Quote fetch failures never reach this
//! type — the market layer falls back to synthetic data instead.

use rust_decimal::Decimal;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid order: {0}")]
    InvalidOrder(String),

    #[error("insufficient funds: need {required}, have {available}")]
    InsufficientFunds {
        required: Decimal,
        available: Decimal,
    },

    #[error("insufficient shares of {symbol}: requested {requested}, holding {held}")]
    InsufficientShares {
        symbol: String,
        requested: u32,
        held: u32,
    },

    #[error("invalid backtest parameters: {0}")]
    InvalidBacktestParams(String),

    #[error("no price available for {0}")]
    PriceUnavailable(String),

    #[error("config error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl Error {
    /// Whether the error is a user-facing trade rejection rather than an
    /// infrastructure failure. Rejections never leave partial state behind.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Error::InvalidOrder(_)
                | Error::InsufficientFunds { .. }
                | Error::InsufficientShares { .. }
                | Error::InvalidBacktestParams(_)
        )
    }
}
