//! Core domain types: order sides, quotes, holdings, and the portfolio book.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Order side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
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

/// Order type accepted by the ledger.
///
/// Only market execution is implemented: limit and stop orders are accepted as
/// input but fill immediately at the quoted price. There is no resting book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    #[default]
    Market,
    Limit,
    Stop,
}

/// Coarse instrument classification used by the synthetic price generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetClass {
    Stocks,
    Crypto,
    Forex,
}

impl AssetClass {
    /// Classify a ticker symbol. Crypto pairs carry a stablecoin suffix or are
    /// one of the bare major coins; six-letter currency pairs are forex;
    /// everything else is treated as an equity.
    pub fn of(symbol: &str) -> AssetClass {
        let s = symbol.to_ascii_uppercase();
        if s.ends_with("USDT") || s.ends_with("USDC") || s == "BTC" || s == "ETH" {
            AssetClass::Crypto
        } else if s.len() == 6 && s.chars().all(|c| c.is_ascii_alphabetic()) && s.ends_with("USD") {
            AssetClass::Forex
        } else {
            AssetClass::Stocks
        }
    }

    /// Default symbol shown when switching to this asset class.
    pub fn default_symbol(&self) -> &'static str {
        match self {
            AssetClass::Stocks => "AAPL",
            AssetClass::Crypto => "BTCUSDT",
            AssetClass::Forex => "EURUSD",
        }
    }
}

/// A point-in-time quote with 24-hour change statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub price: Decimal,
    pub change: Decimal,
    pub change_percent: Decimal,
    /// 24h volume; only populated for live crypto quotes.
    pub volume: Option<Decimal>,
    pub timestamp: DateTime<Utc>,
}

/// Immutable record of one executed order. Appended in chronological order,
/// never mutated or deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub symbol: String,
    pub side: Side,
    pub quantity: u32,
    pub price: Decimal,
    pub total: Decimal,
}

/// A symbol's current position.
///
/// Invariant: `average_cost * shares == total_cost_basis` whenever shares > 0.
/// A holding with zero shares is removed from the book, never kept zeroed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Holding {
    pub symbol: String,
    pub shares: u32,
    pub average_cost: Decimal,
    pub total_cost_basis: Decimal,
}

/// The full paper-trading book: cash, open holdings, and the transaction log.
///
/// Owned exclusively by the ledger; the persistence adapter only reads and
/// writes snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Portfolio {
    pub cash: Decimal,
    pub holdings: BTreeMap<String, Holding>,
    pub transactions: Vec<Transaction>,
    pub starting_capital: Decimal,
}

impl Portfolio {
    /// Fresh book with the given starting cash. `starting_capital` is fixed at
    /// creation and never changes afterwards.
    pub fn new(starting_cash: Decimal) -> Self {
        Self {
            cash: starting_cash,
            holdings: BTreeMap::new(),
            transactions: Vec::new(),
            starting_capital: starting_cash,
        }
    }

    pub fn holding(&self, symbol: &str) -> Option<&Holding> {
        self.holdings.get(symbol)
    }

    pub fn is_flat(&self) -> bool {
        self.holdings.is_empty()
    }
}
