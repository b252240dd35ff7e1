//! The ledger: cash balance, per-symbol holdings, and the append-only
//! transaction log.
//!
//! All validation happens before any write, so a rejected order leaves the
//! book byte-for-byte unchanged. Cost basis uses the average-cost method:
//! recomputed on every buy, untouched by sells.

pub mod valuation;

pub use valuation::{PortfolioValuation, PositionValuation};

use crate::error::{Error, Result};
use crate::market::PriceSource;
use crate::types::{Holding, OrderType, Portfolio, Side, Transaction};
use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{debug, info};
use uuid::Uuid;

/// Owns a [`Portfolio`] and applies orders to it.
///
/// Single-owner, no interior locking: callers that share a ledger across tasks
/// wrap it in a lock and hold it for the whole operation, which keeps each
/// mutation atomic with respect to its transaction append.
#[derive(Debug, Clone)]
pub struct Ledger {
    portfolio: Portfolio,
}

impl Ledger {
    pub fn new(starting_cash: Decimal) -> Self {
        Self {
            portfolio: Portfolio::new(starting_cash),
        }
    }

    /// Resume from a persisted snapshot.
    pub fn from_portfolio(portfolio: Portfolio) -> Self {
        Self { portfolio }
    }

    pub fn portfolio(&self) -> &Portfolio {
        &self.portfolio
    }

    pub fn cash(&self) -> Decimal {
        self.portfolio.cash
    }

    /// Apply a buy or sell order, resolving the execution price through the
    /// given price source, and append the resulting transaction record.
    ///
    /// Limit and stop order types are accepted but execute immediately at the
    /// quoted price — there is no resting-order book.
    pub fn apply_order(
        &mut self,
        prices: &dyn PriceSource,
        symbol: &str,
        side: Side,
        quantity: u32,
        order_type: OrderType,
    ) -> Result<Transaction> {
        let symbol = symbol.trim().to_ascii_uppercase();
        if symbol.is_empty() {
            return Err(Error::InvalidOrder("symbol must not be empty".into()));
        }
        if quantity == 0 {
            return Err(Error::InvalidOrder("quantity must be positive".into()));
        }

        if order_type != OrderType::Market {
            debug!(%symbol, ?order_type, "non-market order executed immediately at quote");
        }

        let price = prices.price_of(&symbol)?;
        let total = price * Decimal::from(quantity);

        match side {
            Side::Buy => self.buy(&symbol, quantity, total)?,
            Side::Sell => self.sell(&symbol, quantity, total)?,
        }

        let tx = Transaction {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            symbol: symbol.clone(),
            side,
            quantity,
            price,
            total,
        };
        self.portfolio.transactions.push(tx.clone());

        info!(
            %symbol, %side, quantity, %price,
            cash = %self.portfolio.cash,
            "order executed"
        );
        Ok(tx)
    }

    fn buy(&mut self, symbol: &str, quantity: u32, total: Decimal) -> Result<()> {
        if total > self.portfolio.cash {
            return Err(Error::InsufficientFunds {
                required: total,
                available: self.portfolio.cash,
            });
        }

        self.portfolio.cash -= total;
        let holding = self
            .portfolio
            .holdings
            .entry(symbol.to_string())
            .or_insert_with(|| Holding {
                symbol: symbol.to_string(),
                shares: 0,
                average_cost: Decimal::ZERO,
                total_cost_basis: Decimal::ZERO,
            });

        // Weighted-average cost basis over old shares plus this fill.
        holding.total_cost_basis += total;
        holding.shares += quantity;
        holding.average_cost = holding.total_cost_basis / Decimal::from(holding.shares);
        Ok(())
    }

    fn sell(&mut self, symbol: &str, quantity: u32, total: Decimal) -> Result<()> {
        let held = self.portfolio.holding(symbol).map(|h| h.shares).unwrap_or(0);
        if held < quantity {
            return Err(Error::InsufficientShares {
                symbol: symbol.to_string(),
                requested: quantity,
                held,
            });
        }

        self.portfolio.cash += total;
        if held == quantity {
            // Position fully closed: removed, never kept at zero shares.
            self.portfolio.holdings.remove(symbol);
        } else if let Some(holding) = self.portfolio.holdings.get_mut(symbol) {
            // Average cost is unchanged by sells; the basis shrinks with the
            // share count.
            holding.shares = held - quantity;
            holding.total_cost_basis = holding.average_cost * Decimal::from(holding.shares);
        }
        Ok(())
    }
}
