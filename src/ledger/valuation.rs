//! Portfolio valuation: pure derivation of market values and P&L.
//!
//! No mutation anywhere in this module; calling [`valuate`] twice against the
//! same portfolio and price source yields identical totals. A price lookup
//! failure for an unknown symbol propagates as `PriceUnavailable` rather than
//! silently valuing the position at zero.

use crate::error::Result;
use crate::market::PriceSource;
use crate::types::Portfolio;
use rust_decimal::Decimal;
use serde::Serialize;

/// Valuation of a single open position at current prices.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PositionValuation {
    pub symbol: String,
    pub shares: u32,
    pub average_cost: Decimal,
    pub last_price: Decimal,
    pub market_value: Decimal,
    pub unrealized_pl: Decimal,
    pub unrealized_pl_percent: Decimal,
}

/// Point-in-time totals for the whole book.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortfolioValuation {
    pub cash: Decimal,
    pub positions: Vec<PositionValuation>,
    /// cash + Σ shares × price
    pub total_value: Decimal,
    /// total_value − starting_capital
    pub total_pl: Decimal,
    pub total_pl_percent: Decimal,
}

/// Value every holding at its current price and derive portfolio totals.
pub fn valuate(portfolio: &Portfolio, prices: &dyn PriceSource) -> Result<PortfolioValuation> {
    let mut positions = Vec::with_capacity(portfolio.holdings.len());
    let mut total_value = portfolio.cash;

    for holding in portfolio.holdings.values() {
        let last_price = prices.price_of(&holding.symbol)?;
        let market_value = last_price * Decimal::from(holding.shares);
        let unrealized_pl = market_value - holding.total_cost_basis;
        let unrealized_pl_percent = if holding.total_cost_basis > Decimal::ZERO {
            unrealized_pl / holding.total_cost_basis * Decimal::ONE_HUNDRED
        } else {
            Decimal::ZERO
        };

        total_value += market_value;
        positions.push(PositionValuation {
            symbol: holding.symbol.clone(),
            shares: holding.shares,
            average_cost: holding.average_cost,
            last_price,
            market_value,
            unrealized_pl,
            unrealized_pl_percent,
        });
    }

    let total_pl = total_value - portfolio.starting_capital;
    let total_pl_percent = if portfolio.starting_capital > Decimal::ZERO {
        total_pl / portfolio.starting_capital * Decimal::ONE_HUNDRED
    } else {
        Decimal::ZERO
    };

    Ok(PortfolioValuation {
        cash: portfolio.cash,
        positions,
        total_value,
        total_pl,
        total_pl_percent,
    })
}
