//! Live quote client: the single outbound network call.
//!
//! One read-only GET against the public Binance 24-hour ticker endpoint. The
//! payload carries numbers as strings; only the four fields we consume are
//! deserialized. Failures here are never fatal — the caller falls back to
//! synthetic data.

use crate::error::{Error, Result};
use crate::types::Quote;
use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// 24-hour ticker statistics for one symbol.
#[derive(Debug, Clone)]
pub struct TickerStats {
    pub last_price: Decimal,
    pub price_change: Decimal,
    pub price_change_percent: Decimal,
    pub volume: Decimal,
}

impl TickerStats {
    pub fn into_quote(self) -> Quote {
        Quote {
            price: self.last_price,
            change: self.price_change,
            change_percent: self.price_change_percent,
            volume: Some(self.volume),
            timestamp: Utc::now(),
        }
    }
}

/// Fetches 24-hour ticker statistics. The trait exists so the refresh loop can
/// be exercised without the network.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TickerApi: Send + Sync {
    async fn ticker_24h(&self, symbol: &str) -> Result<TickerStats>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Ticker24hPayload {
    last_price: String,
    price_change: String,
    price_change_percent: String,
    volume: String,
}

pub struct BinanceClient {
    http: reqwest::Client,
    base_url: String,
}

impl BinanceClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl TickerApi for BinanceClient {
    async fn ticker_24h(&self, symbol: &str) -> Result<TickerStats> {
        let url = format!("{}/api/v3/ticker/24hr", self.base_url);
        let payload: Ticker24hPayload = self
            .http
            .get(&url)
            .query(&[("symbol", symbol)])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        debug!(symbol, last_price = %payload.last_price, "ticker stats fetched");
        parse_stats(symbol, payload)
    }
}

fn parse_stats(symbol: &str, payload: Ticker24hPayload) -> Result<TickerStats> {
    let field = |v: &str| -> Result<Decimal> {
        v.parse::<Decimal>()
            .map_err(|_| Error::PriceUnavailable(symbol.to_string()))
    };
    Ok(TickerStats {
        last_price: field(&payload.last_price)?,
        price_change: field(&payload.price_change)?,
        price_change_percent: field(&payload.price_change_percent)?,
        volume: field(&payload.volume)?,
    })
}
