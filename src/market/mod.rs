//! Market data: the price-source seam, synthetic quote generation, and the
//! periodically refreshed quote cache.
//!
//! The ledger and valuator only ever see the [`PriceSource`] trait, so a real
//! feed can be substituted without touching them. The default implementation,
//! [`MarketData`], serves cached quotes and synthesizes one on a miss; the
//! background refresh loop overwrites cache entries with live ticker stats for
//! crypto symbols and fresh synthetic quotes for everything else.

mod binance;

pub use binance::{BinanceClient, TickerApi, TickerStats};
#[cfg(test)]
pub use binance::MockTickerApi;

use crate::error::{Error, Result};
use crate::types::{AssetClass, Quote};
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Supplies a current price for a ticker symbol.
///
/// Implementations must be cheap and side-effect free from the caller's point
/// of view; the valuator calls this repeatedly and expects idempotent results
/// between cache updates.
#[cfg_attr(test, mockall::automock)]
pub trait PriceSource: Send + Sync {
    fn price_of(&self, symbol: &str) -> Result<Decimal>;
}

/// Cached market quotes with synthetic fill-in.
///
/// Policy per symbol: return the cached quote if one exists (entries are never
/// evicted by age, only overwritten by a refresh tick); otherwise generate a
/// synthetic quote, cache it, and return it. Construct with
/// [`MarketData::cache_only`] to disable generation, in which case a miss is a
/// `PriceUnavailable` error.
pub struct MarketData {
    quotes: RwLock<HashMap<String, Quote>>,
    last_update: RwLock<Option<DateTime<Utc>>>,
    rng: Mutex<StdRng>,
    generate: bool,
    /// Serializes refresh ticks: a tick that arrives while the previous one is
    /// still in flight is skipped, not interleaved.
    refresh_gate: tokio::sync::Mutex<()>,
}

impl MarketData {
    pub fn new() -> Self {
        Self::build(StdRng::from_os_rng(), true)
    }

    /// Deterministic synthetic quotes for tests and reproducible runs.
    pub fn with_seed(seed: u64) -> Self {
        Self::build(StdRng::seed_from_u64(seed), true)
    }

    /// No synthetic generation: unknown symbols fail with `PriceUnavailable`.
    pub fn cache_only() -> Self {
        Self::build(StdRng::from_os_rng(), false)
    }

    fn build(rng: StdRng, generate: bool) -> Self {
        Self {
            quotes: RwLock::new(HashMap::new()),
            last_update: RwLock::new(None),
            rng: Mutex::new(rng),
            generate,
            refresh_gate: tokio::sync::Mutex::new(()),
        }
    }

    /// Insert or replace a quote. Quotes are always whole values, never
    /// partial merges, so a reader sees either the old quote or the new one.
    pub fn insert(&self, symbol: &str, quote: Quote) {
        self.quotes
            .write()
            .insert(symbol.to_ascii_uppercase(), quote);
    }

    /// Full quote for a symbol, generating one on a miss if enabled.
    pub fn quote_of(&self, symbol: &str) -> Result<Quote> {
        let key = symbol.to_ascii_uppercase();
        if let Some(q) = self.quotes.read().get(&key) {
            return Ok(q.clone());
        }
        if !self.generate {
            return Err(Error::PriceUnavailable(key));
        }
        let quote = synthetic_quote(&key, &mut self.rng.lock());
        self.quotes.write().insert(key, quote.clone());
        Ok(quote)
    }

    pub fn last_update(&self) -> Option<DateTime<Utc>> {
        *self.last_update.read()
    }

    /// Refresh every watchlist symbol: live 24h ticker stats for crypto (with
    /// a single synthetic fallback attempt on failure), fresh synthetic quotes
    /// for stocks. Skips the whole tick if a previous refresh is still running.
    pub async fn refresh_all(&self, ticker: &dyn TickerApi, watchlist: &[String]) {
        let _gate = match self.refresh_gate.try_lock() {
            Ok(g) => g,
            Err(_) => {
                debug!("refresh tick skipped: previous refresh still running");
                return;
            }
        };

        for symbol in watchlist {
            let quote = match AssetClass::of(symbol) {
                AssetClass::Crypto => match ticker.ticker_24h(symbol).await {
                    Ok(stats) => stats.into_quote(),
                    Err(e) => {
                        warn!(%symbol, error = %e, "live quote failed, using synthetic fallback");
                        synthetic_quote(symbol, &mut self.rng.lock())
                    }
                },
                _ => synthetic_quote(symbol, &mut self.rng.lock()),
            };
            self.insert(symbol, quote);
        }
        *self.last_update.write() = Some(Utc::now());
    }

    /// Spawn the periodic refresh task. The returned handle is aborted when
    /// the platform closes; an in-flight fetch only ever produces a whole
    /// replacement quote, so aborting mid-tick cannot corrupt the cache.
    pub fn spawn_refresh(
        self: &Arc<Self>,
        ticker: Arc<dyn TickerApi>,
        watchlist: Vec<String>,
        every: Duration,
    ) -> JoinHandle<()> {
        let market = Arc::clone(self);
        tokio::spawn(async move {
            let mut tick = interval(every);
            tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!(every_secs = every.as_secs(), "market refresh loop started");
            loop {
                tick.tick().await;
                market.refresh_all(ticker.as_ref(), &watchlist).await;
            }
        })
    }
}

impl Default for MarketData {
    fn default() -> Self {
        Self::new()
    }
}

impl PriceSource for MarketData {
    fn price_of(&self, symbol: &str) -> Result<Decimal> {
        Ok(self.quote_of(symbol)?.price)
    }
}

/// Generate a synthetic quote for a symbol.
///
/// Major coins are anchored at their ballpark levels with ±5% jitter; unknown
/// crypto symbols land anywhere in the 2 500–45 000 band; everything else is
/// priced like an equity in the 100–500 band. The 24h change is within ±2.5%
/// of the price.
fn synthetic_quote(symbol: &str, rng: &mut StdRng) -> Quote {
    let price = match AssetClass::of(symbol) {
        AssetClass::Crypto => match symbol {
            "BTCUSDT" | "BTC" => jitter(45_000.0, rng),
            "ETHUSDT" | "ETH" => jitter(2_500.0, rng),
            _ => rng.random_range(2_500.0..45_000.0),
        },
        _ => rng.random_range(100.0..500.0),
    };
    let change = (rng.random_range(0.0..1.0) - 0.5) * price * 0.05;
    let change_percent = change / price * 100.0;

    Quote {
        price: to_dec(price),
        change: to_dec(change),
        change_percent: to_dec(change_percent),
        volume: None,
        timestamp: Utc::now(),
    }
}

fn jitter(base: f64, rng: &mut StdRng) -> f64 {
    base + (rng.random_range(0.0..1.0) - 0.5) * base * 0.1
}

fn to_dec(x: f64) -> Decimal {
    Decimal::from_f64(x).unwrap_or_default().round_dp(2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_price_is_cached_and_stable() {
        let market = MarketData::with_seed(7);
        let first = market.price_of("AAPL").unwrap();
        let second = market.price_of("AAPL").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_seeded_feeds_are_reproducible() {
        let a = MarketData::with_seed(42);
        let b = MarketData::with_seed(42);
        assert_eq!(a.price_of("MSFT").unwrap(), b.price_of("MSFT").unwrap());
        assert_eq!(
            a.price_of("BTCUSDT").unwrap(),
            b.price_of("BTCUSDT").unwrap()
        );
    }

    #[test]
    fn test_synthetic_ranges_by_asset_class() {
        let market = MarketData::with_seed(1);
        let equity = market.price_of("NVDA").unwrap();
        assert!(equity >= dec!(100) && equity <= dec!(500));

        let btc = market.price_of("BTCUSDT").unwrap();
        assert!(btc >= dec!(42749) && btc <= dec!(47251)); // 45_000 ±5%

        let alt = market.price_of("SOLUSDT").unwrap();
        assert!(alt >= dec!(2500) && alt <= dec!(45000));
    }

    #[test]
    fn test_cache_only_miss_is_an_error() {
        let market = MarketData::cache_only();
        let err = market.price_of("AAPL").unwrap_err();
        assert!(matches!(err, Error::PriceUnavailable(_)));
    }

    #[test]
    fn test_cache_only_serves_inserted_quotes() {
        let market = MarketData::cache_only();
        market.insert(
            "AAPL",
            Quote {
                price: dec!(150),
                change: dec!(1.2),
                change_percent: dec!(0.8),
                volume: None,
                timestamp: Utc::now(),
            },
        );
        assert_eq!(market.price_of("aapl").unwrap(), dec!(150));
    }

    #[test]
    fn test_refresh_falls_back_to_synthetic_on_fetch_failure() {
        let mut ticker = MockTickerApi::new();
        ticker
            .expect_ticker_24h()
            .returning(|s| Err(Error::PriceUnavailable(s.to_string())));

        let market = MarketData::with_seed(3);
        let watchlist = vec!["BTCUSDT".to_string(), "SPY".to_string()];
        tokio_test::block_on(market.refresh_all(&ticker, &watchlist));

        assert!(market.price_of("BTCUSDT").is_ok());
        assert!(market.price_of("SPY").is_ok());
        assert!(market.last_update().is_some());
    }

    #[test]
    fn test_refresh_applies_live_ticker_stats() {
        let mut ticker = MockTickerApi::new();
        ticker.expect_ticker_24h().returning(|_| {
            Ok(TickerStats {
                last_price: dec!(63250.10),
                price_change: dec!(1250.10),
                price_change_percent: dec!(2.02),
                volume: dec!(18000),
            })
        });

        let market = MarketData::with_seed(3);
        tokio_test::block_on(market.refresh_all(&ticker, &["BTCUSDT".to_string()]));

        let quote = market.quote_of("BTCUSDT").unwrap();
        assert_eq!(quote.price, dec!(63250.10));
        assert_eq!(quote.volume, Some(dec!(18000)));
    }
}
