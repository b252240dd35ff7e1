//! Session facade for the trading platform.
//!
//! Owns the ledger, model, market cache, and persistence adapter explicitly —
//! no process-wide singletons — and exposes the operations a presentation
//! layer consumes. Each operation runs to completion under its lock: a reader
//! can never observe a committed order without its transaction record and the
//! matching valuation.

use crate::backtest::{BacktestParams, BacktestReport, BacktestRunner};
use crate::config::Config;
use crate::error::Result;
use crate::ledger::{valuation, Ledger, PortfolioValuation};
use crate::market::{BinanceClient, MarketData, TickerApi};
use crate::model::{AiModel, Prediction, PREDICTION_UNIVERSE};
use crate::news::{self, NewsItem, SentimentSummary};
use crate::storage::JsonStore;
use crate::types::{AssetClass, OrderType, Portfolio, Quote, Side, Transaction};
use parking_lot::{Mutex, RwLock};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// What the caller gets back from a committed trade: the transaction record
/// and the valuation refreshed in the same critical section.
#[derive(Debug, Clone)]
pub struct TradeOutcome {
    pub transaction: Transaction,
    pub valuation: PortfolioValuation,
}

/// Currently selected instrument, mirrored from the chart controls.
#[derive(Debug, Clone)]
pub struct Session {
    pub symbol: String,
    pub timeframe: String,
    pub asset_type: AssetClass,
}

pub struct Platform {
    config: Config,
    ledger: RwLock<Ledger>,
    model: RwLock<AiModel>,
    rng: Mutex<StdRng>,
    market: Arc<MarketData>,
    ticker: Arc<dyn TickerApi>,
    store: JsonStore,
    session: RwLock<Session>,
    refresh_task: Mutex<Option<JoinHandle<()>>>,
}

impl Platform {
    pub fn new(config: Config) -> Result<Self> {
        let market = Arc::new(if !config.market.synthetic_fallback {
            MarketData::cache_only()
        } else if let Some(seed) = config.market.seed {
            MarketData::with_seed(seed)
        } else {
            MarketData::new()
        });
        let ticker: Arc<dyn TickerApi> = Arc::new(BinanceClient::new(
            &config.market.binance_url,
            Duration::from_secs(config.market.request_timeout_secs),
        )?);
        let rng = match config.market.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let store = JsonStore::new(config.storage.state_path());

        Ok(Self {
            ledger: RwLock::new(Ledger::new(config.trading.starting_cash)),
            model: RwLock::new(AiModel::default()),
            rng: Mutex::new(rng),
            market,
            ticker,
            store,
            session: RwLock::new(Session {
                symbol: "AAPL".to_string(),
                timeframe: "1D".to_string(),
                asset_type: AssetClass::Stocks,
            }),
            refresh_task: Mutex::new(None),
            config,
        })
    }

    /// Bring the platform up: restore persisted state (defaults on absence or
    /// corruption), prime the quote cache, and start the periodic refresh.
    pub async fn open(&self) -> Result<()> {
        let (portfolio, model) = self.store.load().await;
        match portfolio {
            Some(p) => *self.ledger.write() = Ledger::from_portfolio(p),
            None => {
                info!(
                    starting_cash = %self.config.trading.starting_cash,
                    "no saved portfolio, starting fresh"
                );
            }
        }
        if let Some(m) = model {
            *self.model.write() = m;
        }

        self.market
            .refresh_all(self.ticker.as_ref(), &self.config.trading.watchlist)
            .await;

        let handle = self.market.spawn_refresh(
            Arc::clone(&self.ticker),
            self.config.trading.watchlist.clone(),
            Duration::from_secs(self.config.market.refresh_interval_secs),
        );
        if let Some(old) = self.refresh_task.lock().replace(handle) {
            old.abort();
        }
        Ok(())
    }

    /// Tear the session down: stop the refresh timer (aborting any in-flight
    /// fetch) and persist a final snapshot. Quote fetches only ever replace
    /// whole values, so aborting mid-flight cannot corrupt the cache.
    pub async fn close(&self) -> Result<()> {
        if let Some(task) = self.refresh_task.lock().take() {
            task.abort();
        }
        self.snapshot().await?;
        info!("platform closed");
        Ok(())
    }

    /// Select the active instrument and return its current quote.
    pub fn load_symbol(&self, symbol: &str, timeframe: &str) -> Result<Quote> {
        let symbol = symbol.trim().to_ascii_uppercase();
        let quote = self.market.quote_of(&symbol)?;
        let mut session = self.session.write();
        session.asset_type = AssetClass::of(&symbol);
        session.symbol = symbol;
        session.timeframe = timeframe.to_string();
        Ok(quote)
    }

    /// Switch asset class; the session moves to that class's default symbol.
    pub fn change_asset_type(&self, asset_type: AssetClass) -> &'static str {
        let symbol = asset_type.default_symbol();
        let mut session = self.session.write();
        session.asset_type = asset_type;
        session.symbol = symbol.to_string();
        symbol
    }

    pub fn session(&self) -> Session {
        self.session.read().clone()
    }

    /// Apply an order and persist the result. Mutation, transaction append,
    /// and valuation happen under one write lock; the snapshot is taken from
    /// the same committed state.
    pub async fn execute_trade(
        &self,
        symbol: &str,
        side: Side,
        quantity: u32,
        order_type: OrderType,
    ) -> Result<TradeOutcome> {
        let (transaction, val, portfolio) = {
            let mut ledger = self.ledger.write();
            let transaction =
                ledger.apply_order(self.market.as_ref(), symbol, side, quantity, order_type)?;
            let val = valuation::valuate(ledger.portfolio(), self.market.as_ref())?;
            (transaction, val, ledger.portfolio().clone())
        };

        let model = self.model.read().clone();
        self.store.save(&portfolio, &model).await?;

        Ok(TradeOutcome {
            transaction,
            valuation: val,
        })
    }

    /// Run a backtest. Training is NOT implied: feed the returned report to
    /// [`train_from_report`](Self::train_from_report) if the model should
    /// learn from it.
    pub fn run_backtest(&self, params: &BacktestParams, seed: Option<u64>) -> Result<BacktestReport> {
        let mut runner = match seed {
            Some(s) => BacktestRunner::with_seed(s),
            None => BacktestRunner::new(),
        };
        runner.run(params)
    }

    /// Explicit trainer feedback step; persists the updated model.
    pub async fn train_from_report(&self, report: &BacktestReport) -> Result<AiModel> {
        let snapshot = {
            let mut model = self.model.write();
            model.train(report);
            model.clone()
        };
        self.snapshot().await?;
        Ok(snapshot)
    }

    /// Manual model retraining; persists the updated model.
    pub async fn retrain_model(&self) -> Result<AiModel> {
        let snapshot = {
            let mut model = self.model.write();
            model.retrain(&mut self.rng.lock());
            model.clone()
        };
        self.snapshot().await?;
        Ok(snapshot)
    }

    /// Fresh predictions over the standard universe.
    pub fn predictions(&self) -> Vec<Prediction> {
        let symbols: Vec<String> = PREDICTION_UNIVERSE.iter().map(|s| s.to_string()).collect();
        self.model
            .write()
            .generate_predictions(&symbols, &mut self.rng.lock())
    }

    /// Simulated headlines with their sentiment tally.
    pub fn news(&self) -> (Vec<NewsItem>, SentimentSummary) {
        let items = news::simulated_headlines(&mut self.rng.lock());
        let summary = news::sentiment_summary(&items);
        (items, summary)
    }

    /// Current point-in-time valuation of the book.
    pub fn valuation(&self) -> Result<PortfolioValuation> {
        valuation::valuate(self.ledger.read().portfolio(), self.market.as_ref())
    }

    pub fn portfolio_snapshot(&self) -> Portfolio {
        self.ledger.read().portfolio().clone()
    }

    pub fn model_snapshot(&self) -> AiModel {
        self.model.read().clone()
    }

    /// Wipe persisted and in-memory state back to a fresh book.
    pub async fn reset(&self) -> Result<()> {
        *self.ledger.write() = Ledger::new(self.config.trading.starting_cash);
        *self.model.write() = AiModel::default();
        self.snapshot().await?;
        warn!("portfolio and model state reset");
        Ok(())
    }

    async fn snapshot(&self) -> Result<()> {
        let portfolio = self.ledger.read().portfolio().clone();
        let model = self.model.read().clone();
        self.store.save(&portfolio, &model).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backtest::Strategy;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn test_config(dir: &std::path::Path) -> Config {
        let mut config = Config::default();
        config.storage.state_dir = dir.to_string_lossy().into_owned();
        config.market.seed = Some(42);
        // Unroutable endpoint: live fetches fail fast and fall back to
        // synthetic quotes.
        config.market.binance_url = "http://127.0.0.1:9".to_string();
        config.market.request_timeout_secs = 1;
        config
    }

    #[tokio::test]
    async fn test_trade_commits_and_persists_atomically() {
        let dir = tempfile::tempdir().unwrap();
        let platform = Platform::new(test_config(dir.path())).unwrap();

        let outcome = platform
            .execute_trade("AAPL", Side::Buy, 10, OrderType::Market)
            .await
            .unwrap();

        // The valuation was refreshed against the same committed state.
        assert_eq!(outcome.valuation.cash, platform.portfolio_snapshot().cash);
        assert_eq!(outcome.valuation.positions.len(), 1);
        assert_eq!(outcome.transaction.quantity, 10);

        // A second platform over the same state dir sees the committed book.
        let resumed = Platform::new(test_config(dir.path())).unwrap();
        resumed.open().await.unwrap();
        let portfolio = resumed.portfolio_snapshot();
        assert_eq!(portfolio.transactions.len(), 1);
        assert!(portfolio.holding("AAPL").is_some());
        resumed.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_rejected_trade_persists_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let platform = Platform::new(test_config(dir.path())).unwrap();

        let err = platform
            .execute_trade("AAPL", Side::Sell, 1, OrderType::Market)
            .await
            .unwrap_err();
        assert!(err.is_rejection());

        // Nothing was written: a fresh open starts from defaults.
        let resumed = Platform::new(test_config(dir.path())).unwrap();
        let (portfolio, _) = JsonStore::new(dir.path()).load().await;
        assert!(portfolio.is_none());
        assert!(resumed.portfolio_snapshot().transactions.is_empty());
    }

    #[tokio::test]
    async fn test_backtest_training_is_explicit() {
        let dir = tempfile::tempdir().unwrap();
        let platform = Platform::new(test_config(dir.path())).unwrap();

        let params = BacktestParams {
            symbol: "AAPL".to_string(),
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 6, 30).unwrap(),
            capital: dec!(50000),
            strategy: Strategy::Momentum,
            timeframe: "1d".to_string(),
        };

        let before = platform.model_snapshot();
        let report = platform.run_backtest(&params, Some(9)).unwrap();
        // Running alone must not touch the model.
        assert_eq!(platform.model_snapshot(), before);

        let after = platform.train_from_report(&report).await.unwrap();
        assert_eq!(after.learning_history.len(), before.learning_history.len() + 1);
        assert!(after.iterations >= before.iterations);
    }

    #[tokio::test]
    async fn test_retrain_persists_model() {
        let dir = tempfile::tempdir().unwrap();
        let platform = Platform::new(test_config(dir.path())).unwrap();

        let updated = platform.retrain_model().await.unwrap();
        assert_eq!(updated.iterations, AiModel::default().iterations + 500);

        let (_, model) = JsonStore::new(dir.path()).load().await;
        assert_eq!(model.unwrap().iterations, updated.iterations);
    }

    #[tokio::test]
    async fn test_session_tracking() {
        let dir = tempfile::tempdir().unwrap();
        let platform = Platform::new(test_config(dir.path())).unwrap();

        let quote = platform.load_symbol("btcusdt", "4H").unwrap();
        assert!(quote.price > dec!(0));
        let session = platform.session();
        assert_eq!(session.symbol, "BTCUSDT");
        assert_eq!(session.timeframe, "4H");
        assert_eq!(session.asset_type, AssetClass::Crypto);

        let symbol = platform.change_asset_type(AssetClass::Stocks);
        assert_eq!(symbol, "AAPL");
        assert_eq!(platform.session().symbol, "AAPL");
    }

    #[tokio::test]
    async fn test_reset_restores_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let platform = Platform::new(test_config(dir.path())).unwrap();

        platform
            .execute_trade("MSFT", Side::Buy, 2, OrderType::Market)
            .await
            .unwrap();
        platform.reset().await.unwrap();

        let portfolio = platform.portfolio_snapshot();
        assert!(portfolio.transactions.is_empty());
        assert_eq!(portfolio.cash, dec!(100000));

        let (saved, _) = JsonStore::new(dir.path()).load().await;
        assert!(saved.unwrap().transactions.is_empty());
    }
}
