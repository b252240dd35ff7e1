//! Backtest simulator
//!
//! A stochastic model of a strategy's performance over a date range, not a
//! replay of historical prices: trade count, win rate, and per-trade averages
//! are drawn from calibrated ranges and combined additively. The runner owns
//! its RNG and can be seeded, so a given (seed, params) pair always produces
//! the same report.
//!
//! Running a backtest never touches the live ledger or the AI model; feeding
//! the report to the trainer is an explicit, separate call.

use crate::error::{Error, Result};
use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::info;

/// Strategy label attached to a simulated run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    AiEnsemble,
    Momentum,
    MeanReversion,
    Breakout,
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Strategy::AiEnsemble => write!(f, "ai-ensemble"),
            Strategy::Momentum => write!(f, "momentum"),
            Strategy::MeanReversion => write!(f, "mean-reversion"),
            Strategy::Breakout => write!(f, "breakout"),
        }
    }
}

impl FromStr for Strategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "ai-ensemble" | "ai" => Ok(Strategy::AiEnsemble),
            "momentum" => Ok(Strategy::Momentum),
            "mean-reversion" => Ok(Strategy::MeanReversion),
            "breakout" => Ok(Strategy::Breakout),
            other => Err(Error::InvalidBacktestParams(format!(
                "unknown strategy '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestParams {
    pub symbol: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub capital: Decimal,
    pub strategy: Strategy,
    pub timeframe: String,
}

/// Result of one simulated run. Created fresh per invocation, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestReport {
    pub symbol: String,
    pub strategy: Strategy,
    pub total_return_pct: Decimal,
    pub final_capital: Decimal,
    pub sharpe_ratio: Decimal,
    pub max_drawdown_pct: Decimal,
    pub win_rate_pct: Decimal,
    pub num_trades: u32,
    pub wins: u32,
    pub losses: u32,
    /// Gross winning amount over gross losing amount. `None` when the run has
    /// no losing trades — the one convention for the zero-loss edge case.
    pub profit_factor: Option<Decimal>,
    /// Portfolio value sampled at up to 50 points across the trade sequence;
    /// always at least one point, and the last sample is the final capital.
    pub equity_curve: Vec<Decimal>,
}

pub struct BacktestRunner {
    rng: StdRng,
}

impl BacktestRunner {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_os_rng(),
        }
    }

    /// Reproducible runs: same seed and params, same report.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn run(&mut self, params: &BacktestParams) -> Result<BacktestReport> {
        if params.symbol.trim().is_empty() {
            return Err(Error::InvalidBacktestParams(
                "symbol must not be empty".into(),
            ));
        }
        if params.start_date > params.end_date {
            return Err(Error::InvalidBacktestParams(format!(
                "start date {} is after end date {}",
                params.start_date, params.end_date
            )));
        }
        if params.capital <= Decimal::ZERO {
            return Err(Error::InvalidBacktestParams(format!(
                "capital must be positive, got {}",
                params.capital
            )));
        }

        let days = (params.end_date - params.start_date).num_days() as u32;
        let num_trades = days / 5 + self.rng.random_range(0..20);
        let win_rate = self.rng.random_range(0.5..0.8);
        let avg_win = self.rng.random_range(0.02..0.05);
        let avg_loss = -self.rng.random_range(0.01..0.03);
        let sharpe = 0.5 + self.rng.random_range(0.0..2.0);
        let max_drawdown = -(5.0 + self.rng.random_range(0.0..15.0));

        let report = build_report(
            params,
            num_trades,
            win_rate,
            avg_win,
            avg_loss,
            sharpe,
            max_drawdown,
            &mut self.rng,
        );

        info!(
            symbol = %report.symbol,
            strategy = %report.strategy,
            trades = report.num_trades,
            return_pct = %report.total_return_pct,
            "backtest complete"
        );
        Ok(report)
    }
}

impl Default for BacktestRunner {
    fn default() -> Self {
        Self::new()
    }
}

/// Assemble a report from drawn statistics. Split out from [`BacktestRunner::run`]
/// so edge cases (zero trades, zero losses) are testable with exact inputs.
#[allow(clippy::too_many_arguments)]
fn build_report(
    params: &BacktestParams,
    num_trades: u32,
    win_rate: f64,
    avg_win: f64,
    avg_loss: f64,
    sharpe: f64,
    max_drawdown: f64,
    rng: &mut StdRng,
) -> BacktestReport {
    let wins = (num_trades as f64 * win_rate).floor() as u32;
    let losses = num_trades - wins;

    // Additive combination across the trade population, not per-trade
    // compounding.
    let total_return = wins as f64 * avg_win + losses as f64 * avg_loss;
    let final_capital = (params.capital * (Decimal::ONE + to_dec(total_return))).round_dp(2);

    let profit_factor = if losses == 0 {
        None
    } else {
        let gross_win = wins as f64 * avg_win.abs();
        let gross_loss = losses as f64 * avg_loss.abs();
        Some(to_dec(gross_win / gross_loss).round_dp(2))
    };

    let equity_curve = equity_curve(params.capital, final_capital, num_trades, total_return, rng);

    BacktestReport {
        symbol: params.symbol.to_ascii_uppercase(),
        strategy: params.strategy,
        total_return_pct: to_dec(total_return * 100.0).round_dp(2),
        final_capital,
        sharpe_ratio: to_dec(sharpe).round_dp(2),
        max_drawdown_pct: to_dec(max_drawdown).round_dp(2),
        win_rate_pct: to_dec(win_rate * 100.0).round_dp(1),
        num_trades,
        wins,
        losses,
        profit_factor,
        equity_curve,
    }
}

/// Sample the simulated portfolio value across the trade sequence: linear
/// trend toward the aggregate return plus ±1% uniform jitter, capped at 50
/// points, closing exactly on the final capital.
fn equity_curve(
    capital: Decimal,
    final_capital: Decimal,
    num_trades: u32,
    total_return: f64,
    rng: &mut StdRng,
) -> Vec<Decimal> {
    let n = num_trades as usize;
    let step = std::cmp::max(1, n.div_ceil(49));
    let denom = n.max(1) as f64;

    let mut curve = Vec::with_capacity(n / step + 1);
    let mut i = 0usize;
    while i < n {
        let progress = i as f64 / denom;
        let noise = (rng.random_range(0.0..1.0) - 0.5) * 0.02;
        let trend = total_return * progress;
        curve.push((capital * (Decimal::ONE + to_dec(trend + noise))).round_dp(2));
        i += step;
    }
    curve.push(final_capital);
    curve
}

fn to_dec(x: f64) -> Decimal {
    Decimal::from_f64(x).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn params() -> BacktestParams {
        BacktestParams {
            symbol: "AAPL".to_string(),
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
            capital: dec!(100000),
            strategy: Strategy::AiEnsemble,
            timeframe: "1d".to_string(),
        }
    }

    #[test]
    fn test_seeded_runs_are_reproducible() {
        let a = BacktestRunner::with_seed(99).run(&params()).unwrap();
        let b = BacktestRunner::with_seed(99).run(&params()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_different_seeds_diverge() {
        let a = BacktestRunner::with_seed(1).run(&params()).unwrap();
        let b = BacktestRunner::with_seed(2).run(&params()).unwrap();
        assert_ne!(a.equity_curve, b.equity_curve);
    }

    #[test]
    fn test_rejects_inverted_date_range() {
        let mut p = params();
        p.start_date = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        p.end_date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let err = BacktestRunner::with_seed(1).run(&p).unwrap_err();
        assert!(matches!(err, Error::InvalidBacktestParams(_)));
    }

    #[test]
    fn test_rejects_non_positive_capital() {
        let mut p = params();
        p.capital = dec!(0);
        let err = BacktestRunner::with_seed(1).run(&p).unwrap_err();
        assert!(matches!(err, Error::InvalidBacktestParams(_)));
    }

    #[test]
    fn test_report_ranges() {
        let report = BacktestRunner::with_seed(7).run(&params()).unwrap();
        assert!(report.win_rate_pct >= dec!(50) && report.win_rate_pct <= dec!(80));
        assert!(report.sharpe_ratio >= dec!(0.5) && report.sharpe_ratio <= dec!(2.5));
        assert!(report.max_drawdown_pct <= dec!(-5) && report.max_drawdown_pct >= dec!(-20));
        assert_eq!(report.wins + report.losses, report.num_trades);
        // 365 days -> at least 73 trades
        assert!(report.num_trades >= 73);
    }

    #[test]
    fn test_equity_curve_bounds_and_terminal_value() {
        let report = BacktestRunner::with_seed(21).run(&params()).unwrap();
        assert!(!report.equity_curve.is_empty());
        assert!(report.equity_curve.len() <= 50);
        assert_eq!(*report.equity_curve.last().unwrap(), report.final_capital);
    }

    #[test]
    fn test_zero_losses_yields_no_profit_factor() {
        let mut rng = StdRng::seed_from_u64(5);
        let report = build_report(&params(), 10, 1.0, 0.03, -0.02, 1.5, -8.0, &mut rng);
        assert_eq!(report.wins, 10);
        assert_eq!(report.losses, 0);
        assert_eq!(report.profit_factor, None);
        assert!(serde_json::to_string(&report)
            .unwrap()
            .contains("\"profit_factor\":null"));
    }

    #[test]
    fn test_zero_trades_produces_flat_single_point_curve() {
        let mut rng = StdRng::seed_from_u64(5);
        let report = build_report(&params(), 0, 0.6, 0.03, -0.02, 1.0, -6.0, &mut rng);
        assert_eq!(report.num_trades, 0);
        assert_eq!(report.equity_curve, vec![dec!(100000.00)]);
        assert_eq!(report.final_capital, dec!(100000.00));
        assert_eq!(report.profit_factor, None);
    }

    #[test]
    fn test_additive_return_arithmetic() {
        let mut rng = StdRng::seed_from_u64(5);
        // 10 trades, 60% win rate -> 6 wins, 4 losses.
        let report = build_report(&params(), 10, 0.6, 0.04, -0.02, 1.0, -6.0, &mut rng);
        assert_eq!(report.wins, 6);
        assert_eq!(report.losses, 4);
        // 6*0.04 + 4*(-0.02) = 0.16
        assert_eq!(report.total_return_pct, dec!(16.00));
        assert_eq!(report.final_capital, dec!(116000.00));
        // 0.24 / 0.08 = 3
        assert_eq!(report.profit_factor, Some(dec!(3.00)));
    }

    #[test]
    fn test_strategy_round_trip() {
        for s in [
            Strategy::AiEnsemble,
            Strategy::Momentum,
            Strategy::MeanReversion,
            Strategy::Breakout,
        ] {
            assert_eq!(s.to_string().parse::<Strategy>().unwrap(), s);
        }
        assert!("hodl".parse::<Strategy>().is_err());
    }
}
