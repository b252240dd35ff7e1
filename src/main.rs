//! Paper-trading platform CLI
//!
//! Thin front-end over the platform facade: each subcommand maps onto one
//! session operation plus a printout.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use papertrade::{
    backtest::{BacktestParams, Strategy},
    config::Config,
    platform::Platform,
    types::{OrderType, Side},
};
use rust_decimal::Decimal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "papertrade")]
#[command(about = "Paper-trading portfolio and backtest simulator")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Show portfolio valuation and model stats
    Status,
    /// Execute a paper trade
    Trade {
        symbol: String,
        /// buy or sell
        side: String,
        quantity: u32,
        /// market, limit, or stop (limit/stop fill at the current quote)
        #[arg(long, default_value = "market")]
        order_type: String,
    },
    /// Run a backtest simulation
    Backtest {
        symbol: String,
        #[arg(long)]
        start: NaiveDate,
        #[arg(long)]
        end: NaiveDate,
        #[arg(long, default_value = "100000")]
        capital: Decimal,
        #[arg(long, default_value = "ai-ensemble")]
        strategy: String,
        #[arg(long, default_value = "1d")]
        timeframe: String,
        /// Seed for a reproducible run
        #[arg(long)]
        seed: Option<u64>,
        /// Skip feeding the report to the model trainer
        #[arg(long)]
        no_train: bool,
    },
    /// Generate AI predictions for the standard universe
    Predict,
    /// Retrain the model
    Retrain,
    /// Show simulated headlines and market sentiment
    News,
    /// Keep the platform open with live quote refresh until Ctrl+C
    Watch,
    /// Wipe portfolio and model state back to defaults
    Reset,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = Config::load(&cli.config)?;

    match cli.command {
        Commands::Status => status(config).await,
        Commands::Trade {
            symbol,
            side,
            quantity,
            order_type,
        } => trade(config, &symbol, &side, quantity, &order_type).await,
        Commands::Backtest {
            symbol,
            start,
            end,
            capital,
            strategy,
            timeframe,
            seed,
            no_train,
        } => {
            backtest(
                config, &symbol, start, end, capital, &strategy, &timeframe, seed, no_train,
            )
            .await
        }
        Commands::Predict => predict(config).await,
        Commands::Retrain => retrain(config).await,
        Commands::News => news(config),
        Commands::Watch => watch(config).await,
        Commands::Reset => reset(config).await,
    }
}

async fn status(config: Config) -> anyhow::Result<()> {
    let platform = Platform::new(config)?;
    platform.open().await?;

    let valuation = platform.valuation()?;
    println!("Cash:         ${}", valuation.cash.round_dp(2));
    println!("Total value:  ${}", valuation.total_value.round_dp(2));
    println!(
        "Total P&L:    ${} ({}%)",
        valuation.total_pl.round_dp(2),
        valuation.total_pl_percent.round_dp(2)
    );
    for p in &valuation.positions {
        println!(
            "  {:<8} {:>6} @ ${:<10} now ${:<10} P&L ${} ({}%)",
            p.symbol,
            p.shares,
            p.average_cost.round_dp(2),
            p.last_price.round_dp(2),
            p.unrealized_pl.round_dp(2),
            p.unrealized_pl_percent.round_dp(2)
        );
    }

    let model = platform.model_snapshot();
    println!(
        "Model: accuracy {}%  level {}  ({} iterations, {} predictions)",
        model.accuracy.round_dp(1),
        model.level(),
        model.iterations,
        model.predictions_made
    );

    platform.close().await?;
    Ok(())
}

async fn trade(
    config: Config,
    symbol: &str,
    side: &str,
    quantity: u32,
    order_type: &str,
) -> anyhow::Result<()> {
    let side = match side.to_ascii_lowercase().as_str() {
        "buy" => Side::Buy,
        "sell" => Side::Sell,
        other => anyhow::bail!("side must be buy or sell, got '{other}'"),
    };
    let order_type = match order_type.to_ascii_lowercase().as_str() {
        "market" => OrderType::Market,
        "limit" => OrderType::Limit,
        "stop" => OrderType::Stop,
        other => anyhow::bail!("order type must be market, limit, or stop, got '{other}'"),
    };

    let platform = Platform::new(config)?;
    platform.open().await?;

    match platform.execute_trade(symbol, side, quantity, order_type).await {
        Ok(outcome) => {
            let tx = &outcome.transaction;
            println!(
                "{} {} {} @ ${} (total ${})",
                tx.side,
                tx.quantity,
                tx.symbol,
                tx.price.round_dp(2),
                tx.total.round_dp(2)
            );
            println!(
                "Cash ${}  portfolio ${}",
                outcome.valuation.cash.round_dp(2),
                outcome.valuation.total_value.round_dp(2)
            );
        }
        Err(e) if e.is_rejection() => println!("Order rejected: {e}"),
        Err(e) => return Err(e.into()),
    }

    platform.close().await?;
    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn backtest(
    config: Config,
    symbol: &str,
    start: NaiveDate,
    end: NaiveDate,
    capital: Decimal,
    strategy: &str,
    timeframe: &str,
    seed: Option<u64>,
    no_train: bool,
) -> anyhow::Result<()> {
    let strategy: Strategy = strategy.parse()?;
    let train = config.model.train_on_backtest && !no_train;
    let platform = Platform::new(config)?;
    platform.open().await?;

    let params = BacktestParams {
        symbol: symbol.to_string(),
        start_date: start,
        end_date: end,
        capital,
        strategy,
        timeframe: timeframe.to_string(),
    };
    let report = platform.run_backtest(&params, seed)?;

    println!("Backtest: {} ({})", report.symbol, report.strategy);
    println!(
        "  Return:        {}%  (final ${})",
        report.total_return_pct, report.final_capital
    );
    println!("  Sharpe:        {}", report.sharpe_ratio);
    println!("  Max drawdown:  {}%", report.max_drawdown_pct);
    println!(
        "  Win rate:      {}%  ({} trades: {} wins / {} losses)",
        report.win_rate_pct, report.num_trades, report.wins, report.losses
    );
    match report.profit_factor {
        Some(pf) => println!("  Profit factor: {pf}"),
        None => println!("  Profit factor: n/a (no losing trades)"),
    }
    println!("  Equity curve:  {} points", report.equity_curve.len());

    if train {
        let model = platform.train_from_report(&report).await?;
        println!(
            "Model trained: accuracy {}%  level {}",
            model.accuracy.round_dp(1),
            model.level()
        );
    }

    platform.close().await?;
    Ok(())
}

async fn predict(config: Config) -> anyhow::Result<()> {
    let platform = Platform::new(config)?;
    platform.open().await?;

    for p in platform.predictions() {
        println!(
            "{:<8} {:?}  confidence {}%  ${} -> ${}  ({})",
            p.symbol, p.direction, p.confidence, p.current_price, p.target_price, p.timeframe
        );
        for reason in &p.reasoning {
            println!("    - {reason}");
        }
    }

    platform.close().await?;
    Ok(())
}

async fn retrain(config: Config) -> anyhow::Result<()> {
    let platform = Platform::new(config)?;
    platform.open().await?;

    let model = platform.retrain_model().await?;
    println!(
        "Model retrained: accuracy {}%  level {}  ({} iterations)",
        model.accuracy.round_dp(1),
        model.level(),
        model.iterations
    );

    platform.close().await?;
    Ok(())
}

fn news(config: Config) -> anyhow::Result<()> {
    let platform = Platform::new(config)?;
    let (items, summary) = platform.news();

    for n in &items {
        println!(
            "[{:?}] {} ({} - {}m ago)",
            n.sentiment, n.title, n.source, n.minutes_ago
        );
    }
    println!(
        "Sentiment: {}% positive / {}% neutral / {}% negative -> {:?}",
        summary.positive_pct,
        summary.neutral_pct,
        summary.negative_pct,
        summary.mood()
    );
    Ok(())
}

async fn watch(config: Config) -> anyhow::Result<()> {
    let platform = Platform::new(config)?;
    platform.open().await?;
    println!("Platform open, refreshing quotes. Ctrl+C to close.");

    tokio::signal::ctrl_c().await?;
    platform.close().await?;
    println!("Closed.");
    Ok(())
}

async fn reset(config: Config) -> anyhow::Result<()> {
    let platform = Platform::new(config)?;
    platform.reset().await?;
    println!("Portfolio and model state reset to defaults.");
    Ok(())
}
