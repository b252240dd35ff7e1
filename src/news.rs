//! Simulated market news with sentiment aggregation.
//!
//! Headlines come from a fixed pool with pre-labeled sentiment; only the data
//! side lives here (generation and the sentiment tally), display is someone
//! else's job.

use rand::rngs::StdRng;
use rand::Rng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

/// Overall mood derived from the positive share of headlines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MarketMood {
    Bullish,
    Neutral,
    Bearish,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsItem {
    pub title: String,
    pub sentiment: Sentiment,
    pub symbol: String,
    pub source: String,
    pub minutes_ago: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentSummary {
    pub positive_pct: Decimal,
    pub neutral_pct: Decimal,
    pub negative_pct: Decimal,
}

impl SentimentSummary {
    /// Bullish above 60% positive coverage, bearish below 40%.
    pub fn mood(&self) -> MarketMood {
        if self.positive_pct > Decimal::from(60) {
            MarketMood::Bullish
        } else if self.positive_pct < Decimal::from(40) {
            MarketMood::Bearish
        } else {
            MarketMood::Neutral
        }
    }
}

const HEADLINES: [(&str, Sentiment, &str); 10] = [
    (
        "Tech stocks rally as AI sector shows strong growth",
        Sentiment::Positive,
        "TECH",
    ),
    (
        "Federal Reserve hints at potential rate cuts in 2024",
        Sentiment::Positive,
        "MARKETS",
    ),
    (
        "Bitcoin surges past $50K amid institutional buying",
        Sentiment::Positive,
        "BTC",
    ),
    (
        "Nvidia announces new AI chip breakthrough",
        Sentiment::Positive,
        "NVDA",
    ),
    (
        "Apple unveils new product lineup with strong pre-orders",
        Sentiment::Positive,
        "AAPL",
    ),
    (
        "Energy sector faces headwinds from oversupply concerns",
        Sentiment::Negative,
        "ENERGY",
    ),
    (
        "Market volatility expected ahead of earnings season",
        Sentiment::Neutral,
        "MARKETS",
    ),
    (
        "Ethereum upgrade successfully implemented",
        Sentiment::Positive,
        "ETH",
    ),
    (
        "Tesla reports record quarterly deliveries",
        Sentiment::Positive,
        "TSLA",
    ),
    (
        "Gold prices stabilize amid geopolitical tensions",
        Sentiment::Neutral,
        "GOLD",
    ),
];

const SOURCES: [&str; 5] = ["Reuters", "Bloomberg", "CNBC", "WSJ", "Financial Times"];

/// The full headline pool with randomized age and source attribution.
pub fn simulated_headlines(rng: &mut StdRng) -> Vec<NewsItem> {
    HEADLINES
        .iter()
        .map(|(title, sentiment, symbol)| NewsItem {
            title: title.to_string(),
            sentiment: *sentiment,
            symbol: symbol.to_string(),
            source: SOURCES[rng.random_range(0..SOURCES.len())].to_string(),
            minutes_ago: rng.random_range(0..60),
        })
        .collect()
}

/// Tally sentiment shares across a headline batch.
pub fn sentiment_summary(items: &[NewsItem]) -> SentimentSummary {
    if items.is_empty() {
        return SentimentSummary {
            positive_pct: Decimal::ZERO,
            neutral_pct: Decimal::ZERO,
            negative_pct: Decimal::ZERO,
        };
    }

    let total = Decimal::from(items.len());
    let count = |s: Sentiment| {
        Decimal::from(items.iter().filter(|n| n.sentiment == s).count()) / total
            * Decimal::ONE_HUNDRED
    };

    SentimentSummary {
        positive_pct: count(Sentiment::Positive).round_dp(1),
        neutral_pct: count(Sentiment::Neutral).round_dp(1),
        negative_pct: count(Sentiment::Negative).round_dp(1),
    }
}
