use serde::{Deserialize, Serialize};

use super::{HistoricalSeries, Quote};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Trend {
    Bullish,
    Bearish,
    Neutral,
}

/// Indicators derived from one series; recomputed per analysis, never cached.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TechnicalIndicators {
    pub rsi: f64,
    pub trend: Trend,
    pub support: f64,
    pub resistance: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Recommendation {
    Buy,
    Sell,
    Hold,
}

/// Scorer output.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Signal {
    pub recommendation: Recommendation,
    pub confidence: f64,
    pub reasoning: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StockAnalysis {
    pub quote: Quote,
    pub recommendation: Recommendation,
    pub confidence: f64,
    pub reasoning: String,
    pub technical_indicators: TechnicalIndicators,
    pub historical_data: HistoricalSeries,
}

impl StockAnalysis {
    pub fn assemble(
        quote: Quote,
        indicators: TechnicalIndicators,
        signal: Signal,
        history: HistoricalSeries,
    ) -> Self {
        Self {
            quote,
            recommendation: signal.recommendation,
            confidence: signal.confidence,
            reasoning: signal.reasoning,
            technical_indicators: indicators,
            historical_data: history,
        }
    }
}
