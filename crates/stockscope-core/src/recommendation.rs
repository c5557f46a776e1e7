use crate::{Quote, Recommendation, Signal, TechnicalIndicators, Trend};

pub const MIXED_SIGNALS: &str = "Mixed signals suggest holding position.";

const OVERSOLD_RSI: f64 = 30.0;
const OVERBOUGHT_RSI: f64 = 70.0;
const MOMENTUM_PERCENT: f64 = 2.0;
const HIGH_VOLUME: u64 = 1_000_000;
const ACTION_SCORE: f64 = 2.0;
const BASE_CONFIDENCE: f64 = 60.0;
const MAX_CONFIDENCE: f64 = 85.0;

/// Heuristic BUY/SELL/HOLD from the latest quote and indicators.
pub fn score(quote: &Quote, indicators: &TechnicalIndicators) -> Signal {
    let mut score = 0.0;
    let mut reasons = Vec::new();

    if indicators.rsi < OVERSOLD_RSI {
        score += 2.0;
        reasons.push("RSI indicates oversold conditions");
    } else if indicators.rsi > OVERBOUGHT_RSI {
        score -= 2.0;
        reasons.push("RSI indicates overbought conditions");
    }

    match indicators.trend {
        Trend::Bullish => {
            score += 1.0;
            reasons.push("Bullish price trend detected");
        }
        Trend::Bearish => {
            score -= 1.0;
            reasons.push("Bearish price trend detected");
        }
        Trend::Neutral => {}
    }

    let change_percent = quote.change_percent.value();
    if change_percent > MOMENTUM_PERCENT {
        score += 1.0;
        reasons.push("Strong positive momentum");
    } else if change_percent < -MOMENTUM_PERCENT {
        score -= 1.0;
        reasons.push("Negative momentum observed");
    }

    if quote.volume > HIGH_VOLUME {
        score += 0.5;
        reasons.push("High trading volume indicates interest");
    }

    let (recommendation, confidence) = if score >= ACTION_SCORE {
        (Recommendation::Buy, action_confidence(score))
    } else if score <= -ACTION_SCORE {
        (Recommendation::Sell, action_confidence(score))
    } else {
        (Recommendation::Hold, BASE_CONFIDENCE)
    };

    let reasoning = if reasons.is_empty() {
        MIXED_SIGNALS.to_owned()
    } else {
        format!("{}.", reasons.join(". "))
    };

    Signal {
        recommendation,
        confidence,
        reasoning,
    }
}

fn action_confidence(score: f64) -> f64 {
    (BASE_CONFIDENCE + 5.0 * score.abs()).min(MAX_CONFIDENCE)
}
