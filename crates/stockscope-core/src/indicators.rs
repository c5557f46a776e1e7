//! Technical indicators over a daily close series.
//!
//! All functions are pure and degrade to neutral values on short input
//! instead of failing.

use crate::{round2, HistoricalSeries, TechnicalIndicators, Trend};

pub const RSI_PERIOD: usize = 14;
pub const NEUTRAL_RSI: f64 = 50.0;
const TREND_WINDOW: usize = 5;
const TREND_THRESHOLD: f64 = 0.02;
const LEVEL_WINDOW: usize = 20;

/// Relative Strength Index over the last `period` day-over-day moves.
///
/// Returns 50 when fewer than `period + 1` prices exist and 100 when the
/// window has no losses.
pub fn rsi(prices: &[f64], period: usize) -> f64 {
    if period == 0 || prices.len() < period + 1 {
        return NEUTRAL_RSI;
    }

    let window = &prices[prices.len() - (period + 1)..];
    let (gains, losses) = window
        .windows(2)
        .map(|pair| pair[1] - pair[0])
        .fold((0.0, 0.0), |(gains, losses), delta| {
            if delta > 0.0 {
                (gains + delta, losses)
            } else {
                (gains, losses - delta)
            }
        });

    let period = period as f64;
    let avg_gain = gains / period;
    let avg_loss = losses / period;
    if avg_loss == 0.0 {
        return 100.0;
    }

    let rs = avg_gain / avg_loss;
    round2(100.0 - 100.0 / (1.0 + rs))
}

/// Mean of the last five closes against the five before them.
pub fn trend(prices: &[f64]) -> Trend {
    if prices.len() < TREND_WINDOW * 2 {
        return Trend::Neutral;
    }

    let recent = mean(&prices[prices.len() - TREND_WINDOW..]);
    let older = mean(&prices[prices.len() - TREND_WINDOW * 2..prices.len() - TREND_WINDOW]);

    if recent > older * (1.0 + TREND_THRESHOLD) {
        Trend::Bullish
    } else if recent < older * (1.0 - TREND_THRESHOLD) {
        Trend::Bearish
    } else {
        Trend::Neutral
    }
}

/// `(support, resistance)`: min and max of the last 20 closes, `None` when empty.
pub fn support_resistance(prices: &[f64]) -> Option<(f64, f64)> {
    let window = &prices[prices.len().saturating_sub(LEVEL_WINDOW)..];
    let support = window.iter().copied().reduce(f64::min)?;
    let resistance = window.iter().copied().reduce(f64::max)?;
    Some((round2(support), round2(resistance)))
}

impl TechnicalIndicators {
    /// `None` for an empty series.
    pub fn from_series(series: &HistoricalSeries) -> Option<Self> {
        let prices = series.prices();
        let (support, resistance) = support_resistance(&prices)?;

        Some(Self {
            rsi: rsi(&prices, RSI_PERIOD),
            trend: trend(&prices),
            support,
            resistance,
        })
    }
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}
