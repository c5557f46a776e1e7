//! Demo data used when every upstream provider has failed.

use std::sync::{Mutex, PoisonError};

use time::{Date, Duration, OffsetDateTime};

use crate::{
    is_us_session, round2, ChangePercent, HistoricalPoint, HistoricalSeries, MarketStatus,
    ProviderId, Quote, QuoteDraft, Symbol, ValidationError, IST,
};

/// Anchor for a synthetic series when no quote price is available.
pub const DEFAULT_ANCHOR_PRICE: f64 = 100.0;

const SERIES_JITTER: f64 = 0.06;
const SESSION_JITTER: f64 = 0.04;
const PREVIOUS_CLOSE_JITTER: f64 = 0.01;
const MIN_VOLUME: u64 = 10_000_000;
const VOLUME_SPAN: u64 = 50_000_000;

/// Approximate price levels for well-known tickers.
pub fn base_price(symbol: &Symbol) -> Option<f64> {
    let price = match symbol.as_str() {
        "AAPL" => 175.0,
        "GOOGL" => 140.0,
        "MSFT" => 380.0,
        "AMZN" => 145.0,
        "TSLA" => 250.0,
        "META" => 500.0,
        "NVDA" => 875.0,
        "NFLX" => 445.0,
        "AMD" => 165.0,
        "INTC" => 45.0,
        _ => return None,
    };
    Some(price)
}

/// Seedable generator for simulated quotes and price series.
#[derive(Debug)]
pub struct SyntheticMarket {
    rng: Mutex<fastrand::Rng>,
}

impl SyntheticMarket {
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(fastrand::Rng::new()),
        }
    }

    /// Reproducible output for a given seed.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(fastrand::Rng::with_seed(seed)),
        }
    }

    fn with_rng<T>(&self, f: impl FnOnce(&mut fastrand::Rng) -> T) -> T {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut rng)
    }

    /// Simulated quote tagged `Simulated Live`.
    ///
    /// During the US session the price moves by up to ±2% at random;
    /// outside it drifts with the wall-clock minute so that repeated
    /// requests look alive without jumping around.
    pub fn quote_at(&self, symbol: &Symbol, now: OffsetDateTime) -> Result<Quote, ValidationError> {
        let (price, previous_close, volume) = self.with_rng(|rng| {
            let base = base_price(symbol).unwrap_or_else(|| 100.0 + rng.f64() * 200.0);
            let variation = if is_us_session(now) {
                (rng.f64() - 0.5) * SESSION_JITTER
            } else {
                let minute = f64::from(now.to_offset(IST).minute());
                (minute / 10.0).sin() * 0.02 * 0.5
            };
            let price = base * (1.0 + variation);
            let previous_close = base * (1.0 + (rng.f64() - 0.5) * PREVIOUS_CLOSE_JITTER);
            let volume = MIN_VOLUME + rng.u64(0..VOLUME_SPAN);
            (price, previous_close, volume)
        });

        QuoteDraft {
            symbol: symbol.clone(),
            price,
            change: price - previous_close,
            change_percent: ChangePercent::between(price, previous_close),
            volume,
            high: round2(price * 1.02),
            low: round2(price * 0.98),
            open: round2(previous_close * 1.005),
            previous_close,
            as_of: now,
            market_status: Some(MarketStatus::at(now)),
            source: ProviderId::Simulated,
        }
        .build()
    }

    pub fn quote(&self, symbol: &Symbol) -> Result<Quote, ValidationError> {
        self.quote_at(symbol, OffsetDateTime::now_utc())
    }

    /// `days` daily points ending at `today`, each within ±3% of `anchor`.
    pub fn series(
        &self,
        days: usize,
        anchor: f64,
        today: Date,
    ) -> Result<HistoricalSeries, ValidationError> {
        if days == 0 {
            return Err(ValidationError::EmptyWindow);
        }
        if !anchor.is_finite() {
            return Err(ValidationError::NonFiniteValue { field: "anchor" });
        }
        let anchor = anchor.max(0.0);

        let points = self.with_rng(|rng| {
            (0..days)
                .rev()
                .filter_map(|offset| {
                    let date = today.checked_sub(Duration::days(i64::try_from(offset).ok()?))?;
                    let variation = (rng.f64() - 0.5) * SERIES_JITTER;
                    Some(HistoricalPoint::new(date, round2(anchor * (1.0 + variation))))
                })
                .collect::<Vec<_>>()
        });

        HistoricalSeries::new(points)
    }
}

impl Default for SyntheticMarket {
    fn default() -> Self {
        Self::new()
    }
}
