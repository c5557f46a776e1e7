use std::sync::Arc;
use std::time::Duration;

use time::OffsetDateTime;
use tracing::{debug, warn};

use crate::adapters::{FetchFailure, HistoryProvider};
use crate::routing::QuoteChain;
use crate::synthetic::{SyntheticMarket, DEFAULT_ANCHOR_PRICE};
use crate::{AnalysisError, HistoricalSeries, ProviderId, Symbol};

pub const DEFAULT_HISTORY_DAYS: usize = 30;

/// A series and where it came from.
#[derive(Debug, Clone)]
pub struct HistoryRoute {
    pub series: HistoricalSeries,
    pub source: ProviderId,
    pub failures: Vec<FetchFailure>,
}

impl HistoryRoute {
    pub fn is_simulated(&self) -> bool {
        !self.source.is_upstream()
    }
}

/// Daily closes from upstream providers, synthesized when none deliver.
pub struct HistoryFetcher {
    providers: Vec<Arc<dyn HistoryProvider>>,
    synthetic: Arc<SyntheticMarket>,
    timeout: Duration,
}

impl HistoryFetcher {
    pub fn new(
        providers: Vec<Arc<dyn HistoryProvider>>,
        synthetic: Arc<SyntheticMarket>,
        timeout: Duration,
    ) -> Self {
        Self {
            providers,
            synthetic,
            timeout,
        }
    }

    pub fn providers(&self) -> Vec<ProviderId> {
        self.providers.iter().map(|provider| provider.id()).collect()
    }

    /// Tries each provider in turn. A provider that returns fewer than
    /// `days` points counts as having no data.
    pub async fn fetch_upstream(
        &self,
        symbol: &Symbol,
        days: usize,
    ) -> Result<(HistoricalSeries, ProviderId), Vec<FetchFailure>> {
        let mut failures = Vec::new();

        for provider in &self.providers {
            let id = provider.id();
            debug!(provider = %id, %symbol, days, "requesting history");

            let outcome = tokio::time::timeout(self.timeout, provider.fetch_history(symbol, days))
                .await
                .unwrap_or_else(|_| Err(FetchFailure::timed_out(id, self.timeout)));

            match outcome {
                Ok(series) if series.len() >= days => return Ok((series, id)),
                Ok(series) => failures.push(FetchFailure::no_data(
                    id,
                    format!("only {} of {days} daily closes available", series.len()),
                )),
                Err(failure) => {
                    debug!(
                        provider = %id,
                        %symbol,
                        code = failure.code(),
                        error = %failure.message(),
                        "history provider failed"
                    );
                    failures.push(failure);
                }
            }
        }

        Err(failures)
    }

    /// Synthetic series around `anchor`, or around a fixed default price.
    pub fn synthesize(
        &self,
        days: usize,
        anchor: Option<f64>,
    ) -> Result<HistoricalSeries, AnalysisError> {
        let anchor = anchor
            .filter(|price| price.is_finite() && *price > 0.0)
            .unwrap_or(DEFAULT_ANCHOR_PRICE);
        let today = OffsetDateTime::now_utc().date();

        self.synthetic
            .series(days, anchor, today)
            .map_err(|err| AnalysisError::internal(format!("synthetic history: {err}")))
    }

    /// Upstream history, falling back to a series anchored on the current quote.
    pub async fn fetch(
        &self,
        symbol: &Symbol,
        days: usize,
        quotes: &QuoteChain,
    ) -> Result<HistoryRoute, AnalysisError> {
        let failures = match self.fetch_upstream(symbol, days).await {
            Ok((series, source)) => {
                return Ok(HistoryRoute {
                    series,
                    source,
                    failures: Vec::new(),
                })
            }
            Err(failures) => failures,
        };

        let anchor = match quotes.fetch(symbol).await {
            Ok(route) => Some(route.quote.price),
            Err(err) => {
                warn!(%symbol, error = %err, "no anchor quote, using default price");
                None
            }
        };
        warn!(
            %symbol,
            attempted = failures.len(),
            "history unavailable upstream, using simulated series"
        );

        Ok(HistoryRoute {
            series: self.synthesize(days, anchor)?,
            source: ProviderId::Simulated,
            failures,
        })
    }
}

impl std::fmt::Debug for HistoryFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoryFetcher")
            .field("providers", &self.providers())
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}
