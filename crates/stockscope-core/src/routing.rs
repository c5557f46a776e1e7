use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::adapters::{FetchFailure, QuoteProvider};
use crate::synthetic::SyntheticMarket;
use crate::{AnalysisError, ProviderId, Quote, Symbol};

/// Outcome of one pass through the quote chain.
#[derive(Debug, Clone)]
pub struct QuoteRoute {
    pub quote: Quote,
    pub selected_source: ProviderId,
    /// Every provider tried, in order, ending with the one selected.
    pub source_chain: Vec<ProviderId>,
    pub failures: Vec<FetchFailure>,
    pub latency_ms: u64,
}

impl QuoteRoute {
    pub fn is_simulated(&self) -> bool {
        !self.selected_source.is_upstream()
    }
}

/// Ordered quote providers with a simulated quote as the last resort.
pub struct QuoteChain {
    providers: Vec<Arc<dyn QuoteProvider>>,
    synthetic: Arc<SyntheticMarket>,
    timeout: Duration,
}

impl QuoteChain {
    pub fn new(
        providers: Vec<Arc<dyn QuoteProvider>>,
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

    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// First successful upstream quote, or a simulated one.
    ///
    /// Upstream failures never surface as errors; the only error is an
    /// internal fault while building the simulated quote.
    pub async fn fetch(&self, symbol: &Symbol) -> Result<QuoteRoute, AnalysisError> {
        let started = Instant::now();
        let mut source_chain = Vec::with_capacity(self.providers.len() + 1);
        let mut failures = Vec::new();

        for provider in &self.providers {
            let id = provider.id();
            source_chain.push(id);
            debug!(provider = %id, %symbol, "requesting quote");

            let outcome = tokio::time::timeout(self.timeout, provider.fetch_quote(symbol))
                .await
                .unwrap_or_else(|_| Err(FetchFailure::timed_out(id, self.timeout)));

            match outcome {
                Ok(quote) => {
                    debug!(provider = %id, %symbol, price = quote.price, "quote received");
                    return Ok(QuoteRoute {
                        quote,
                        selected_source: id,
                        source_chain,
                        failures,
                        latency_ms: elapsed_ms(started),
                    });
                }
                Err(failure) => {
                    debug!(
                        provider = %id,
                        %symbol,
                        code = failure.code(),
                        error = %failure.message(),
                        "quote provider failed"
                    );
                    failures.push(failure);
                }
            }
        }

        warn!(
            %symbol,
            attempted = source_chain.len(),
            "all quote providers failed, using simulated quote"
        );
        let quote = self
            .synthetic
            .quote(symbol)
            .map_err(|err| {
                AnalysisError::internal(format!("simulated quote for {symbol}: {err}"))
            })?;
        source_chain.push(ProviderId::Simulated);

        Ok(QuoteRoute {
            quote,
            selected_source: ProviderId::Simulated,
            source_chain,
            failures,
            latency_ms: elapsed_ms(started),
        })
    }
}

impl std::fmt::Debug for QuoteChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuoteChain")
            .field("providers", &self.providers())
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::adapters::{FailureKind, ProviderFuture};
    use crate::{ChangePercent, QuoteDraft};
    use time::macros::datetime;

    struct Fixed {
        id: ProviderId,
        outcome: Result<f64, FailureKind>,
        calls: AtomicUsize,
    }

    impl Fixed {
        fn new(id: ProviderId, outcome: Result<f64, FailureKind>) -> Arc<Self> {
            Arc::new(Self {
                id,
                outcome,
                calls: AtomicUsize::new(0),
            })
        }
    }

    impl QuoteProvider for Fixed {
        fn id(&self) -> ProviderId {
            self.id
        }

        fn fetch_quote<'a>(&'a self, symbol: &'a Symbol) -> ProviderFuture<'a, Quote> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Box::pin(async move {
                match self.outcome {
                    Ok(price) => Ok(QuoteDraft {
                        symbol: symbol.clone(),
                        price,
                        change: 0.0,
                        change_percent: ChangePercent::default(),
                        volume: 1,
                        high: price,
                        low: price,
                        open: price,
                        previous_close: price,
                        as_of: datetime!(2024-03-05 16:00 UTC),
                        market_status: None,
                        source: self.id,
                    }
                    .build()
                    .expect("valid draft")),
                    Err(kind) => Err(FetchFailure::new(kind, self.id, "scripted failure")),
                }
            })
        }
    }

    struct Stalled;

    impl QuoteProvider for Stalled {
        fn id(&self) -> ProviderId {
            ProviderId::TwelveData
        }

        fn fetch_quote<'a>(&'a self, _symbol: &'a Symbol) -> ProviderFuture<'a, Quote> {
            Box::pin(std::future::pending())
        }
    }

    fn chain(providers: Vec<Arc<dyn QuoteProvider>>) -> QuoteChain {
        QuoteChain::new(
            providers,
            Arc::new(SyntheticMarket::seeded(9)),
            Duration::from_secs(5),
        )
    }

    fn aapl() -> Symbol {
        Symbol::parse("AAPL").expect("valid symbol")
    }

    #[tokio::test]
    async fn stops_at_first_successful_provider() {
        let first = Fixed::new(ProviderId::TwelveData, Err(FailureKind::RateLimited));
        let second = Fixed::new(ProviderId::Yahoo, Ok(170.0));
        let third = Fixed::new(ProviderId::Finnhub, Ok(171.0));
        let chain = chain(vec![first.clone(), second.clone(), third.clone()]);

        let route = chain.fetch(&aapl()).await.expect("route");

        assert_eq!(route.selected_source, ProviderId::Yahoo);
        assert_eq!(route.quote.price, 170.0);
        assert_eq!(route.source_chain, vec![ProviderId::TwelveData, ProviderId::Yahoo]);
        assert_eq!(route.failures.len(), 1);
        assert_eq!(route.failures[0].kind(), FailureKind::RateLimited);
        assert_eq!(third.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn every_failure_kind_falls_through_to_simulated_quote() {
        let chain = chain(vec![
            Fixed::new(ProviderId::TwelveData, Err(FailureKind::NoData)),
            Fixed::new(ProviderId::AlphaVantage, Err(FailureKind::MalformedResponse)),
            Fixed::new(ProviderId::Yahoo, Err(FailureKind::ProviderError)),
            Fixed::new(ProviderId::Finnhub, Err(FailureKind::RateLimited)),
        ]);

        let route = chain.fetch(&aapl()).await.expect("route never fails");

        assert!(route.is_simulated());
        assert!(route.quote.last_updated.contains("Simulated"));
        assert_eq!(route.failures.len(), 4);
        assert_eq!(route.source_chain.last(), Some(&ProviderId::Simulated));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_provider_is_abandoned_after_timeout() {
        let backup = Fixed::new(ProviderId::Yahoo, Ok(99.5));
        let chain = chain(vec![Arc::new(Stalled), backup]);

        let route = chain.fetch(&aapl()).await.expect("route");

        assert_eq!(route.selected_source, ProviderId::Yahoo);
        assert_eq!(route.failures[0].kind(), FailureKind::ProviderError);
        assert!(route.failures[0].message().contains("5000 ms"));
    }

    #[tokio::test]
    async fn empty_chain_goes_straight_to_simulation() {
        let route = chain(Vec::new()).fetch(&aapl()).await.expect("route");

        assert_eq!(route.source_chain, vec![ProviderId::Simulated]);
        assert!(route.failures.is_empty());
    }
}
