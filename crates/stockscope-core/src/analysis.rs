use std::sync::Arc;

use tracing::{debug, error, instrument, warn};

use crate::adapters::{
    AlphaVantageAdapter, FetchFailure, FinnhubAdapter, HistoryProvider, ProviderTransport,
    QuoteProvider, TwelveDataAdapter, YahooAdapter,
};
use crate::cache::ResponseCache;
use crate::config::ServiceConfig;
use crate::history::{HistoryFetcher, HistoryRoute};
use crate::http_client::{HttpClient, ReqwestHttpClient};
use crate::recommendation;
use crate::routing::{QuoteChain, QuoteRoute};
use crate::synthetic::SyntheticMarket;
use crate::{
    AnalysisError, HistoricalSeries, ProviderId, Quote, StockAnalysis, Symbol, TechnicalIndicators,
};

/// A finished analysis with its provenance.
#[derive(Debug, Clone)]
pub struct AnalysisRoute {
    pub analysis: StockAnalysis,
    /// Quote providers tried, ending with the one that answered.
    pub quote_chain: Vec<ProviderId>,
    pub history_source: ProviderId,
    /// Quote failures first, then history failures.
    pub failures: Vec<FetchFailure>,
}

/// Single entry point: quote + history + indicators + recommendation.
#[derive(Debug)]
pub struct StockAnalyzer {
    quotes: QuoteChain,
    history: HistoryFetcher,
    history_days: usize,
    cache: ResponseCache,
}

impl StockAnalyzer {
    pub fn builder() -> StockAnalyzerBuilder {
        StockAnalyzerBuilder::default()
    }

    /// Analyzer wired from the process environment.
    pub fn from_env() -> Self {
        Self::builder().config(ServiceConfig::from_env()).build()
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    pub fn quote_chain(&self) -> &QuoteChain {
        &self.quotes
    }

    pub const fn history_days(&self) -> usize {
        self.history_days
    }

    /// Full analysis for an untrusted ticker.
    ///
    /// Only a malformed symbol or an internal fault produce an error; upstream
    /// outages degrade to simulated data.
    pub async fn analyze(&self, input: &str) -> Result<StockAnalysis, AnalysisError> {
        self.analyze_route(input).await.map(|route| route.analysis)
    }

    /// [`analyze`](Self::analyze) plus where the quote and the history came from.
    #[instrument(skip(self), fields(symbol = %input.trim()))]
    pub async fn analyze_route(&self, input: &str) -> Result<AnalysisRoute, AnalysisError> {
        let symbol = parse_symbol(input)?;
        let days = self.history_days;

        let (quote, upstream) = tokio::join!(
            self.quotes.fetch(&symbol),
            self.history.fetch_upstream(&symbol, days)
        );
        let quote = quote?;
        debug!(source = %quote.selected_source, latency_ms = quote.latency_ms, "quote resolved");

        let mut failures = quote.failures;
        let (series, history_source) = match upstream {
            Ok((series, source)) => {
                debug!(%source, points = series.len(), "history resolved");
                (series, source)
            }
            Err(history_failures) => {
                warn!(
                    attempted = history_failures.len(),
                    anchor = quote.quote.price,
                    "history unavailable upstream, using simulated series"
                );
                failures.extend(history_failures);
                (
                    self.history.synthesize(days, Some(quote.quote.price))?,
                    ProviderId::Simulated,
                )
            }
        };

        Ok(AnalysisRoute {
            analysis: compose(quote.quote, series)?,
            quote_chain: quote.source_chain,
            history_source,
            failures,
        })
    }

    /// Quote only, with routing details.
    pub async fn quote(&self, input: &str) -> Result<QuoteRoute, AnalysisError> {
        let symbol = parse_symbol(input)?;
        self.quotes.fetch(&symbol).await
    }

    /// Daily history only; `days` defaults to the configured window.
    pub async fn history(
        &self,
        input: &str,
        days: Option<usize>,
    ) -> Result<HistoryRoute, AnalysisError> {
        let symbol = parse_symbol(input)?;
        let days = days.unwrap_or(self.history_days);
        self.history.fetch(&symbol, days, &self.quotes).await
    }
}

fn parse_symbol(input: &str) -> Result<Symbol, AnalysisError> {
    Symbol::parse(input).map_err(|reason| AnalysisError::invalid_symbol(input, reason))
}

/// Indicators and scoring over an already fetched quote and series.
pub fn compose(quote: Quote, series: HistoricalSeries) -> Result<StockAnalysis, AnalysisError> {
    let Some(indicators) = TechnicalIndicators::from_series(&series) else {
        error!(symbol = %quote.symbol, "cannot derive indicators from an empty series");
        return Err(AnalysisError::internal(format!(
            "no price history for {}",
            quote.symbol
        )));
    };

    let signal = recommendation::score(&quote, &indicators);
    let values = [
        indicators.rsi,
        indicators.support,
        indicators.resistance,
        signal.confidence,
    ];
    if values.iter().any(|value| !value.is_finite()) {
        error!(
            symbol = %quote.symbol,
            ?indicators,
            confidence = signal.confidence,
            "non-finite analysis output"
        );
        return Err(AnalysisError::internal(format!(
            "non-finite indicator output for {}",
            quote.symbol
        )));
    }

    Ok(StockAnalysis::assemble(quote, indicators, signal, series))
}

/// Wires providers, cache and the synthetic generator into a [`StockAnalyzer`].
#[derive(Default)]
pub struct StockAnalyzerBuilder {
    config: ServiceConfig,
    http_client: Option<Arc<dyn HttpClient>>,
    cache: Option<ResponseCache>,
    seed: Option<u64>,
    offline: bool,
    quote_providers: Option<Vec<Arc<dyn QuoteProvider>>>,
    history_providers: Option<Vec<Arc<dyn HistoryProvider>>>,
}

impl StockAnalyzerBuilder {
    pub fn config(mut self, config: ServiceConfig) -> Self {
        self.config = config;
        self
    }

    pub fn http_client(mut self, http_client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(http_client);
        self
    }

    /// Share an existing cache, e.g. between analyzers in one process.
    pub fn cache(mut self, cache: ResponseCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn no_cache(self) -> Self {
        self.cache(ResponseCache::disabled())
    }

    /// Makes simulated quotes and series reproducible.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// No upstream providers at all; every answer is simulated.
    pub fn offline(mut self, offline: bool) -> Self {
        self.offline = offline;
        self
    }

    pub fn quote_providers(mut self, providers: Vec<Arc<dyn QuoteProvider>>) -> Self {
        self.quote_providers = Some(providers);
        self
    }

    pub fn history_providers(mut self, providers: Vec<Arc<dyn HistoryProvider>>) -> Self {
        self.history_providers = Some(providers);
        self
    }

    pub fn build(self) -> StockAnalyzer {
        let config = self.config;
        let cache = self
            .cache
            .unwrap_or_else(|| ResponseCache::new(config.cache_ttl, config.cache_capacity));
        let synthetic = Arc::new(match self.seed {
            Some(seed) => SyntheticMarket::seeded(seed),
            None => SyntheticMarket::new(),
        });

        let (default_quotes, default_history) = if self.offline {
            (Vec::new(), Vec::new())
        } else {
            let http = self.http_client.unwrap_or_else(|| {
                Arc::new(ReqwestHttpClient::new()) as Arc<dyn HttpClient>
            });
            upstream_providers(&config, http, cache.clone())
        };
        let quote_providers = self.quote_providers.unwrap_or(default_quotes);
        let history_providers = self.history_providers.unwrap_or(default_history);

        debug!(
            quote_providers = quote_providers.len(),
            history_providers = history_providers.len(),
            offline = self.offline,
            "building stock analyzer"
        );

        StockAnalyzer {
            quotes: QuoteChain::new(
                quote_providers,
                Arc::clone(&synthetic),
                config.provider_timeout,
            ),
            history: HistoryFetcher::new(history_providers, synthetic, config.provider_timeout),
            history_days: config.history_days,
            cache,
        }
    }
}

/// Twelve Data → Alpha Vantage (keyed only) → Yahoo → Finnhub for quotes,
/// Alpha Vantage (keyed only) → Yahoo for history.
fn upstream_providers(
    config: &ServiceConfig,
    http: Arc<dyn HttpClient>,
    cache: ResponseCache,
) -> (Vec<Arc<dyn QuoteProvider>>, Vec<Arc<dyn HistoryProvider>>) {
    let transport = ProviderTransport::new(http, cache, config.provider_timeout);

    let twelve_data = Arc::new(TwelveDataAdapter::new(
        transport.clone(),
        config.twelve_data_api_key.clone(),
    ));
    let alpha_vantage = config
        .alpha_vantage_api_key
        .as_ref()
        .map(|key| Arc::new(AlphaVantageAdapter::new(transport.clone(), key.clone())));
    let yahoo = Arc::new(YahooAdapter::new(transport.clone()));
    let finnhub = Arc::new(FinnhubAdapter::new(
        transport,
        config.finnhub_api_key.clone(),
    ));

    let mut quotes: Vec<Arc<dyn QuoteProvider>> = vec![twelve_data];
    let mut history: Vec<Arc<dyn HistoryProvider>> = Vec::new();
    if let Some(alpha_vantage) = alpha_vantage {
        quotes.push(alpha_vantage.clone());
        history.push(alpha_vantage);
    }
    quotes.push(yahoo.clone());
    quotes.push(finnhub);
    history.push(yahoo);

    (quotes, history)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::ProviderFuture;
    use crate::http_client::NoopHttpClient;
    use crate::{ChangePercent, QuoteDraft, Recommendation};
    use time::OffsetDateTime;

    fn offline(seed: u64) -> StockAnalyzer {
        StockAnalyzer::builder().offline(true).seed(seed).build()
    }

    /// Always quotes 210.0 as Finnhub.
    struct SteadyQuote;

    impl QuoteProvider for SteadyQuote {
        fn id(&self) -> ProviderId {
            ProviderId::Finnhub
        }

        fn fetch_quote<'a>(&'a self, symbol: &'a Symbol) -> ProviderFuture<'a, Quote> {
            Box::pin(async move {
                Ok(QuoteDraft {
                    symbol: symbol.clone(),
                    price: 210.0,
                    change: 0.0,
                    change_percent: ChangePercent::default(),
                    volume: 0,
                    high: 211.0,
                    low: 209.0,
                    open: 210.0,
                    previous_close: 210.0,
                    as_of: OffsetDateTime::now_utc(),
                    market_status: None,
                    source: ProviderId::Finnhub,
                }
                .build()
                .expect("valid draft"))
            })
        }
    }

    #[tokio::test]
    async fn analyze_route_reports_synthesized_history_under_a_real_quote() {
        let analyzer = StockAnalyzer::builder()
            .offline(true)
            .quote_providers(vec![Arc::new(SteadyQuote)])
            .seed(6)
            .build();

        let route = analyzer.analyze_route("AMD").await.expect("analysis");

        assert!(!route.analysis.quote.is_simulated());
        assert_eq!(route.quote_chain, vec![ProviderId::Finnhub]);
        assert_eq!(route.history_source, ProviderId::Simulated);
        assert_eq!(route.analysis.historical_data.len(), 30);
        assert!(route
            .analysis
            .historical_data
            .prices()
            .iter()
            .all(|price| (203.7..=216.3).contains(price)));
    }

    #[tokio::test]
    async fn offline_analysis_is_simulated_and_complete() {
        let analyzer = offline(21);

        let analysis = analyzer.analyze(" aapl ").await.expect("analysis");

        assert_eq!(analysis.quote.symbol.as_str(), "AAPL");
        assert!(analysis.quote.is_simulated());
        assert_eq!(analysis.historical_data.len(), 30);
        assert!((0.0..=100.0).contains(&analysis.confidence));
        assert!((0.0..=100.0).contains(&analysis.technical_indicators.rsi));
    }

    #[tokio::test]
    async fn malformed_symbols_are_rejected_before_any_fetch() {
        let analyzer = offline(1);

        for input in ["", "   ", "AAPL1", "TOOLONG", "BRK.B"] {
            let err = analyzer.analyze(input).await.expect_err("invalid symbol");
            assert_eq!(err.code(), "analysis.invalid_symbol", "{input:?}");
        }
    }

    #[test]
    fn compose_rejects_empty_series() {
        let quote = SyntheticMarket::seeded(2)
            .quote(&Symbol::parse("MSFT").expect("valid symbol"))
            .expect("quote");

        let err = compose(quote, HistoricalSeries::default()).expect_err("empty series");
        assert!(matches!(err, AnalysisError::Internal(_)));
    }

    #[test]
    fn default_provider_order_depends_on_alpha_vantage_key() {
        let without_key = upstream_providers(
            &ServiceConfig::default(),
            Arc::new(NoopHttpClient),
            ResponseCache::disabled(),
        );
        let ids: Vec<ProviderId> = without_key.0.iter().map(|p| p.id()).collect();
        assert_eq!(ids, vec![ProviderId::TwelveData, ProviderId::Yahoo, ProviderId::Finnhub]);
        assert_eq!(without_key.1.len(), 1);

        let config = ServiceConfig {
            alpha_vantage_api_key: Some(String::from("key")),
            ..ServiceConfig::default()
        };
        let with_key =
            upstream_providers(&config, Arc::new(NoopHttpClient), ResponseCache::disabled());
        let ids: Vec<ProviderId> = with_key.0.iter().map(|p| p.id()).collect();
        assert_eq!(ids, ProviderId::UPSTREAM.to_vec());
        let history: Vec<ProviderId> = with_key.1.iter().map(|p| p.id()).collect();
        assert_eq!(history, vec![ProviderId::AlphaVantage, ProviderId::Yahoo]);
    }

    #[tokio::test]
    async fn seeded_offline_analyses_are_reproducible() {
        let first = offline(99)
            .analyze("NVDA")
            .await
            .expect("analysis");
        let second = offline(99)
            .analyze("NVDA")
            .await
            .expect("analysis");

        assert_eq!(first.historical_data, second.historical_data);
        assert_eq!(first.technical_indicators, second.technical_indicators);
        assert!(matches!(
            first.recommendation,
            Recommendation::Buy | Recommendation::Sell | Recommendation::Hold
        ));
    }
}
