//! Behavior-driven tests for the provider fallback chain
//!
//! These tests drive the real adapters through a scripted transport and
//! verify which provider ends up answering, and what happens when none do.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use stockscope_core::{
    FailureKind, HttpClient, HttpError, HttpRequest, HttpResponse, ProviderId, ServiceConfig,
    StockAnalyzer,
};

/// Answers each request with whatever the routing closure returns and keeps
/// a log of requested URLs.
struct ScriptedTransport<F> {
    route: F,
    log: Mutex<Vec<String>>,
}

impl<F> ScriptedTransport<F>
where
    F: Fn(&HttpRequest) -> Result<HttpResponse, HttpError> + Send + Sync,
{
    fn new(route: F) -> Arc<Self> {
        Arc::new(Self {
            route,
            log: Mutex::new(Vec::new()),
        })
    }

    fn calls_to(&self, host: &str) -> usize {
        self.log
            .lock()
            .expect("log lock")
            .iter()
            .filter(|url| url.contains(host))
            .count()
    }
}

impl<F> HttpClient for ScriptedTransport<F>
where
    F: Fn(&HttpRequest) -> Result<HttpResponse, HttpError> + Send + Sync,
{
    fn execute<'a>(
        &'a self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
        self.log.lock().expect("log lock").push(request.url.clone());
        let response = (self.route)(&request);
        Box::pin(async move { response })
    }
}

const YAHOO_QUOTE: &str = r#"{"chart":{"result":[{"meta":{
    "regularMarketPrice": 178.5, "previousClose": 175.0, "regularMarketVolume": 52000000,
    "regularMarketDayHigh": 179.0, "regularMarketDayLow": 174.8, "regularMarketOpen": 175.2
}}],"error":null}}"#;

fn yahoo_history(days: usize) -> String {
    // one close per day from 2024-01-02 14:30 UTC, rising by 1.0
    let start = 1_704_205_800_i64;
    let timestamps: Vec<String> = (0..days)
        .map(|i| (start + i as i64 * 86_400).to_string())
        .collect();
    let closes: Vec<String> = (0..days).map(|i| format!("{:.1}", 100.0 + i as f64)).collect();
    format!(
        r#"{{"chart":{{"result":[{{"meta":{{}},"timestamp":[{}],"indicators":{{"quote":[{{"close":[{}]}}]}}}}]}}}}"#,
        timestamps.join(","),
        closes.join(",")
    )
}

fn is_yahoo_history(request: &HttpRequest) -> bool {
    request.url.contains("finance.yahoo.com") && request.query_value("range").is_some()
}

fn analyzer(config: ServiceConfig, http: Arc<dyn HttpClient>) -> StockAnalyzer {
    StockAnalyzer::builder().config(config).http_client(http).seed(17).build()
}

// =============================================================================
// Fallback order
// =============================================================================

#[tokio::test]
async fn when_twelve_data_reports_an_error_the_chain_moves_on_to_yahoo() {
    // Given: Twelve Data rejects the demo key, Yahoo answers
    let transport = ScriptedTransport::new(|request: &HttpRequest| {
        if request.url.contains("twelvedata") {
            Ok(HttpResponse::ok_json(
                r#"{"status":"error","code":401,"message":"**apikey** parameter is incorrect"}"#,
            ))
        } else if request.url.contains("finance.yahoo.com") {
            Ok(HttpResponse::ok_json(YAHOO_QUOTE))
        } else {
            Err(HttpError::new("unexpected host"))
        }
    });
    let analyzer = analyzer(ServiceConfig::default(), transport.clone());

    // When: A quote is requested
    let route = analyzer.quote("aapl").await.expect("quote route");

    // Then: Yahoo supplied it and Finnhub was never asked
    assert_eq!(route.selected_source, ProviderId::Yahoo);
    assert_eq!(route.source_chain, vec![ProviderId::TwelveData, ProviderId::Yahoo]);
    assert_eq!(route.failures[0].kind(), FailureKind::ProviderError);
    assert_eq!(route.quote.price, 178.5);
    assert_eq!(route.quote.change_percent.to_string(), "+2.00%");
    assert!(route.quote.last_updated.ends_with("IST (Yahoo Finance)"));
    assert_eq!(transport.calls_to("finnhub"), 0);
}

#[tokio::test]
async fn when_alpha_vantage_is_rate_limited_the_next_provider_answers() {
    // Given: An Alpha Vantage key whose quota is used up
    let transport = ScriptedTransport::new(|request: &HttpRequest| {
        if request.url.contains("twelvedata") {
            Ok(HttpResponse::new(429, ""))
        } else if request.url.contains("alphavantage") {
            Ok(HttpResponse::ok_json(
                r#"{"Note":"Thank you for using Alpha Vantage! Our standard API call frequency is 5 calls per minute."}"#,
            ))
        } else if request.url.contains("finance.yahoo.com") {
            Ok(HttpResponse::ok_json(YAHOO_QUOTE))
        } else {
            Err(HttpError::new("unexpected host"))
        }
    });
    let config = ServiceConfig {
        alpha_vantage_api_key: Some(String::from("av-key")),
        ..ServiceConfig::default()
    };
    let analyzer = analyzer(config, transport);

    // When: A quote is requested
    let route = analyzer.quote("MSFT").await.expect("quote route");

    // Then: Both rate limits were recorded before Yahoo answered
    let kinds: Vec<FailureKind> = route.failures.iter().map(|f| f.kind()).collect();
    assert_eq!(kinds, vec![FailureKind::RateLimited, FailureKind::RateLimited]);
    assert_eq!(route.selected_source, ProviderId::Yahoo);
}

#[tokio::test]
async fn when_every_provider_fails_the_quote_is_simulated() {
    // Given: Each upstream fails in a different way
    let transport = ScriptedTransport::new(|request: &HttpRequest| {
        if request.url.contains("twelvedata") {
            Ok(HttpResponse::ok_json("not json"))
        } else if request.url.contains("finance.yahoo.com") {
            Ok(HttpResponse::new(503, "Service Unavailable"))
        } else if request.url.contains("finnhub") {
            Ok(HttpResponse::ok_json(r#"{"c":0,"d":null,"dp":null,"h":0,"l":0,"o":0,"pc":0}"#))
        } else {
            Err(HttpError::timeout("timed out"))
        }
    });
    let analyzer = analyzer(ServiceConfig::default(), transport);

    // When: A quote is requested
    let route = analyzer.quote("TSLA").await.expect("never fails for a valid symbol");

    // Then: Failures are typed and the result is visibly simulated
    let kinds: Vec<FailureKind> = route.failures.iter().map(|f| f.kind()).collect();
    assert_eq!(
        kinds,
        vec![
            FailureKind::MalformedResponse,
            FailureKind::ProviderError,
            FailureKind::NoData
        ]
    );
    assert!(route.is_simulated());
    assert!(route.quote.last_updated.contains("Simulated"));
    assert_eq!(route.quote.name, "Tesla Inc.");
}

// =============================================================================
// History
// =============================================================================

#[tokio::test]
async fn when_yahoo_serves_history_the_analysis_uses_real_closes() {
    // Given: Yahoo serves both the quote and three months of closes
    let body = yahoo_history(60);
    let transport = ScriptedTransport::new(move |request: &HttpRequest| {
        if is_yahoo_history(request) {
            Ok(HttpResponse::ok_json(body.clone()))
        } else if request.url.contains("finance.yahoo.com") {
            Ok(HttpResponse::ok_json(YAHOO_QUOTE))
        } else {
            Err(HttpError::new("offline"))
        }
    });
    let analyzer = analyzer(ServiceConfig::default(), transport);

    // When: The symbol is analyzed
    let analysis = analyzer.analyze("AAPL").await.expect("analysis");

    // Then: The last 30 real closes drive the indicators
    let prices = analysis.historical_data.prices();
    assert_eq!(prices.len(), 30);
    assert_eq!(prices.first().copied(), Some(130.0));
    assert_eq!(prices.last().copied(), Some(159.0));
    assert_eq!(analysis.technical_indicators.rsi, 100.0);
    assert_eq!(analysis.technical_indicators.support, 140.0);
    assert_eq!(analysis.technical_indicators.resistance, 159.0);
    assert!(!analysis.quote.is_simulated());
}

#[tokio::test]
async fn when_history_is_unavailable_it_is_synthesized_around_the_quote() {
    // Given: Yahoo quotes work but the chart history request fails
    let transport = ScriptedTransport::new(|request: &HttpRequest| {
        if is_yahoo_history(request) {
            Ok(HttpResponse::ok_json(
                r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found"}}}"#,
            ))
        } else if request.url.contains("finance.yahoo.com") {
            Ok(HttpResponse::ok_json(YAHOO_QUOTE))
        } else {
            Err(HttpError::new("offline"))
        }
    });
    let analyzer = analyzer(ServiceConfig::default(), transport);

    // When: The symbol is analyzed
    let analysis = analyzer.analyze("AAPL").await.expect("analysis");

    // Then: 30 synthetic closes sit within ±3% of the real quote price
    let prices = analysis.historical_data.prices();
    assert_eq!(prices.len(), 30);
    assert!(prices.iter().all(|p| (173.1..=183.9).contains(p)), "{prices:?}");
    let dates: Vec<_> = analysis.historical_data.points().iter().map(|p| p.date).collect();
    assert!(dates.windows(2).all(|pair| pair[0] < pair[1]));
}
