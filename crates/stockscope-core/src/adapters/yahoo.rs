use serde::Deserialize;
use time::OffsetDateTime;

use super::{
    decode, optional, volume, FetchFailure, HistoryProvider, Numeric, ProviderFuture,
    ProviderTransport, QuoteProvider,
};
use crate::cache::{CacheKey, RequestKind};
use crate::http_client::HttpRequest;
use crate::throttling::RateBudget;
use crate::{
    ChangePercent, HistoricalPoint, HistoricalSeries, MarketStatus, ProviderId, Quote, QuoteDraft,
    Symbol,
};

const CHART_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";
const PROVIDER: ProviderId = ProviderId::Yahoo;

/// Yahoo Finance v8 chart endpoint. Keyless.
#[derive(Debug, Clone)]
pub struct YahooAdapter {
    transport: ProviderTransport,
    budget: RateBudget,
}

impl YahooAdapter {
    pub fn new(transport: ProviderTransport) -> Self {
        Self {
            transport,
            budget: RateBudget::for_provider(PROVIDER),
        }
    }

    pub fn with_budget(mut self, budget: RateBudget) -> Self {
        self.budget = budget;
        self
    }

    fn chart_request(symbol: &Symbol) -> HttpRequest {
        HttpRequest::get(format!("{CHART_URL}/{symbol}"))
    }
}

impl QuoteProvider for YahooAdapter {
    fn id(&self) -> ProviderId {
        PROVIDER
    }

    fn fetch_quote<'a>(&'a self, symbol: &'a Symbol) -> ProviderFuture<'a, Quote> {
        Box::pin(async move {
            let key = CacheKey::new(PROVIDER, symbol.clone(), RequestKind::Quote);
            let now = OffsetDateTime::now_utc();

            self.transport
                .fetch(&self.budget, key, Self::chart_request(symbol), |body| {
                    parse_chart_quote(body, symbol, now)
                })
                .await
        })
    }
}

impl HistoryProvider for YahooAdapter {
    fn id(&self) -> ProviderId {
        PROVIDER
    }

    fn fetch_history<'a>(
        &'a self,
        symbol: &'a Symbol,
        days: usize,
    ) -> ProviderFuture<'a, HistoricalSeries> {
        Box::pin(async move {
            let key = CacheKey::new(PROVIDER, symbol.clone(), RequestKind::History);
            let request = Self::chart_request(symbol)
                .with_query("range", "3mo")
                .with_query("interval", "1d");

            self.transport
                .fetch(&self.budget, key, request, |body| {
                    parse_chart_history(body, days)
                })
                .await
        })
    }
}

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
    #[serde(default)]
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: Option<String>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    regular_market_price: Option<Numeric>,
    previous_close: Option<Numeric>,
    chart_previous_close: Option<Numeric>,
    regular_market_volume: Option<Numeric>,
    regular_market_day_high: Option<Numeric>,
    regular_market_day_low: Option<Numeric>,
    regular_market_open: Option<Numeric>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: ChartMeta,
    #[serde(default)]
    timestamp: Vec<i64>,
    #[serde(default)]
    indicators: Option<Indicators>,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<QuoteColumns>,
}

#[derive(Debug, Deserialize)]
struct QuoteColumns {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

fn first_result(body: &str) -> Result<ChartResult, FetchFailure> {
    let envelope: ChartEnvelope = decode(PROVIDER, body)?;
    if let Some(error) = envelope.chart.error {
        let message = error
            .description
            .or(error.code)
            .unwrap_or_else(|| String::from("chart error"));
        return Err(FetchFailure::no_data(PROVIDER, message));
    }

    envelope
        .chart
        .result
        .and_then(|results| results.into_iter().next())
        .ok_or_else(|| FetchFailure::no_data(PROVIDER, "chart has no result"))
}

pub fn parse_chart_quote(
    body: &str,
    symbol: &Symbol,
    now: OffsetDateTime,
) -> Result<Quote, FetchFailure> {
    let meta = first_result(body)?.meta;

    let previous_close = meta
        .previous_close
        .as_ref()
        .or(meta.chart_previous_close.as_ref())
        .and_then(Numeric::as_f64);
    let price = meta
        .regular_market_price
        .as_ref()
        .and_then(Numeric::as_f64)
        .or(previous_close)
        .ok_or_else(|| FetchFailure::no_data(PROVIDER, "chart meta has no market price"))?;
    let previous_close = previous_close.unwrap_or(price);

    QuoteDraft {
        symbol: symbol.clone(),
        price,
        change: price - previous_close,
        change_percent: ChangePercent::between(price, previous_close),
        volume: volume(meta.regular_market_volume.as_ref()),
        high: optional(
            PROVIDER,
            "regularMarketDayHigh",
            meta.regular_market_day_high.as_ref(),
            price,
        )?,
        low: optional(
            PROVIDER,
            "regularMarketDayLow",
            meta.regular_market_day_low.as_ref(),
            price,
        )?,
        open: optional(
            PROVIDER,
            "regularMarketOpen",
            meta.regular_market_open.as_ref(),
            price,
        )?,
        previous_close,
        as_of: now,
        market_status: Some(MarketStatus::at(now)),
        source: PROVIDER,
    }
    .build()
    .map_err(|err| FetchFailure::malformed(PROVIDER, err.to_string()))
}

/// Daily closes from the chart arrays; null closes (halted days) are skipped.
pub fn parse_chart_history(body: &str, days: usize) -> Result<HistoricalSeries, FetchFailure> {
    let result = first_result(body)?;
    let closes = result
        .indicators
        .and_then(|indicators| indicators.quote.into_iter().next())
        .map(|columns| columns.close)
        .ok_or_else(|| FetchFailure::no_data(PROVIDER, "chart has no close prices"))?;

    if closes.len() != result.timestamp.len() {
        return Err(FetchFailure::malformed(
            PROVIDER,
            format!(
                "{} timestamps but {} closes",
                result.timestamp.len(),
                closes.len()
            ),
        ));
    }

    let mut points = Vec::with_capacity(closes.len());
    for (timestamp, close) in result.timestamp.iter().zip(closes) {
        let Some(price) = close else {
            continue;
        };
        let date = OffsetDateTime::from_unix_timestamp(*timestamp)
            .map_err(|err| FetchFailure::malformed(PROVIDER, err.to_string()))?
            .date();
        points.push(HistoricalPoint::new(date, price));
    }
    if points.is_empty() {
        return Err(FetchFailure::no_data(PROVIDER, "chart has no close prices"));
    }

    let skip = points.len().saturating_sub(days);
    HistoricalSeries::new(points.split_off(skip))
        .map_err(|err| FetchFailure::malformed(PROVIDER, err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::FailureKind;
    use time::macros::{date, datetime};

    fn tsla() -> Symbol {
        Symbol::parse("TSLA").expect("valid symbol")
    }

    #[test]
    fn parses_chart_meta_into_quote() {
        let body = r#"{"chart":{"result":[{"meta":{
            "regularMarketPrice": 248.42, "previousClose": 239.67,
            "regularMarketVolume": 89456000, "regularMarketDayHigh": 252.1,
            "regularMarketDayLow": 245.8, "regularMarketOpen": 247.2
        }}],"error":null}}"#;

        let quote = parse_chart_quote(body, &tsla(), datetime!(2024-03-05 14:00 UTC))
            .expect("quote parses");

        assert_eq!(quote.price, 248.42);
        assert_eq!(quote.change, 8.75);
        assert_eq!(quote.change_percent.to_string(), "+3.65%");
        assert_eq!(quote.market_status, Some(MarketStatus::PreMarket));
        assert!(quote.last_updated.ends_with("(Yahoo Finance)"));
    }

    #[test]
    fn falls_back_to_previous_close_when_price_missing() {
        let body = r#"{"chart":{"result":[{"meta":{"chartPreviousClose": 100.0}}]}}"#;
        let quote = parse_chart_quote(body, &tsla(), datetime!(2024-03-05 14:00 UTC))
            .expect("quote parses");

        assert_eq!(quote.price, 100.0);
        assert_eq!(quote.change, 0.0);
        assert_eq!(quote.volume, 0);
    }

    #[test]
    fn chart_error_is_no_data() {
        let body = r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found, symbol may be delisted"}}}"#;
        let err = parse_chart_quote(body, &tsla(), datetime!(2024-03-05 14:00 UTC))
            .expect_err("chart error");

        assert_eq!(err.kind(), FailureKind::NoData);
        assert!(err.message().contains("delisted"));
    }

    #[test]
    fn history_skips_null_closes_and_keeps_most_recent() {
        // 2024-03-01, 03-04, 03-05, 03-06 at 14:30 UTC
        let body = r#"{"chart":{"result":[{
            "meta": {},
            "timestamp": [1709303400, 1709562600, 1709649000, 1709735400],
            "indicators": {"quote": [{"close": [100.5, null, 101.25, 102.0]}]}
        }]}}"#;

        let series = parse_chart_history(body, 2).expect("history parses");

        assert_eq!(series.prices(), vec![101.25, 102.0]);
        assert_eq!(series.points()[0].date, date!(2024 - 03 - 05));
    }

    #[test]
    fn history_with_mismatched_columns_is_malformed() {
        let body = r#"{"chart":{"result":[{
            "meta": {}, "timestamp": [1709303400, 1709562600],
            "indicators": {"quote": [{"close": [100.5]}]}
        }]}}"#;

        let err = parse_chart_history(body, 30).expect_err("mismatch");
        assert_eq!(err.kind(), FailureKind::MalformedResponse);
    }
}
