use std::collections::BTreeMap;

use serde::Deserialize;
use time::OffsetDateTime;

use super::{
    decode, optional, required, volume, FetchFailure, HistoryProvider, Numeric, ProviderFuture,
    ProviderTransport, QuoteProvider,
};
use crate::cache::{CacheKey, RequestKind};
use crate::http_client::{HttpAuth, HttpRequest};
use crate::throttling::RateBudget;
use crate::{
    parse_date_label, ChangePercent, HistoricalPoint, HistoricalSeries, MarketStatus, ProviderId,
    Quote, QuoteDraft, Symbol,
};

const QUERY_URL: &str = "https://www.alphavantage.co/query";
const PROVIDER: ProviderId = ProviderId::AlphaVantage;

/// Alpha Vantage `GLOBAL_QUOTE` and `TIME_SERIES_DAILY`.
///
/// Only registered when an API key is configured; the free tier allows
/// five calls per minute, shared by quotes and history.
#[derive(Debug, Clone)]
pub struct AlphaVantageAdapter {
    transport: ProviderTransport,
    budget: RateBudget,
    auth: HttpAuth,
}

impl AlphaVantageAdapter {
    pub fn new(transport: ProviderTransport, api_key: impl Into<String>) -> Self {
        Self {
            transport,
            budget: RateBudget::for_provider(PROVIDER),
            auth: HttpAuth::query("apikey", api_key),
        }
    }

    pub fn with_budget(mut self, budget: RateBudget) -> Self {
        self.budget = budget;
        self
    }

    fn request(&self, function: &str, symbol: &Symbol) -> HttpRequest {
        HttpRequest::get(QUERY_URL)
            .with_query("function", function)
            .with_query("symbol", symbol.as_str())
            .with_auth(&self.auth)
    }
}

impl QuoteProvider for AlphaVantageAdapter {
    fn id(&self) -> ProviderId {
        PROVIDER
    }

    fn fetch_quote<'a>(&'a self, symbol: &'a Symbol) -> ProviderFuture<'a, Quote> {
        Box::pin(async move {
            let key = CacheKey::new(PROVIDER, symbol.clone(), RequestKind::Quote);
            let now = OffsetDateTime::now_utc();

            self.transport
                .fetch(&self.budget, key, self.request("GLOBAL_QUOTE", symbol), |body| {
                    parse_global_quote(body, symbol, now)
                })
                .await
        })
    }
}

impl HistoryProvider for AlphaVantageAdapter {
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

            self.transport
                .fetch(
                    &self.budget,
                    key,
                    self.request("TIME_SERIES_DAILY", symbol),
                    |body| parse_daily_series(body, days),
                )
                .await
        })
    }
}

/// Fields every Alpha Vantage response may carry instead of data.
#[derive(Debug, Deserialize)]
struct Notices {
    #[serde(rename = "Error Message")]
    error_message: Option<String>,
    #[serde(rename = "Note")]
    note: Option<String>,
    #[serde(rename = "Information")]
    information: Option<String>,
}

impl Notices {
    fn check(&self) -> Result<(), FetchFailure> {
        if let Some(message) = &self.error_message {
            return Err(FetchFailure::provider_error(PROVIDER, message.clone()));
        }
        if let Some(note) = &self.note {
            if note.contains("call frequency") {
                return Err(FetchFailure::rate_limited(PROVIDER, note.clone()));
            }
        }
        if let Some(information) = &self.information {
            if information.to_ascii_lowercase().contains("rate limit") {
                return Err(FetchFailure::rate_limited(PROVIDER, information.clone()));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct GlobalQuotePayload {
    #[serde(flatten)]
    notices: Notices,
    #[serde(rename = "Global Quote")]
    quote: Option<BTreeMap<String, Numeric>>,
}

pub fn parse_global_quote(
    body: &str,
    symbol: &Symbol,
    now: OffsetDateTime,
) -> Result<Quote, FetchFailure> {
    let payload: GlobalQuotePayload = decode(PROVIDER, body)?;
    payload.notices.check()?;

    let fields = payload
        .quote
        .filter(|fields| !fields.is_empty())
        .ok_or_else(|| FetchFailure::no_data(PROVIDER, format!("no global quote for {symbol}")))?;

    let price = required(PROVIDER, "05. price", fields.get("05. price"))?;
    let previous_close = optional(
        PROVIDER,
        "08. previous close",
        fields.get("08. previous close"),
        price,
    )?;
    let change = optional(
        PROVIDER,
        "09. change",
        fields.get("09. change"),
        price - previous_close,
    )?;
    let change_percent = match fields.get("10. change percent") {
        Some(Numeric::Text(text)) => ChangePercent::parse(text)
            .map_err(|err| FetchFailure::malformed(PROVIDER, err.to_string()))?,
        Some(Numeric::Number(value)) => ChangePercent::new(*value)
            .map_err(|err| FetchFailure::malformed(PROVIDER, err.to_string()))?,
        None => ChangePercent::between(price, previous_close),
    };

    QuoteDraft {
        symbol: symbol.clone(),
        price,
        change,
        change_percent,
        volume: volume(fields.get("06. volume")),
        high: optional(PROVIDER, "03. high", fields.get("03. high"), price)?,
        low: optional(PROVIDER, "04. low", fields.get("04. low"), price)?,
        open: optional(PROVIDER, "02. open", fields.get("02. open"), price)?,
        previous_close,
        as_of: now,
        market_status: Some(MarketStatus::at(now)),
        source: PROVIDER,
    }
    .build()
    .map_err(|err| FetchFailure::malformed(PROVIDER, err.to_string()))
}

#[derive(Debug, Deserialize)]
struct DailyBar {
    #[serde(rename = "4. close")]
    close: Numeric,
}

#[derive(Debug, Deserialize)]
struct DailySeriesPayload {
    #[serde(flatten)]
    notices: Notices,
    #[serde(rename = "Time Series (Daily)")]
    series: Option<BTreeMap<String, DailyBar>>,
}

/// The `days` most recent daily closes, oldest first.
pub fn parse_daily_series(body: &str, days: usize) -> Result<HistoricalSeries, FetchFailure> {
    let payload: DailySeriesPayload = decode(PROVIDER, body)?;
    payload.notices.check()?;

    let series = payload
        .series
        .filter(|series| !series.is_empty())
        .ok_or_else(|| FetchFailure::no_data(PROVIDER, "response has no daily time series"))?;

    let mut points = series
        .iter()
        .map(|(label, bar)| {
            let date = parse_date_label(label).ok_or_else(|| {
                FetchFailure::malformed(PROVIDER, format!("invalid date label '{label}'"))
            })?;
            let price = bar.close.as_f64().ok_or_else(|| {
                FetchFailure::malformed(PROVIDER, format!("close for {label} is not numeric"))
            })?;
            Ok(HistoricalPoint::new(date, price))
        })
        .collect::<Result<Vec<_>, FetchFailure>>()?;

    points.sort_by_key(|point| point.date);
    let skip = points.len().saturating_sub(days);
    let recent = points.split_off(skip);

    HistoricalSeries::new(recent).map_err(|err| FetchFailure::malformed(PROVIDER, err.to_string()))
}
