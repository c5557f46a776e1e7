//! Upstream market-data adapters.
//!
//! Each adapter splits into a thin async shell that performs the request
//! through [`ProviderTransport`] and a pure `parse_*` function that turns a
//! response body into a canonical value or a typed [`FetchFailure`].

mod alphavantage;
mod finnhub;
mod twelvedata;
mod yahoo;

use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::cache::{CacheKey, ResponseCache};
use crate::http_client::{HttpClient, HttpError, HttpRequest};
use crate::throttling::RateBudget;
use crate::{HistoricalSeries, ProviderId, Quote, Symbol};

pub use alphavantage::{parse_daily_series, parse_global_quote, AlphaVantageAdapter};
pub use finnhub::{parse_finnhub_quote, FinnhubAdapter};
pub use twelvedata::{parse_twelvedata_quote, TwelveDataAdapter};
pub use yahoo::{parse_chart_history, parse_chart_quote, YahooAdapter};

/// Why a single provider call produced nothing usable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    NoData,
    RateLimited,
    ProviderError,
    MalformedResponse,
}

/// Structured adapter failure consumed by the fallback chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchFailure {
    kind: FailureKind,
    provider: ProviderId,
    message: String,
}

impl FetchFailure {
    pub fn new(kind: FailureKind, provider: ProviderId, message: impl Into<String>) -> Self {
        Self {
            kind,
            provider,
            message: message.into(),
        }
    }

    pub fn no_data(provider: ProviderId, message: impl Into<String>) -> Self {
        Self::new(FailureKind::NoData, provider, message)
    }

    pub fn rate_limited(provider: ProviderId, message: impl Into<String>) -> Self {
        Self::new(FailureKind::RateLimited, provider, message)
    }

    pub fn provider_error(provider: ProviderId, message: impl Into<String>) -> Self {
        Self::new(FailureKind::ProviderError, provider, message)
    }

    pub fn malformed(provider: ProviderId, message: impl Into<String>) -> Self {
        Self::new(FailureKind::MalformedResponse, provider, message)
    }

    pub fn timed_out(provider: ProviderId, timeout: Duration) -> Self {
        Self::provider_error(
            provider,
            format!("no response within {} ms", timeout.as_millis()),
        )
    }

    pub const fn kind(&self) -> FailureKind {
        self.kind
    }

    pub const fn provider(&self) -> ProviderId {
        self.provider
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            FailureKind::NoData => "provider.no_data",
            FailureKind::RateLimited => "provider.rate_limited",
            FailureKind::ProviderError => "provider.error",
            FailureKind::MalformedResponse => "provider.malformed_response",
        }
    }
}

impl Display for FetchFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {} ({})", self.provider, self.message, self.code())
    }
}

impl std::error::Error for FetchFailure {}

pub type ProviderFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, FetchFailure>> + Send + 'a>>;

/// A source of live quotes.
pub trait QuoteProvider: Send + Sync {
    fn id(&self) -> ProviderId;

    fn fetch_quote<'a>(&'a self, symbol: &'a Symbol) -> ProviderFuture<'a, Quote>;
}

/// A source of daily closing prices.
pub trait HistoryProvider: Send + Sync {
    fn id(&self) -> ProviderId;

    /// At most `days` most recent closes, oldest first.
    fn fetch_history<'a>(
        &'a self,
        symbol: &'a Symbol,
        days: usize,
    ) -> ProviderFuture<'a, HistoricalSeries>;
}

/// Shared request path for every adapter: cache, budget, HTTP, status mapping.
#[derive(Clone)]
pub struct ProviderTransport {
    http: Arc<dyn HttpClient>,
    cache: ResponseCache,
    timeout: Duration,
}

impl ProviderTransport {
    pub fn new(http: Arc<dyn HttpClient>, cache: ResponseCache, timeout: Duration) -> Self {
        Self {
            http,
            cache,
            timeout,
        }
    }

    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    /// Runs `parse` on a fresh cached body when one exists, otherwise spends
    /// one unit of `budget` on a request. Only bodies that parse are cached.
    pub async fn fetch<T, F>(
        &self,
        budget: &RateBudget,
        key: CacheKey,
        request: HttpRequest,
        parse: F,
    ) -> Result<T, FetchFailure>
    where
        F: Fn(&str) -> Result<T, FetchFailure> + Send,
    {
        let provider = key.provider;
        if let Some(body) = self.cache.get(&key).await {
            debug!(%key, "cache hit");
            return parse(&*body);
        }

        budget.try_acquire().map_err(|wait| {
            FetchFailure::rate_limited(
                provider,
                format!("local request budget exhausted; retry in {:.1}s", wait.as_secs_f64()),
            )
        })?;

        let request = request.with_timeout(self.timeout);
        let response = self
            .http
            .execute(request)
            .await
            .map_err(|err| transport_failure(provider, &err))?;

        if response.status == 429 {
            return Err(FetchFailure::rate_limited(provider, "HTTP 429 Too Many Requests"));
        }
        if !response.is_success() {
            return Err(FetchFailure::provider_error(
                provider,
                format!("HTTP {}", response.status),
            ));
        }

        let value = parse(&response.body)?;
        self.cache.put(key, response.body).await;
        Ok(value)
    }
}

impl std::fmt::Debug for ProviderTransport {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderTransport")
            .field("cache", &self.cache)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

fn transport_failure(provider: ProviderId, err: &HttpError) -> FetchFailure {
    if err.timed_out() {
        FetchFailure::provider_error(provider, format!("timeout: {}", err.message()))
    } else {
        FetchFailure::provider_error(provider, format!("transport error: {}", err.message()))
    }
}

/// Decode a body into a provider payload type.
pub(crate) fn decode<'de, T>(provider: ProviderId, body: &'de str) -> Result<T, FetchFailure>
where
    T: Deserialize<'de>,
{
    serde_json::from_str(body)
        .map_err(|err| FetchFailure::malformed(provider, format!("invalid JSON payload: {err}")))
}

/// Providers disagree on whether numbers are JSON numbers or strings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub(crate) enum Numeric {
    Number(f64),
    Text(String),
}

impl Numeric {
    pub(crate) fn as_f64(&self) -> Option<f64> {
        let value = match self {
            Self::Number(value) => *value,
            Self::Text(text) => text.trim().parse::<f64>().ok()?,
        };
        value.is_finite().then_some(value)
    }
}

/// Required numeric field: absent is `NoData`, unreadable is `MalformedResponse`.
pub(crate) fn required(
    provider: ProviderId,
    field: &str,
    value: Option<&Numeric>,
) -> Result<f64, FetchFailure> {
    let raw = value.ok_or_else(|| {
        FetchFailure::no_data(provider, format!("response has no '{field}' field"))
    })?;
    raw.as_f64()
        .ok_or_else(|| FetchFailure::malformed(provider, format!("field '{field}' is not numeric")))
}

/// Optional numeric field: absent falls back to `default`, unreadable is malformed.
pub(crate) fn optional(
    provider: ProviderId,
    field: &str,
    value: Option<&Numeric>,
    default: f64,
) -> Result<f64, FetchFailure> {
    match value {
        None => Ok(default),
        Some(raw) => raw.as_f64().ok_or_else(|| {
            FetchFailure::malformed(provider, format!("field '{field}' is not numeric"))
        }),
    }
}

/// Volumes arrive as floats or strings; negative or unreadable volume counts as zero.
pub(crate) fn volume(value: Option<&Numeric>) -> u64 {
    value
        .and_then(Numeric::as_f64)
        .filter(|volume| *volume >= 0.0)
        .map(|volume| volume.round() as u64)
        .unwrap_or(0)
}
