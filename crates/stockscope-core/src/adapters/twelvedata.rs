use serde::Deserialize;
use time::OffsetDateTime;

use super::{
    decode, optional, required, volume, FetchFailure, Numeric, ProviderFuture, ProviderTransport,
    QuoteProvider,
};
use crate::cache::{CacheKey, RequestKind};
use crate::http_client::{HttpAuth, HttpRequest};
use crate::throttling::RateBudget;
use crate::{ChangePercent, MarketStatus, ProviderId, Quote, QuoteDraft, Symbol};

const QUOTE_URL: &str = "https://api.twelvedata.com/quote";
const PROVIDER: ProviderId = ProviderId::TwelveData;

/// Twelve Data `/quote`; works with the public `demo` key for a few tickers.
#[derive(Debug, Clone)]
pub struct TwelveDataAdapter {
    transport: ProviderTransport,
    budget: RateBudget,
    auth: HttpAuth,
}

impl TwelveDataAdapter {
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
}

impl QuoteProvider for TwelveDataAdapter {
    fn id(&self) -> ProviderId {
        PROVIDER
    }

    fn fetch_quote<'a>(&'a self, symbol: &'a Symbol) -> ProviderFuture<'a, Quote> {
        Box::pin(async move {
            let request = HttpRequest::get(QUOTE_URL)
                .with_query("symbol", symbol.as_str())
                .with_auth(&self.auth);
            let key = CacheKey::new(PROVIDER, symbol.clone(), RequestKind::Quote);
            let now = OffsetDateTime::now_utc();

            self.transport
                .fetch(&self.budget, key, request, |body| {
                    parse_twelvedata_quote(body, symbol, now)
                })
                .await
        })
    }
}

#[derive(Debug, Deserialize)]
struct QuotePayload {
    status: Option<String>,
    code: Option<u16>,
    message: Option<String>,
    close: Option<Numeric>,
    previous_close: Option<Numeric>,
    open: Option<Numeric>,
    high: Option<Numeric>,
    low: Option<Numeric>,
    volume: Option<Numeric>,
}

pub fn parse_twelvedata_quote(
    body: &str,
    symbol: &Symbol,
    now: OffsetDateTime,
) -> Result<Quote, FetchFailure> {
    let payload: QuotePayload = decode(PROVIDER, body)?;

    if payload.status.as_deref() == Some("error") {
        let message = payload
            .message
            .unwrap_or_else(|| String::from("unspecified error"));
        return Err(match payload.code {
            Some(429) => FetchFailure::rate_limited(PROVIDER, message),
            _ => FetchFailure::provider_error(PROVIDER, message),
        });
    }

    let price = required(PROVIDER, "close", payload.close.as_ref())?;
    let previous_close = required(PROVIDER, "previous_close", payload.previous_close.as_ref())?;
    let change = price - previous_close;

    QuoteDraft {
        symbol: symbol.clone(),
        price,
        change,
        change_percent: ChangePercent::between(price, previous_close),
        volume: volume(payload.volume.as_ref()),
        high: optional(PROVIDER, "high", payload.high.as_ref(), price)?,
        low: optional(PROVIDER, "low", payload.low.as_ref(), price)?,
        open: optional(PROVIDER, "open", payload.open.as_ref(), price)?,
        previous_close,
        as_of: now,
        market_status: Some(MarketStatus::at(now)),
        source: PROVIDER,
    }
    .build()
    .map_err(|err| FetchFailure::malformed(PROVIDER, err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::FailureKind;
    use time::macros::datetime;

    fn aapl() -> Symbol {
        Symbol::parse("AAPL").expect("valid symbol")
    }

    #[test]
    fn parses_string_encoded_quote() {
        let body = r#"{
            "symbol": "AAPL", "close": "175.43", "previous_close": "173.28",
            "open": "174.50", "high": "176.80", "low": "173.20", "volume": "45123000"
        }"#;

        let quote = parse_twelvedata_quote(body, &aapl(), datetime!(2024-03-05 16:00 UTC))
            .expect("quote parses");

        assert_eq!(quote.price, 175.43);
        assert_eq!(quote.change, 2.15);
        assert_eq!(quote.change_percent.to_string(), "+1.24%");
        assert_eq!(quote.volume, 45_123_000);
        assert_eq!(quote.market_status, Some(MarketStatus::Open));
        assert!(quote.last_updated.ends_with("(Twelve Data)"));
    }

    #[test]
    fn error_status_maps_to_provider_error_or_rate_limit() {
        let now = datetime!(2024-03-05 16:00 UTC);
        let generic = r#"{"status":"error","code":401,"message":"apikey parameter is incorrect"}"#;
        let limited = r#"{"status":"error","code":429,"message":"You have run out of API credits"}"#;

        let err = parse_twelvedata_quote(generic, &aapl(), now).expect_err("error status");
        assert_eq!(err.kind(), FailureKind::ProviderError);
        assert_eq!(err.message(), "apikey parameter is incorrect");

        let err = parse_twelvedata_quote(limited, &aapl(), now).expect_err("error status");
        assert_eq!(err.kind(), FailureKind::RateLimited);
    }

    #[test]
    fn missing_close_is_no_data_and_garbage_is_malformed() {
        let now = datetime!(2024-03-05 16:00 UTC);

        let err =
            parse_twelvedata_quote(r#"{"symbol":"AAPL"}"#, &aapl(), now).expect_err("no close");
        assert_eq!(err.kind(), FailureKind::NoData);

        let err = parse_twelvedata_quote(r#"{"close":"abc","previous_close":"1"}"#, &aapl(), now)
            .expect_err("non numeric");
        assert_eq!(err.kind(), FailureKind::MalformedResponse);

        let err = parse_twelvedata_quote("<html>", &aapl(), now).expect_err("not json");
        assert_eq!(err.kind(), FailureKind::MalformedResponse);
    }
}
