use serde::Deserialize;
use time::OffsetDateTime;

use super::{
    decode, optional, FetchFailure, Numeric, ProviderFuture, ProviderTransport, QuoteProvider,
};
use crate::cache::{CacheKey, RequestKind};
use crate::http_client::{HttpAuth, HttpRequest};
use crate::throttling::RateBudget;
use crate::{ChangePercent, ProviderId, Quote, QuoteDraft, Symbol};

const QUOTE_URL: &str = "https://finnhub.io/api/v1/quote";
const PROVIDER: ProviderId = ProviderId::Finnhub;

/// Finnhub `/quote`. The basic quote carries no volume or session status.
#[derive(Debug, Clone)]
pub struct FinnhubAdapter {
    transport: ProviderTransport,
    budget: RateBudget,
    auth: HttpAuth,
}

impl FinnhubAdapter {
    pub fn new(transport: ProviderTransport, api_key: impl Into<String>) -> Self {
        Self {
            transport,
            budget: RateBudget::for_provider(PROVIDER),
            auth: HttpAuth::header("X-Finnhub-Token", api_key),
        }
    }

    pub fn with_budget(mut self, budget: RateBudget) -> Self {
        self.budget = budget;
        self
    }
}

impl QuoteProvider for FinnhubAdapter {
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
                    parse_finnhub_quote(body, symbol, now)
                })
                .await
        })
    }
}

#[derive(Debug, Deserialize)]
struct QuotePayload {
    error: Option<String>,
    c: Option<Numeric>,
    d: Option<Numeric>,
    dp: Option<Numeric>,
    h: Option<Numeric>,
    l: Option<Numeric>,
    o: Option<Numeric>,
    pc: Option<Numeric>,
}

pub fn parse_finnhub_quote(
    body: &str,
    symbol: &Symbol,
    now: OffsetDateTime,
) -> Result<Quote, FetchFailure> {
    let payload: QuotePayload = decode(PROVIDER, body)?;
    if let Some(error) = payload.error {
        return Err(FetchFailure::provider_error(PROVIDER, error));
    }

    // unknown tickers come back as all zeros
    let price = payload
        .c
        .as_ref()
        .and_then(Numeric::as_f64)
        .filter(|price| *price > 0.0)
        .ok_or_else(|| FetchFailure::no_data(PROVIDER, format!("no current price for {symbol}")))?;

    let non_zero = |value: Option<&Numeric>| value.and_then(Numeric::as_f64).filter(|v| *v > 0.0);
    let previous_close = non_zero(payload.pc.as_ref()).unwrap_or(price);
    let change = optional(PROVIDER, "d", payload.d.as_ref(), price - previous_close)?;
    let change_percent = match payload.dp.as_ref().and_then(Numeric::as_f64) {
        Some(value) => ChangePercent::new(value)
            .map_err(|err| FetchFailure::malformed(PROVIDER, err.to_string()))?,
        None => ChangePercent::between(price, previous_close),
    };

    QuoteDraft {
        symbol: symbol.clone(),
        price,
        change,
        change_percent,
        volume: 0,
        high: non_zero(payload.h.as_ref()).unwrap_or(price),
        low: non_zero(payload.l.as_ref()).unwrap_or(price),
        open: non_zero(payload.o.as_ref()).unwrap_or(price),
        previous_close,
        as_of: now,
        market_status: None,
        source: PROVIDER,
    }
    .build()
    .map_err(|err| FetchFailure::malformed(PROVIDER, err.to_string()))
}
