//! Core contracts for stockscope.
//!
//! This crate contains:
//! - Canonical quote, history and analysis models with validation
//! - Provider adapters behind a response cache and request budgets
//! - The quote fallback chain and history fetcher, both ending in simulated data
//! - RSI/trend/support-resistance indicators and the recommendation scorer
//! - [`StockAnalyzer`], the single `analyze(symbol)` entry point

pub mod adapters;
pub mod analysis;
pub mod cache;
pub mod config;
pub mod domain;
pub mod error;
pub mod history;
pub mod http_client;
pub mod indicators;
pub mod recommendation;
pub mod routing;
pub mod source;
pub mod synthetic;
pub mod throttling;

pub use adapters::{
    AlphaVantageAdapter, FailureKind, FetchFailure, FinnhubAdapter, HistoryProvider,
    ProviderFuture, ProviderTransport, QuoteProvider, TwelveDataAdapter, YahooAdapter,
};
pub use analysis::{compose, AnalysisRoute, StockAnalyzer, StockAnalyzerBuilder};
pub use cache::{CacheKey, RequestKind, ResponseCache};
pub use config::ServiceConfig;
pub use domain::{
    company_name, is_us_session, parse_date_label, provenance_label, round2, ChangePercent,
    HistoricalPoint, HistoricalSeries, MarketStatus, Quote, QuoteDraft, Recommendation, Signal,
    StockAnalysis, Symbol, TechnicalIndicators, Trend, IST,
};
pub use error::{AnalysisError, ValidationError};
pub use history::{HistoryFetcher, HistoryRoute, DEFAULT_HISTORY_DAYS};
pub use http_client::{
    HttpAuth, HttpClient, HttpError, HttpRequest, HttpResponse, NoopHttpClient, ReqwestHttpClient,
};
pub use routing::{QuoteChain, QuoteRoute};
pub use source::ProviderId;
pub use synthetic::SyntheticMarket;
pub use throttling::RateBudget;
