//! Value types shared by the providers, the indicator engine and the analyzer.

mod analysis;
mod history;
mod market;
mod quote;
mod symbol;

pub use analysis::{Recommendation, Signal, StockAnalysis, TechnicalIndicators, Trend};
pub use history::{parse_date_label, HistoricalPoint, HistoricalSeries};
pub use market::{is_us_session, provenance_label, MarketStatus, IST};
pub use quote::{company_name, round2, ChangePercent, Quote, QuoteDraft};
pub use symbol::Symbol;
