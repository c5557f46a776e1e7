use serde::Serialize;
use stockscope_core::{HistoricalSeries, ProviderId, Quote, StockAnalysis, Symbol};
use time::OffsetDateTime;

/// What a command produced, in the shape it is printed.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Payload {
    Analysis(Box<StockAnalysis>),
    Quote(Quote),
    History(HistoryData),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryData {
    pub symbol: Symbol,
    pub historical_data: HistoricalSeries,
}

/// Provenance and timing printed next to every payload.
///
/// Field order is fixed so JSON output stays stable between runs.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    pub source: ProviderId,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub source_chain: Vec<ProviderId>,
    pub simulated: bool,
    pub latency_ms: u64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub generated_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub data: Payload,
    pub meta: Metadata,
}
