use std::collections::HashMap;

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::Json;
use serde::Serialize;
use serde_json::Value;
use stockscope_core::StockAnalysis;
use time::OffsetDateTime;
use tracing::{info, instrument};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub success: bool,
    pub data: StockAnalysis,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

/// `POST /api/analyze` with `{"symbol": "AAPL"}`.
#[instrument(skip_all)]
pub async fn analyze_body(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<AnalyzeResponse>, ApiError> {
    let payload: Value = serde_json::from_slice(&body)
        .map_err(|_| ApiError::BadRequest("Request body must be a JSON object"))?;
    let symbol = payload
        .get("symbol")
        .and_then(Value::as_str)
        .filter(|symbol| !symbol.is_empty())
        .ok_or(ApiError::BadRequest("Symbol is required and must be a string"))?;

    respond(&state, symbol).await
}

/// `GET /api/analyze?symbol=AAPL`.
#[instrument(skip_all)]
pub async fn analyze_query(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<AnalyzeResponse>, ApiError> {
    let symbol = params
        .get("symbol")
        .map(String::as_str)
        .filter(|symbol| !symbol.is_empty())
        .ok_or(ApiError::BadRequest("Symbol parameter is required"))?;

    respond(&state, symbol).await
}

async fn respond(state: &AppState, symbol: &str) -> Result<Json<AnalyzeResponse>, ApiError> {
    let analysis = state.analyzer.analyze(symbol).await?;
    info!(
        symbol = %analysis.quote.symbol,
        recommendation = ?analysis.recommendation,
        simulated = analysis.quote.is_simulated(),
        "analysis served"
    );

    Ok(Json(AnalyzeResponse {
        success: true,
        data: analysis,
        timestamp: OffsetDateTime::now_utc(),
    }))
}
