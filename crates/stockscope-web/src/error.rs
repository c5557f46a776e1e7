use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use stockscope_core::AnalysisError;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(&'static str),

    #[error("\"{input}\" is not a valid ticker symbol. Please use symbols like AAPL, GOOGL, MSFT.")]
    InvalidSymbol { input: String },

    #[error("Failed to analyze stock. Please try again later.")]
    Internal(String),
}

impl ApiError {
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) | Self::InvalidSymbol { .. } => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<AnalysisError> for ApiError {
    fn from(value: AnalysisError) -> Self {
        match value {
            AnalysisError::InvalidSymbol { input, .. } => Self::InvalidSymbol { input },
            AnalysisError::Internal(message) => Self::Internal(message),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let Self::Internal(detail) = &self {
            error!(%detail, "stock analysis failed");
        }
        let body = Json(json!({ "error": self.to_string() }));
        (self.status(), body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockscope_core::ValidationError;

    #[test]
    fn invalid_symbol_message_quotes_the_raw_input() {
        let err = ApiError::from(AnalysisError::invalid_symbol(
            "brk.b",
            ValidationError::SymbolInvalidChar { ch: '.', index: 3 },
        ));

        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            err.to_string(),
            "\"brk.b\" is not a valid ticker symbol. Please use symbols like AAPL, GOOGL, MSFT."
        );
    }

    #[test]
    fn internal_detail_is_not_exposed() {
        let err = ApiError::from(AnalysisError::internal("non-finite indicator output for AAPL"));

        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!err.to_string().contains("non-finite"));
    }
}
