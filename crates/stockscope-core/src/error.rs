use thiserror::Error;

/// Validation and contract errors exposed by `stockscope-core`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("symbol cannot be empty")]
    EmptySymbol,
    #[error("symbol length {len} exceeds max {max}")]
    SymbolTooLong { len: usize, max: usize },
    #[error("symbol contains invalid character '{ch}' at index {index}")]
    SymbolInvalidChar { ch: char, index: usize },

    #[error("field '{field}' must be finite")]
    NonFiniteValue { field: &'static str },
    #[error("field '{field}' must be non-negative")]
    NegativeValue { field: &'static str },
    #[error("quote high must be >= low")]
    InvalidPriceRange,

    #[error("change percent must look like '+1.24%': '{value}'")]
    InvalidChangePercent { value: String },

    #[error("historical series must be in chronological order")]
    UnorderedSeries,
    #[error("history window must be greater than zero")]
    EmptyWindow,
}

/// Errors that escape [`StockAnalyzer::analyze`](crate::StockAnalyzer::analyze).
///
/// Upstream failures never surface here; they are absorbed by the fallback
/// chain and the synthetic data path.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AnalysisError {
    #[error("'{input}' is not a valid ticker symbol: {reason}")]
    InvalidSymbol {
        input: String,
        #[source]
        reason: ValidationError,
    },

    #[error("internal analysis error: {0}")]
    Internal(String),
}

impl AnalysisError {
    pub fn invalid_symbol(input: impl Into<String>, reason: ValidationError) -> Self {
        Self::InvalidSymbol {
            input: input.into(),
            reason,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidSymbol { .. } => "analysis.invalid_symbol",
            Self::Internal(_) => "analysis.internal",
        }
    }
}
