use std::sync::Arc;

use stockscope_core::StockAnalyzer;

/// Shared by every handler; the analyzer owns the response cache.
#[derive(Clone)]
pub struct AppState {
    pub analyzer: Arc<StockAnalyzer>,
}

impl AppState {
    pub fn new(analyzer: StockAnalyzer) -> Self {
        Self {
            analyzer: Arc::new(analyzer),
        }
    }
}
