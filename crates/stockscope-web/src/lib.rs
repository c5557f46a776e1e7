//! HTTP surface for stockscope.
//!
//! `POST /api/analyze` and `GET /api/analyze?symbol=` wrap
//! [`StockAnalyzer::analyze`](stockscope_core::StockAnalyzer::analyze);
//! `GET /health` is a liveness check.

pub mod error;
pub mod routes;
pub mod state;

use axum::http::{header, Method};
use axum::routing::get;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use error::ApiError;
pub use state::AppState;

pub fn create_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/health", get(routes::health::health))
        .route(
            "/api/analyze",
            get(routes::analyze::analyze_query).post(routes::analyze::analyze_body),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
