use stockscope_core::{ServiceConfig, StockAnalyzer};
use stockscope_web::{create_app, AppState};
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // a missing .env file is the normal case
    let _ = dotenvy::dotenv();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = ServiceConfig::from_env();
    if !config.has_credentials() {
        warn!(
            "no provider API keys configured, relying on demo keys, Yahoo Finance and simulated data"
        );
    }
    let bind_addr = config.bind_addr.clone();
    let state = AppState::new(StockAnalyzer::builder().config(config).build());

    let listener = TcpListener::bind(&bind_addr).await?;
    info!(addr = %listener.local_addr()?, "stockscope-web listening");
    axum::serve(listener, create_app(state)).await?;

    Ok(())
}
