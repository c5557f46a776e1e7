use stockscope_core::StockAnalyzer;
use tracing::debug;

use crate::cli::SymbolArgs;
use crate::error::CliError;
use crate::report::Payload;

use super::CommandResult;

pub async fn run(args: &SymbolArgs, analyzer: &StockAnalyzer) -> Result<CommandResult, CliError> {
    let route = analyzer.quote(&args.symbol).await?;
    debug!(
        source = %route.selected_source,
        attempted = route.source_chain.len(),
        latency_ms = route.latency_ms,
        "quote command resolved"
    );

    Ok(CommandResult::ok(Payload::Quote(route.quote), route.selected_source)
        .with_source_chain(route.source_chain)
        .with_failures(&route.failures))
}
