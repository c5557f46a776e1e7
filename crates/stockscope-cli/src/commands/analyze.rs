use stockscope_core::StockAnalyzer;
use tracing::debug;

use crate::cli::SymbolArgs;
use crate::error::CliError;
use crate::report::Payload;

use super::CommandResult;

pub async fn run(args: &SymbolArgs, analyzer: &StockAnalyzer) -> Result<CommandResult, CliError> {
    let route = analyzer.analyze_route(&args.symbol).await?;
    let source = route.analysis.quote.source;
    let history_source = route.history_source;
    let points = route.analysis.historical_data.len();
    debug!(%source, %history_source, points, "analyze command resolved");

    let mut result = CommandResult::ok(Payload::Analysis(Box::new(route.analysis)), source)
        .with_source_chain(route.quote_chain)
        .with_failures(&route.failures);
    if !source.is_upstream() {
        result = result.with_warning("no provider returned a quote; figures are simulated");
    }
    if !history_source.is_upstream() {
        result = result.with_warning(format!(
            "no provider returned daily history; the {points} closes are simulated"
        ));
    }
    Ok(result)
}
