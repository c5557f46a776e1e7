use stockscope_core::{AnalysisError, StockAnalyzer, Symbol};
use tracing::debug;

use crate::cli::HistoryArgs;
use crate::error::CliError;
use crate::report::{HistoryData, Payload};

use super::CommandResult;

pub async fn run(args: &HistoryArgs, analyzer: &StockAnalyzer) -> Result<CommandResult, CliError> {
    let symbol = Symbol::parse(&args.symbol)
        .map_err(|reason| AnalysisError::invalid_symbol(&args.symbol, reason))?;
    let days = args
        .days
        .map(|days| {
            usize::try_from(days)
                .map_err(|_| CliError::InvalidArgument(format!("--days {days} is out of range")))
        })
        .transpose()?;

    let route = analyzer.history(symbol.as_str(), days).await?;
    debug!(
        %symbol,
        source = %route.source,
        points = route.series.len(),
        "history command resolved"
    );

    let data = Payload::History(HistoryData {
        symbol,
        historical_data: route.series,
    });
    Ok(CommandResult::ok(data, route.source).with_failures(&route.failures))
}
