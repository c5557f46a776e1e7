use std::io::{self, Write};

use stockscope_core::{Quote, StockAnalysis};

use crate::cli::OutputFormat;
use crate::error::CliError;
use crate::report::{HistoryData, Payload, Report};

pub fn render(report: &Report, format: OutputFormat, pretty: bool) -> Result<(), CliError> {
    let stdout = io::stdout();
    let mut writer = stdout.lock();
    render_to(&mut writer, report, format, pretty)?;
    writer.flush()?;
    Ok(())
}

pub fn render_to<W: Write>(
    writer: &mut W,
    report: &Report,
    format: OutputFormat,
    pretty: bool,
) -> Result<(), CliError> {
    match format {
        OutputFormat::Json => {
            let payload = if pretty {
                serde_json::to_string_pretty(report)?
            } else {
                serde_json::to_string(report)?
            };
            writeln!(writer, "{payload}")?;
        }
        OutputFormat::Table => render_table(writer, report)?,
    }

    Ok(())
}

fn render_table<W: Write>(writer: &mut W, report: &Report) -> io::Result<()> {
    match &report.data {
        Payload::Analysis(analysis) => analysis_table(writer, analysis)?,
        Payload::Quote(quote) => quote_table(writer, quote)?,
        Payload::History(history) => history_table(writer, history)?,
    }

    let meta = &report.meta;
    writeln!(writer, "source        : {}", meta.source)?;
    if !meta.source_chain.is_empty() {
        let chain: Vec<&str> = meta.source_chain.iter().map(|id| id.as_str()).collect();
        writeln!(writer, "source_chain  : {}", chain.join(","))?;
    }
    writeln!(writer, "latency_ms    : {}", meta.latency_ms)?;
    if !meta.warnings.is_empty() {
        writeln!(writer, "warnings:")?;
        for warning in &meta.warnings {
            writeln!(writer, "  - {warning}")?;
        }
    }
    Ok(())
}

fn quote_table<W: Write>(writer: &mut W, quote: &Quote) -> io::Result<()> {
    writeln!(writer, "symbol        : {} ({})", quote.symbol, quote.name)?;
    writeln!(
        writer,
        "price         : {:.2} ({:+.2}, {})",
        quote.price, quote.change, quote.change_percent
    )?;
    writeln!(
        writer,
        "open/high/low : {:.2} / {:.2} / {:.2}",
        quote.open, quote.high, quote.low
    )?;
    writeln!(writer, "prev_close    : {:.2}", quote.previous_close)?;
    writeln!(writer, "volume        : {}", quote.volume)?;
    if let Some(status) = quote.market_status {
        writeln!(writer, "market        : {status:?}")?;
    }
    writeln!(writer, "last_updated  : {}", quote.last_updated)
}

fn analysis_table<W: Write>(writer: &mut W, analysis: &StockAnalysis) -> io::Result<()> {
    quote_table(writer, &analysis.quote)?;

    let indicators = &analysis.technical_indicators;
    writeln!(
        writer,
        "recommendation: {:?} ({:.1}% confidence)",
        analysis.recommendation, analysis.confidence
    )?;
    writeln!(writer, "rsi           : {:.2}", indicators.rsi)?;
    writeln!(writer, "trend         : {:?}", indicators.trend)?;
    writeln!(
        writer,
        "support/resist: {:.2} / {:.2}",
        indicators.support, indicators.resistance
    )?;
    writeln!(writer, "reasoning     : {}", analysis.reasoning)?;
    writeln!(writer, "history_days  : {}", analysis.historical_data.len())
}

fn history_table<W: Write>(writer: &mut W, history: &HistoryData) -> io::Result<()> {
    writeln!(writer, "symbol        : {}", history.symbol)?;
    for point in history.historical_data.points() {
        writeln!(writer, "  {}  {:>10.2}", point.date, point.price)?;
    }
    Ok(())
}
