mod analyze;
mod history;
mod quote;

use std::time::{Duration, Instant};

use stockscope_core::{FetchFailure, ProviderId, ServiceConfig, StockAnalyzer};
use time::OffsetDateTime;

use crate::cli::{Cli, Command};
use crate::error::CliError;
use crate::report::{Metadata, Payload, Report};

pub struct CommandResult {
    pub data: Payload,
    pub source: ProviderId,
    pub source_chain: Vec<ProviderId>,
    pub warnings: Vec<String>,
}

impl CommandResult {
    pub fn ok(data: Payload, source: ProviderId) -> Self {
        Self {
            data,
            source,
            source_chain: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn with_source_chain(mut self, source_chain: Vec<ProviderId>) -> Self {
        self.source_chain = source_chain;
        self
    }

    pub fn with_failures(mut self, failures: &[FetchFailure]) -> Self {
        self.warnings.extend(failures.iter().map(|failure| {
            format!(
                "{}: {} ({})",
                failure.provider(),
                failure.message(),
                failure.code()
            )
        }));
        self
    }

    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warnings.push(warning.into());
        self
    }

    fn into_report(self, latency_ms: u64) -> Report {
        let simulated = !self.source.is_upstream();
        Report {
            data: self.data,
            meta: Metadata {
                source: self.source,
                source_chain: self.source_chain,
                simulated,
                latency_ms,
                warnings: self.warnings,
                generated_at: OffsetDateTime::now_utc(),
            },
        }
    }
}

pub async fn run(cli: &Cli) -> Result<Report, CliError> {
    let analyzer = analyzer(cli, ServiceConfig::from_env());
    run_with(cli, &analyzer).await
}

pub async fn run_with(cli: &Cli, analyzer: &StockAnalyzer) -> Result<Report, CliError> {
    let started = Instant::now();

    let result = match &cli.command {
        Command::Analyze(args) => analyze::run(args, analyzer).await?,
        Command::Quote(args) => quote::run(args, analyzer).await?,
        Command::History(args) => history::run(args, analyzer).await?,
    };

    let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    Ok(result.into_report(latency_ms))
}

/// Analyzer for this invocation; command-line flags override the environment.
pub fn analyzer(cli: &Cli, mut config: ServiceConfig) -> StockAnalyzer {
    if let Some(timeout_ms) = cli.timeout_ms {
        config.provider_timeout = Duration::from_millis(timeout_ms);
    }

    let mut builder = StockAnalyzer::builder().config(config).offline(cli.offline);
    if let Some(seed) = cli.seed {
        builder = builder.seed(seed);
    }
    if cli.no_cache {
        builder = builder.no_cache();
    }
    builder.build()
}
