mod show;
mod sources;
mod watch;
mod watchlist;

use std::process::ExitCode;

use ridgeline_core::config::{self, AppConfig};
use ridgeline_core::{
    CandidateSymbol, Envelope, EnvelopeError, EnvelopeMeta, FallbackOrchestrator,
    FallbackOrchestratorBuilder, Provenance, Window,
};
use serde_json::Value;
use tracing::debug;

use crate::cli::{Cli, Command};
use crate::error::CliError;
use crate::output;

pub struct CommandResult {
    pub data: Value,
    pub warnings: Vec<String>,
    pub errors: Vec<EnvelopeError>,
    pub latency_ms: u64,
    pub cache_hit: bool,
    pub source_chain: Vec<CandidateSymbol>,
    pub provenance: Option<Provenance>,
    /// Instruments for which every source failed.
    pub exhausted: Vec<String>,
}

impl CommandResult {
    pub fn ok(data: Value) -> Self {
        Self {
            data,
            warnings: Vec::new(),
            errors: Vec::new(),
            latency_ms: 0,
            cache_hit: false,
            source_chain: Vec::new(),
            provenance: None,
            exhausted: Vec::new(),
        }
    }

    pub fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings.extend(warnings);
        self
    }

    pub fn with_errors(mut self, errors: Vec<EnvelopeError>) -> Self {
        self.errors.extend(errors);
        self
    }

    pub fn with_latency(mut self, latency_ms: u64) -> Self {
        self.latency_ms = latency_ms;
        self
    }

    pub fn with_cache_hit(mut self, cache_hit: bool) -> Self {
        self.cache_hit = cache_hit;
        self
    }

    pub fn with_source_chain(mut self, source_chain: Vec<CandidateSymbol>) -> Self {
        self.source_chain = source_chain;
        self
    }

    pub fn with_provenance(mut self, provenance: Option<Provenance>) -> Self {
        self.provenance = provenance;
        self
    }

    pub fn with_exhausted(mut self, exhausted: Vec<String>) -> Self {
        self.exhausted = exhausted;
        self
    }

    fn into_envelope(self) -> Result<(Envelope<Value>, Vec<String>), CliError> {
        let Self {
            data,
            warnings,
            errors,
            latency_ms,
            cache_hit,
            source_chain,
            provenance,
            exhausted,
        } = self;

        let mut meta = EnvelopeMeta::generate(latency_ms, cache_hit)
            .with_source_chain(source_chain)
            .with_provenance(provenance);
        for warning in warnings {
            meta.push_warning(warning);
        }

        Ok((Envelope::with_errors(meta, data, errors)?, exhausted))
    }
}

/// Process configuration and the orchestrator shared by every command.
pub struct Context {
    pub config: &'static AppConfig,
    pub orchestrator: FallbackOrchestrator,
    pub window: Window,
}

impl Context {
    pub fn load(cli: &Cli) -> Result<Self, CliError> {
        let config = config::install(AppConfig::from_env()?)?;
        let orchestrator = FallbackOrchestratorBuilder::from_config(config).build();
        let window = cli.window.unwrap_or(config.default_window);

        debug!(
            window = %window,
            instruments = config.watchlist.len(),
            providers = ?orchestrator.providers(),
            "configuration installed"
        );

        Ok(Self {
            config,
            orchestrator,
            window,
        })
    }
}

pub async fn run(cli: &Cli) -> Result<ExitCode, CliError> {
    let context = Context::load(cli)?;

    match &cli.command {
        Command::Show(args) => emit(cli, show::run(args, &context).await?),
        Command::Watch(args) => watch::run(args, &context, cli).await,
        Command::Watchlist => emit(cli, watchlist::run(&context)?),
        Command::Sources => emit(cli, sources::run(&context).await?),
    }
}

/// Renders one result; exhausted instruments surface as an exit-code error
/// after their failure notice has been printed.
pub(crate) fn emit(cli: &Cli, result: CommandResult) -> Result<ExitCode, CliError> {
    let (envelope, exhausted) = result.into_envelope()?;
    output::render(&envelope, cli.format, cli.pretty)?;

    if exhausted.is_empty() {
        Ok(ExitCode::SUCCESS)
    } else {
        Err(CliError::Exhausted {
            instruments: exhausted,
        })
    }
}
