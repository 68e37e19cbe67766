use std::time::Instant;

use serde::Serialize;

use ridgeline_core::dashboard::exhaustion_notice;
use ridgeline_core::{CacheMode, CostBasis, DashboardView, EnvelopeError};

use crate::cli::ShowArgs;
use crate::error::CliError;

use super::{CommandResult, Context};

#[derive(Debug, Serialize)]
struct Failure {
    instrument_id: String,
    notice: String,
}

#[derive(Debug, Serialize)]
struct ShowResponseData {
    window: String,
    dashboards: Vec<DashboardView>,
    failures: Vec<Failure>,
}

pub async fn run(args: &ShowArgs, context: &Context) -> Result<CommandResult, CliError> {
    let started = Instant::now();
    let cost_override = args
        .cost_basis
        .as_deref()
        .map(CostBasis::parse)
        .transpose()?;
    let mode = if args.refresh {
        CacheMode::Refresh
    } else {
        CacheMode::Use
    };

    let mut dashboards = Vec::new();
    let mut failures = Vec::new();
    let mut warnings = Vec::new();
    let mut errors = Vec::new();
    let mut source_chain = Vec::new();
    let mut exhausted = Vec::new();

    for id in &args.ids {
        let instrument = context.config.watchlist.get(id)?;
        let cost_basis = cost_override.unwrap_or(instrument.cost_basis);

        match context
            .orchestrator
            .resolve_with(instrument, context.window, mode)
            .await
        {
            Ok(resolved) => {
                let view = DashboardView::build(instrument, cost_basis, &resolved).ok_or_else(
                    || CliError::Command(format!("resolved an empty series for '{}'", instrument.id)),
                )?;
                source_chain.extend(resolved.source_chain());
                warnings.extend(resolved.warnings.iter().cloned());
                dashboards.push(view);
            }
            Err(error) => {
                errors.extend(error.attempts.iter().map(EnvelopeError::from_attempt));
                failures.push(Failure {
                    instrument_id: instrument.id.clone(),
                    notice: exhaustion_notice(&error),
                });
                exhausted.push(instrument.id.clone());
            }
        }
    }

    let cache_hit = !dashboards.is_empty() && dashboards.iter().all(|view| view.cache_hit);
    let provenance = match dashboards.as_slice() {
        [only] => Some(only.provenance.clone()),
        _ => None,
    };

    let data = serde_json::to_value(ShowResponseData {
        window: context.window.to_string(),
        dashboards,
        failures,
    })?;

    Ok(CommandResult::ok(data)
        .with_warnings(warnings)
        .with_errors(errors)
        .with_latency(started.elapsed().as_millis().try_into().unwrap_or(u64::MAX))
        .with_cache_hit(cache_hit)
        .with_source_chain(source_chain)
        .with_provenance(provenance)
        .with_exhausted(exhausted))
}
