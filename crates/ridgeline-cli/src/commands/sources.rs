use serde::Serialize;

use ridgeline_core::{HealthStatus, ProviderId};

use crate::error::CliError;

use super::{CommandResult, Context};

#[derive(Debug, Serialize)]
struct SourceStatus {
    id: ProviderId,
    enabled: bool,
    available: bool,
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    health: Option<HealthStatus>,
}

#[derive(Debug, Serialize)]
struct SourcesResponseData {
    cache_ttl_secs: u64,
    cached_entries: usize,
    sources: Vec<SourceStatus>,
}

pub async fn run(context: &Context) -> Result<CommandResult, CliError> {
    let mut sources = Vec::with_capacity(ProviderId::ALL.len());
    for id in ProviderId::ALL {
        let status = match context.orchestrator.snapshot(id).await {
            Some(snapshot) => SourceStatus {
                id,
                enabled: true,
                available: snapshot.available(),
                status: snapshot.status_label(),
                health: Some(snapshot.health),
            },
            None => SourceStatus {
                id,
                enabled: false,
                available: false,
                status: "disabled",
                health: None,
            },
        };
        sources.push(status);
    }

    let cache = context.orchestrator.cache();
    let data = serde_json::to_value(SourcesResponseData {
        cache_ttl_secs: cache.ttl().as_secs(),
        cached_entries: cache.len().await,
        sources,
    })?;

    Ok(CommandResult::ok(data))
}
