use serde::Serialize;

use ridgeline_core::{Currency, KrxBoard};

use crate::error::CliError;

use super::{CommandResult, Context};

#[derive(Debug, Serialize)]
struct InstrumentRow {
    id: String,
    name: String,
    currency: Currency,
    #[serde(skip_serializing_if = "Option::is_none")]
    board: Option<KrxBoard>,
    cost_basis: f64,
    candidates: Vec<String>,
}

#[derive(Debug, Serialize)]
struct WatchlistResponseData {
    window: String,
    instruments: Vec<InstrumentRow>,
}

pub fn run(context: &Context) -> Result<CommandResult, CliError> {
    let instruments = context
        .config
        .watchlist
        .instruments()
        .iter()
        .map(|instrument| InstrumentRow {
            id: instrument.id.clone(),
            name: instrument.name.clone(),
            currency: instrument.currency,
            board: instrument.board,
            cost_basis: instrument.cost_basis.value(),
            candidates: instrument
                .candidates
                .iter()
                .map(ToString::to_string)
                .collect(),
        })
        .collect();

    let data = serde_json::to_value(WatchlistResponseData {
        window: context.window.to_string(),
        instruments,
    })?;

    Ok(CommandResult::ok(data))
}
