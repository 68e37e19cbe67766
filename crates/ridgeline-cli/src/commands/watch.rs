use std::process::ExitCode;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use crate::cli::{Cli, ShowArgs, WatchArgs};
use crate::error::CliError;

use super::{emit, show, Context};

/// Re-renders one dashboard every `every_secs`. Renders inside the cache TTL
/// are served from cache; the first render after expiry refetches.
pub async fn run(args: &WatchArgs, context: &Context, cli: &Cli) -> Result<ExitCode, CliError> {
    let show_args = ShowArgs {
        ids: vec![args.id.clone()],
        cost_basis: args.cost_basis.clone(),
        refresh: false,
    };
    let mut ticker = tokio::time::interval(Duration::from_secs(args.every_secs.max(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut outcome = Ok(ExitCode::SUCCESS);
    let mut iteration = 0_u64;

    while args.iterations.map_or(true, |limit| iteration < limit) {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = tokio::signal::ctrl_c() => {
                info!(iteration, "watch interrupted");
                break;
            }
        }
        iteration += 1;

        let result = show::run(&show_args, context).await?;
        info!(
            iteration,
            instrument = %args.id,
            cache_hit = result.cache_hit,
            "watch render"
        );

        match emit(cli, result) {
            Ok(code) => outcome = Ok(code),
            Err(error @ CliError::Exhausted { .. }) => {
                warn!(iteration, %error, "watch render had no data");
                outcome = Err(error);
            }
            Err(error) => return Err(error),
        }
    }

    outcome
}
