//! CLI argument definitions for ridgeline.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `show` | Resolve instruments and render their dashboards |
//! | `watch` | Re-render one dashboard on an interval |
//! | `watchlist` | List configured instruments and their candidate chains |
//! | `sources` | Provider health snapshot |
//!
//! # Global Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--format` | `table` | Output format (table, json) |
//! | `--pretty` | `false` | Pretty-print JSON output |
//! | `--log-level` | `warn` | Log level when `RUST_LOG` is unset |
//! | `--window` | `RIDGELINE_WINDOW` or `1y` | Lookback window (6mo, 1y, 2y) |
//!
//! # Examples
//!
//! ```bash
//! ridgeline show googl 445380
//! ridgeline show 445380 --cost-basis 19000 --refresh --format json --pretty
//! ridgeline watch ura --every-secs 60 --iterations 10
//! ```

use clap::{Args, Parser, Subcommand, ValueEnum};
use ridgeline_core::Window;

/// Multi-source portfolio dashboard for US and KRX listings.
#[derive(Debug, Parser)]
#[command(
    name = "ridgeline",
    author,
    version,
    about = "Portfolio dashboard with multi-source price fallback"
)]
pub struct Cli {
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,

    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    /// Log level used when `RUST_LOG` is not set.
    #[arg(long, global = true, value_enum, default_value_t = LogLevel::Warn)]
    pub log_level: LogLevel,

    /// Lookback window; overrides `RIDGELINE_WINDOW`.
    #[arg(long, global = true, value_parser = parse_window)]
    pub window: Option<Window>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Resolve instruments and render their dashboards.
    Show(ShowArgs),
    /// Re-render one dashboard on an interval.
    Watch(WatchArgs),
    /// List configured instruments and their candidate chains.
    Watchlist,
    /// Report provider health.
    Sources,
}

#[derive(Debug, Clone, Args)]
pub struct ShowArgs {
    /// Instrument ids from the watchlist.
    #[arg(required = true, num_args = 1..)]
    pub ids: Vec<String>,

    /// Cost basis override; zero or negative means no position.
    #[arg(long, allow_hyphen_values = true)]
    pub cost_basis: Option<String>,

    /// Skip the cached result and refetch.
    #[arg(long, default_value_t = false)]
    pub refresh: bool,
}

#[derive(Debug, Clone, Args)]
pub struct WatchArgs {
    pub id: String,

    #[arg(long, default_value_t = 60)]
    pub every_secs: u64,

    /// Stop after this many renders; runs until interrupted when omitted.
    #[arg(long)]
    pub iterations: Option<u64>,

    #[arg(long, allow_hyphen_values = true)]
    pub cost_basis: Option<String>,
}

fn parse_window(value: &str) -> Result<Window, String> {
    value.parse::<Window>().map_err(|error| error.to_string())
}
