//! Process configuration: settings from the environment plus the watchlist.
//!
//! Configuration is built once at start-up, validated eagerly, and installed
//! into process-wide read-only state with [`install`]. Instrument candidate
//! lists are resolved here, at load time, so a misconfigured instrument
//! fails before any fetch is attempted.
//!
//! | Variable | Default | Meaning |
//! |----------|---------|---------|
//! | `RIDGELINE_CACHE_TTL_SECS` | `300` | result cache TTL, `0` disables caching |
//! | `RIDGELINE_HTTP_TIMEOUT_MS` | `5000` | per-request upstream timeout |
//! | `RIDGELINE_WINDOW` | `1y` | default window (`6mo`, `1y`, `2y`) |
//! | `RIDGELINE_DISABLE_YAHOO` | unset | `1`/`true` removes Yahoo candidates |
//! | `RIDGELINE_DISABLE_NAVER` | unset | `1`/`true` removes Naver candidates |
//! | `RIDGELINE_WATCHLIST` | built-in | path to a JSON watchlist file |

use std::collections::HashSet;
use std::env;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;

use serde::Deserialize;

use crate::http_client::DEFAULT_TIMEOUT_MS;
use crate::symbols::resolve_candidates;
use crate::{
    CandidateSymbol, ConfigError, CostBasis, Currency, Instrument, KrxBoard, ProviderId, Window,
};

pub const ENV_CACHE_TTL_SECS: &str = "RIDGELINE_CACHE_TTL_SECS";
pub const ENV_HTTP_TIMEOUT_MS: &str = "RIDGELINE_HTTP_TIMEOUT_MS";
pub const ENV_WINDOW: &str = "RIDGELINE_WINDOW";
pub const ENV_DISABLE_YAHOO: &str = "RIDGELINE_DISABLE_YAHOO";
pub const ENV_DISABLE_NAVER: &str = "RIDGELINE_DISABLE_NAVER";
pub const ENV_WATCHLIST: &str = "RIDGELINE_WATCHLIST";

pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

static INSTALLED: OnceLock<AppConfig> = OnceLock::new();

/// Installs the process-wide configuration. Only the first call succeeds.
pub fn install(config: AppConfig) -> Result<&'static AppConfig, ConfigError> {
    INSTALLED
        .set(config)
        .map_err(|_| ConfigError::AlreadyInstalled)?;
    get().ok_or(ConfigError::NotInstalled)
}

/// The installed configuration, if any.
pub fn get() -> Option<&'static AppConfig> {
    INSTALLED.get()
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub cache_ttl: Duration,
    pub default_window: Window,
    pub http_timeout_ms: u64,
    pub yahoo_enabled: bool,
    pub naver_enabled: bool,
    pub watchlist: Watchlist,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            cache_ttl: DEFAULT_CACHE_TTL,
            default_window: Window::default(),
            http_timeout_ms: DEFAULT_TIMEOUT_MS,
            yahoo_enabled: true,
            naver_enabled: true,
            watchlist: Watchlist::builtin(&ProviderId::ALL),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let cache_ttl = match lookup(ENV_CACHE_TTL_SECS) {
            Some(raw) => Duration::from_secs(parse_env(ENV_CACHE_TTL_SECS, &raw)?),
            None => DEFAULT_CACHE_TTL,
        };
        let http_timeout_ms = match lookup(ENV_HTTP_TIMEOUT_MS) {
            Some(raw) => match parse_env::<u64>(ENV_HTTP_TIMEOUT_MS, &raw)? {
                0 => return Err(invalid_env(ENV_HTTP_TIMEOUT_MS, &raw)),
                value => value,
            },
            None => DEFAULT_TIMEOUT_MS,
        };
        let default_window = match lookup(ENV_WINDOW) {
            Some(raw) => raw
                .parse::<Window>()
                .map_err(|_| invalid_env(ENV_WINDOW, &raw))?,
            None => Window::default(),
        };
        let yahoo_enabled = !parse_flag(ENV_DISABLE_YAHOO, lookup(ENV_DISABLE_YAHOO))?;
        let naver_enabled = !parse_flag(ENV_DISABLE_NAVER, lookup(ENV_DISABLE_NAVER))?;

        let enabled: Vec<ProviderId> = ProviderId::ALL
            .into_iter()
            .filter(|provider| match provider {
                ProviderId::Yahoo => yahoo_enabled,
                ProviderId::Naver => naver_enabled,
            })
            .collect();

        let watchlist = match lookup(ENV_WATCHLIST) {
            Some(path) if !path.trim().is_empty() => Watchlist::load(path.trim(), &enabled)?,
            _ => Watchlist::try_builtin(&enabled)?,
        };

        Ok(Self {
            cache_ttl,
            default_window,
            http_timeout_ms,
            yahoo_enabled,
            naver_enabled,
            watchlist,
        })
    }

    pub fn enabled_providers(&self) -> Vec<ProviderId> {
        ProviderId::ALL
            .into_iter()
            .filter(|provider| match provider {
                ProviderId::Yahoo => self.yahoo_enabled,
                ProviderId::Naver => self.naver_enabled,
            })
            .collect()
    }
}

/// One watchlist entry as written in a JSON watchlist file.
#[derive(Debug, Clone, Deserialize)]
pub struct WatchlistEntry {
    pub id: String,
    pub name: String,
    pub currency: String,
    pub code: String,
    #[serde(default)]
    pub board: Option<String>,
    pub cost_basis: CostBasisInput,
    /// Explicit retry order; derived from currency and code when absent.
    #[serde(default)]
    pub candidates: Option<Vec<CandidateSymbol>>,
}

/// Cost basis as a JSON number or as text such as `"₩20,232"`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum CostBasisInput {
    Number(f64),
    Text(String),
}

impl CostBasisInput {
    fn parse(&self) -> Result<CostBasis, ConfigError> {
        match self {
            Self::Number(value) => CostBasis::new(*value),
            Self::Text(text) => CostBasis::parse(text),
        }
    }
}

/// Validated, immutable list of instruments.
#[derive(Debug, Clone, PartialEq)]
pub struct Watchlist {
    instruments: Vec<Instrument>,
}

impl Watchlist {
    pub fn from_entries(
        entries: Vec<WatchlistEntry>,
        enabled: &[ProviderId],
    ) -> Result<Self, ConfigError> {
        if entries.is_empty() {
            return Err(ConfigError::EmptyWatchlist);
        }

        let mut seen = HashSet::new();
        let mut instruments = Vec::with_capacity(entries.len());
        for entry in entries {
            let instrument = build_instrument(entry, enabled)?;
            if !seen.insert(instrument.id.to_ascii_lowercase()) {
                return Err(ConfigError::DuplicateInstrument { id: instrument.id });
            }
            instruments.push(instrument);
        }

        Ok(Self { instruments })
    }

    pub fn load(path: impl AsRef<Path>, enabled: &[ProviderId]) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let display = path.display().to_string();
        let raw = fs::read_to_string(path).map_err(|e| ConfigError::WatchlistRead {
            path: display.clone(),
            message: e.to_string(),
        })?;
        let entries: Vec<WatchlistEntry> =
            serde_json::from_str(&raw).map_err(|e| ConfigError::WatchlistParse {
                path: display,
                message: e.to_string(),
            })?;
        Self::from_entries(entries, enabled)
    }

    /// Built-in watchlist: seven US listings and seven KRX listings.
    pub fn try_builtin(enabled: &[ProviderId]) -> Result<Self, ConfigError> {
        let entries = BUILTIN
            .iter()
            .map(|&(id, name, currency, code, board, cost)| WatchlistEntry {
                id: id.to_owned(),
                name: name.to_owned(),
                currency: currency.to_owned(),
                code: code.to_owned(),
                board: board.map(str::to_owned),
                cost_basis: CostBasisInput::Number(cost),
                candidates: None,
            })
            .collect();
        Self::from_entries(entries, enabled)
    }

    /// Built-in watchlist resolved for `enabled`; empty if no provider can serve it.
    pub fn builtin(enabled: &[ProviderId]) -> Self {
        Self::try_builtin(enabled).unwrap_or(Self {
            instruments: Vec::new(),
        })
    }

    pub fn get(&self, id: &str) -> Result<&Instrument, ConfigError> {
        let needle = id.trim();
        self.instruments
            .iter()
            .find(|instrument| instrument.id.eq_ignore_ascii_case(needle))
            .ok_or_else(|| ConfigError::UnknownInstrument {
                id: needle.to_owned(),
            })
    }

    pub fn instruments(&self) -> &[Instrument] {
        &self.instruments
    }

    pub fn len(&self) -> usize {
        self.instruments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instruments.is_empty()
    }
}

fn build_instrument(
    entry: WatchlistEntry,
    enabled: &[ProviderId],
) -> Result<Instrument, ConfigError> {
    let id = entry.id.trim().to_owned();
    if id.is_empty() {
        return Err(ConfigError::EmptyInstrumentId);
    }
    let invalid = |source| ConfigError::InvalidInstrument {
        id: id.clone(),
        source,
    };

    let currency: Currency = entry.currency.parse().map_err(invalid)?;
    let board = entry
        .board
        .as_deref()
        .map(str::parse::<KrxBoard>)
        .transpose()
        .map_err(invalid)?;
    let cost_basis = entry.cost_basis.parse()?;

    let candidates = match entry.candidates {
        Some(explicit) => explicit
            .into_iter()
            .filter(|candidate| enabled.contains(&candidate.provider))
            .collect(),
        None => resolve_candidates(currency, &entry.code, board, enabled).map_err(invalid)?,
    };

    Instrument::new(
        id.clone(),
        entry.name,
        currency,
        entry.code,
        board,
        cost_basis,
        candidates,
    )
}

type BuiltinEntry = (
    &'static str,
    &'static str,
    &'static str,
    &'static str,
    Option<&'static str>,
    f64,
);

const BUILTIN: [BuiltinEntry; 14] = [
    ("grid", "그리드 (GRID)", "USD", "GRID", None, 156.05),
    ("ura", "우라늄 (URA)", "USD", "URA", None, 51.93),
    ("pl", "팔란티어 (PL)", "USD", "PL", None, 23.3),
    ("alab", "아스테라 랩스 (ALAB)", "USD", "ALAB", None, 179.8525),
    ("googl", "구글 (GOOGL)", "USD", "GOOGL", None, 341.9194),
    ("rklb", "로켓랩 (RKLB)", "USD", "RKLB", None, 78.585),
    ("qbts", "디웨이브 퀀텀 (QBTS)", "USD", "QBTS", None, 28.68),
    ("445380", "K-반도체 (HANARO)", "KRW", "445380", Some("kospi"), 20_232.0),
    ("475370", "AI반도체소부장 (SOL)", "KRW", "475370", Some("kospi"), 19_330.0),
    ("465540", "전고체배터리 (SOL)", "KRW", "465540", Some("kospi"), 16_968.0),
    ("475380", "코리아휴머노이드 (TIGER)", "KRW", "475380", Some("kospi"), 13_026.0),
    ("415480", "현대차그룹플러스 (TIGER)", "KRW", "415480", Some("kospi"), 55_794.0),
    ("159400", "코스닥150 (KODEX)", "KRW", "159400", Some("kosdaq"), 19_540.0),
    ("466920", "조선 TOP3 (SOL)", "KRW", "466920", Some("kospi"), 38_282.0),
];

fn parse_env<T: std::str::FromStr>(name: &'static str, raw: &str) -> Result<T, ConfigError> {
    raw.trim().parse().map_err(|_| invalid_env(name, raw))
}

fn parse_flag(name: &'static str, raw: Option<String>) -> Result<bool, ConfigError> {
    let Some(raw) = raw else {
        return Ok(false);
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "" | "0" | "false" | "no" => Ok(false),
        "1" | "true" | "yes" => Ok(true),
        _ => Err(invalid_env(name, &raw)),
    }
}

fn invalid_env(name: &'static str, raw: &str) -> ConfigError {
    ConfigError::InvalidEnv {
        name,
        value: raw.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_watchlist_has_fourteen_instruments() {
        let watchlist = Watchlist::builtin(&ProviderId::ALL);

        assert_eq!(watchlist.len(), 14);
        assert!(watchlist
            .instruments()
            .iter()
            .all(|instrument| !instrument.candidates.is_empty()));

        let kosdaq = watchlist.get("159400").expect("builtin entry");
        assert_eq!(kosdaq.candidates[0].to_string(), "yahoo:159400.KQ");
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let watchlist = Watchlist::builtin(&ProviderId::ALL);
        assert_eq!(watchlist.get("GOOGL").expect("known").id, "googl");
        assert!(matches!(
            watchlist.get("tsla"),
            Err(ConfigError::UnknownInstrument { .. })
        ));
    }

    #[test]
    fn flags_accept_common_spellings() {
        assert_eq!(parse_flag("X", Some(String::from("TRUE"))), Ok(true));
        assert_eq!(parse_flag("X", Some(String::from("0"))), Ok(false));
        assert_eq!(parse_flag("X", None), Ok(false));
        assert!(parse_flag("X", Some(String::from("maybe"))).is_err());
    }
}
