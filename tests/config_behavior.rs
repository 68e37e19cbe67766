//! Behavior-driven tests for configuration loading.
//!
//! Configuration problems must surface when the watchlist or environment is
//! read, never later when a price is fetched.

use std::collections::HashMap;
use std::io::Write;
use std::time::Duration;

use ridgeline_core::config::{
    self, AppConfig, Watchlist, ENV_CACHE_TTL_SECS, ENV_DISABLE_NAVER, ENV_HTTP_TIMEOUT_MS,
    ENV_WATCHLIST, ENV_WINDOW,
};
use ridgeline_core::{ConfigError, CostBasis, ProviderId, Window};

fn write_watchlist(json: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    file.write_all(json.as_bytes()).expect("write watchlist");
    file
}

fn lookup(vars: &[(&'static str, String)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<&'static str, String> = vars.iter().cloned().collect();
    move |name: &str| vars.get(name).cloned()
}

// =============================================================================
// Watchlist files
// =============================================================================

#[test]
fn watchlist_file_derives_candidates_when_absent() {
    // Given: a KOSDAQ listing without explicit candidates
    let file = write_watchlist(
        r#"[{"id":"159400","name":"KOSDAQ150","currency":"KRW","code":"159400","board":"kosdaq","cost_basis":"₩19,540"}]"#,
    );

    // When: the watchlist is loaded with both providers enabled
    let watchlist = Watchlist::load(file.path(), &ProviderId::ALL).expect("valid watchlist");

    // Then: the KOSDAQ suffix is tried first and Naver comes last
    let instrument = watchlist.get("159400").expect("present");
    let chain: Vec<String> = instrument
        .candidates
        .iter()
        .map(ToString::to_string)
        .collect();
    assert_eq!(
        chain,
        vec![
            "yahoo:159400.KQ",
            "yahoo:159400.KS",
            "yahoo:159400",
            "naver:159400"
        ]
    );
    assert_eq!(instrument.cost_basis, CostBasis::new(19_540.0).expect("cost"));
}

#[test]
fn explicit_candidates_are_used_verbatim() {
    let file = write_watchlist(
        r#"[{"id":"ura","name":"Uranium","currency":"USD","code":"URA","cost_basis":51.93,
             "candidates":[{"provider":"yahoo","symbol":"ura"},{"provider":"naver","symbol":"URA"}]}]"#,
    );

    let watchlist = Watchlist::load(file.path(), &[ProviderId::Yahoo]).expect("valid watchlist");

    // Naver is disabled, so only the Yahoo spelling survives
    let instrument = watchlist.get("URA").expect("case-insensitive lookup");
    assert_eq!(instrument.candidates.len(), 1);
    assert_eq!(instrument.candidates[0].to_string(), "yahoo:URA");
}

#[test]
fn instrument_with_no_candidates_fails_at_load() {
    // Given: a KRX listing whose only candidate belongs to a disabled provider
    let file = write_watchlist(
        r#"[{"id":"445380","name":"K-semis","currency":"KRW","code":"445380","cost_basis":20232,
             "candidates":[{"provider":"naver","symbol":"445380"}]}]"#,
    );

    // When: the watchlist is loaded without Naver
    let error = Watchlist::load(file.path(), &[ProviderId::Yahoo]).expect_err("must fail");

    // Then: the configuration error names the instrument
    assert_eq!(
        error,
        ConfigError::EmptyCandidates {
            id: String::from("445380")
        }
    );
}

#[test]
fn duplicate_ids_are_rejected() {
    let file = write_watchlist(
        r#"[{"id":"grid","name":"Grid","currency":"USD","code":"GRID","cost_basis":156.05},
            {"id":"GRID","name":"Grid again","currency":"USD","code":"GRID","cost_basis":1}]"#,
    );

    let error = Watchlist::load(file.path(), &ProviderId::ALL).expect_err("must fail");

    assert!(matches!(error, ConfigError::DuplicateInstrument { .. }));
}

#[test]
fn non_numeric_cost_basis_is_rejected() {
    let file = write_watchlist(
        r#"[{"id":"grid","name":"Grid","currency":"USD","code":"GRID","cost_basis":"lots"}]"#,
    );

    let error = Watchlist::load(file.path(), &ProviderId::ALL).expect_err("must fail");

    assert_eq!(
        error,
        ConfigError::InvalidCostBasis {
            value: String::from("lots")
        }
    );
}

#[test]
fn zero_cost_basis_loads_as_no_position() {
    let file = write_watchlist(
        r#"[{"id":"grid","name":"Grid","currency":"USD","code":"GRID","cost_basis":0}]"#,
    );

    let watchlist = Watchlist::load(file.path(), &ProviderId::ALL).expect("valid");

    assert!(!watchlist.get("grid").expect("present").cost_basis.has_position());
}

#[test]
fn unreadable_or_malformed_files_are_reported() {
    let missing = Watchlist::load("/nonexistent/ridgeline-watchlist.json", &ProviderId::ALL)
        .expect_err("must fail");
    assert!(matches!(missing, ConfigError::WatchlistRead { .. }));

    let garbage = write_watchlist("{not json");
    let malformed = Watchlist::load(garbage.path(), &ProviderId::ALL).expect_err("must fail");
    assert!(matches!(malformed, ConfigError::WatchlistParse { .. }));

    let empty = write_watchlist("[]");
    let empty = Watchlist::load(empty.path(), &ProviderId::ALL).expect_err("must fail");
    assert_eq!(empty, ConfigError::EmptyWatchlist);
}

// =============================================================================
// Environment
// =============================================================================

#[test]
fn defaults_apply_without_environment() {
    let config = AppConfig::from_lookup(|_| None).expect("defaults are valid");

    assert_eq!(config.cache_ttl, Duration::from_secs(300));
    assert_eq!(config.default_window, Window::OneYear);
    assert_eq!(config.http_timeout_ms, 5_000);
    assert_eq!(config.enabled_providers(), vec![ProviderId::Yahoo, ProviderId::Naver]);
    assert_eq!(config.watchlist.len(), 14);
}

#[test]
fn environment_overrides_are_applied() {
    // Given: overrides for every setting and a custom watchlist
    let file = write_watchlist(
        r#"[{"id":"445380","name":"K-semis","currency":"KRW","code":"445380","board":"kospi","cost_basis":20232}]"#,
    );
    let env = lookup(&[
        (ENV_CACHE_TTL_SECS, String::from("60")),
        (ENV_HTTP_TIMEOUT_MS, String::from("2500")),
        (ENV_WINDOW, String::from("6mo")),
        (ENV_DISABLE_NAVER, String::from("true")),
        (ENV_WATCHLIST, file.path().display().to_string()),
    ]);

    // When: configuration is read
    let config = AppConfig::from_lookup(env).expect("valid overrides");

    // Then: Naver is gone from both the provider list and the candidate chain
    assert_eq!(config.cache_ttl, Duration::from_secs(60));
    assert_eq!(config.http_timeout_ms, 2_500);
    assert_eq!(config.default_window, Window::SixMonths);
    assert_eq!(config.enabled_providers(), vec![ProviderId::Yahoo]);
    let instrument = config.watchlist.get("445380").expect("present");
    assert!(instrument
        .candidates
        .iter()
        .all(|candidate| candidate.provider == ProviderId::Yahoo));
}

#[test]
fn malformed_environment_values_fail_fast() {
    for (name, value) in [
        (ENV_CACHE_TTL_SECS, "five minutes"),
        (ENV_HTTP_TIMEOUT_MS, "0"),
        (ENV_WINDOW, "5y"),
        (ENV_DISABLE_NAVER, "maybe"),
    ] {
        let error = AppConfig::from_lookup(lookup(&[(name, value.to_owned())]))
            .expect_err("must fail");
        assert!(
            matches!(error, ConfigError::InvalidEnv { name: reported, .. } if reported == name),
            "{name}={value} should be rejected, got {error:?}"
        );
    }
}

#[test]
fn configuration_installs_once() {
    // Given: nothing installed yet in this process
    assert!(config::get().is_none());

    // When: configuration is installed twice
    let installed = config::install(AppConfig::default()).expect("first install");
    let second = config::install(AppConfig::default());

    // Then: the first value stays in place
    assert_eq!(second, Err(ConfigError::AlreadyInstalled));
    let current = config::get().expect("installed");
    assert!(std::ptr::eq(installed, current));
}
