//! Symbol resolution: instrument identity to the ordered list of provider
//! spellings to attempt.
//!
//! Resolution is pure. The watchlist loader runs it once per instrument and
//! stores the result on the [`Instrument`](crate::Instrument), so the retry
//! order is a plain, inspectable list rather than logic re-run per request.

use std::collections::HashSet;

use crate::{CandidateSymbol, Currency, KrxBoard, ProviderId, Symbol, ValidationError};

/// Builds the candidate list for a listing.
///
/// - USD listings resolve to the bare ticker on Yahoo.
/// - KRW listings resolve to the Yahoo spellings `code + primary suffix`,
///   `code + alternate suffix` and the bare `code`, followed by the bare code on
///   Naver. The primary suffix comes from `board`, or from a suffix already
///   present on `code`, defaulting to KOSPI.
///
/// Providers missing from `enabled` are skipped; duplicates are removed while
/// keeping the first occurrence.
pub fn resolve_candidates(
    currency: Currency,
    code: &str,
    board: Option<KrxBoard>,
    enabled: &[ProviderId],
) -> Result<Vec<CandidateSymbol>, ValidationError> {
    let raw = Symbol::parse(code)?;
    let mut candidates = Vec::new();

    if !currency.is_krx() {
        if enabled.contains(&ProviderId::Yahoo) {
            candidates.push(CandidateSymbol::new(ProviderId::Yahoo, raw));
        }
        return Ok(candidates);
    }

    let primary = board.or_else(|| raw.board()).unwrap_or_default();

    if enabled.contains(&ProviderId::Yahoo) {
        for spelling in [raw.on_board(primary), raw.on_board(primary.other()), raw.bare()] {
            candidates.push(CandidateSymbol::new(ProviderId::Yahoo, spelling));
        }
    }

    if enabled.contains(&ProviderId::Naver) {
        candidates.push(CandidateSymbol::new(ProviderId::Naver, raw.bare()));
    }

    Ok(dedupe(candidates))
}

fn dedupe(candidates: Vec<CandidateSymbol>) -> Vec<CandidateSymbol> {
    let mut seen = HashSet::new();
    candidates
        .into_iter()
        .filter(|candidate| seen.insert(candidate.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: &[ProviderId] = &[ProviderId::Yahoo, ProviderId::Naver];

    fn spellings(candidates: &[CandidateSymbol]) -> Vec<String> {
        candidates.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn us_listing_is_single_bare_ticker() {
        let candidates =
            resolve_candidates(Currency::Usd, "googl", None, ALL).expect("valid code");
        assert_eq!(spellings(&candidates), vec!["yahoo:GOOGL"]);
    }

    #[test]
    fn kospi_listing_tries_primary_then_alternate_then_bare() {
        let candidates = resolve_candidates(Currency::Krw, "445380", None, ALL).expect("valid");
        assert_eq!(
            spellings(&candidates),
            vec![
                "yahoo:445380.KS",
                "yahoo:445380.KQ",
                "yahoo:445380",
                "naver:445380"
            ]
        );
    }

    #[test]
    fn kosdaq_suffix_on_code_sets_primary_board() {
        let candidates =
            resolve_candidates(Currency::Krw, "159400.KQ", None, ALL).expect("valid");
        assert_eq!(candidates[0].to_string(), "yahoo:159400.KQ");
        assert_eq!(candidates[1].to_string(), "yahoo:159400.KS");
    }

    #[test]
    fn resolution_is_deterministic() {
        let first = resolve_candidates(Currency::Krw, "475370", Some(KrxBoard::Kospi), ALL);
        let second = resolve_candidates(Currency::Krw, "475370", Some(KrxBoard::Kospi), ALL);
        assert_eq!(first, second);
    }

    #[test]
    fn disabled_providers_are_skipped() {
        let candidates =
            resolve_candidates(Currency::Krw, "445380", None, &[ProviderId::Naver]).expect("valid");
        assert_eq!(spellings(&candidates), vec!["naver:445380"]);

        let none = resolve_candidates(Currency::Usd, "GRID", None, &[ProviderId::Naver])
            .expect("valid");
        assert!(none.is_empty());
    }
}
