use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{
    CandidateSymbol, ConfigError, ProviderId, Symbol, TradingDate, UtcDateTime, ValidationError,
    Window,
};

/// Quote currency of an instrument. The Korean won also marks a KRX listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Usd,
    Krw,
}

impl Currency {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Usd => "USD",
            Self::Krw => "KRW",
        }
    }

    pub const fn glyph(self) -> &'static str {
        match self {
            Self::Usd => "$",
            Self::Krw => "₩",
        }
    }

    /// Decimal places used when displaying prices.
    pub const fn display_decimals(self) -> usize {
        match self {
            Self::Usd => 2,
            Self::Krw => 0,
        }
    }

    /// True when listings in this currency trade on the Korean exchange.
    pub const fn is_krx(self) -> bool {
        matches!(self, Self::Krw)
    }
}

impl Display for Currency {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Currency {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "USD" | "$" => Ok(Self::Usd),
            "KRW" | "₩" => Ok(Self::Krw),
            other => Err(ValidationError::InvalidCurrency {
                value: other.to_owned(),
            }),
        }
    }
}

/// KRX sub-market, which decides the preferred Yahoo suffix.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KrxBoard {
    #[default]
    Kospi,
    Kosdaq,
}

impl KrxBoard {
    pub const fn yahoo_suffix(self) -> &'static str {
        match self {
            Self::Kospi => ".KS",
            Self::Kosdaq => ".KQ",
        }
    }

    pub const fn other(self) -> Self {
        match self {
            Self::Kospi => Self::Kosdaq,
            Self::Kosdaq => Self::Kospi,
        }
    }
}

impl FromStr for KrxBoard {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "kospi" | "ks" => Ok(Self::Kospi),
            "kosdaq" | "kq" => Ok(Self::Kosdaq),
            other => Err(ValidationError::InvalidBoard {
                value: other.to_owned(),
            }),
        }
    }
}

/// Average purchase price. Zero or negative means no position is tracked.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CostBasis(f64);

impl CostBasis {
    pub fn new(value: f64) -> Result<Self, ConfigError> {
        if !value.is_finite() {
            return Err(ConfigError::InvalidCostBasis {
                value: value.to_string(),
            });
        }
        Ok(Self(value))
    }

    /// Parses user input; thousands separators and a leading currency glyph are tolerated.
    pub fn parse(input: &str) -> Result<Self, ConfigError> {
        let cleaned: String = input
            .trim()
            .trim_start_matches(['$', '₩'])
            .chars()
            .filter(|ch| *ch != ',')
            .collect();

        let value = cleaned
            .parse::<f64>()
            .map_err(|_| ConfigError::InvalidCostBasis {
                value: input.to_owned(),
            })?;

        Self::new(value).map_err(|_| ConfigError::InvalidCostBasis {
            value: input.to_owned(),
        })
    }

    pub const fn value(self) -> f64 {
        self.0
    }

    pub fn has_position(self) -> bool {
        self.0 > 0.0
    }
}

/// One watchlist entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instrument {
    pub id: String,
    pub name: String,
    pub currency: Currency,
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub board: Option<KrxBoard>,
    pub cost_basis: CostBasis,
    pub candidates: Vec<CandidateSymbol>,
}

impl Instrument {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        currency: Currency,
        code: impl Into<String>,
        board: Option<KrxBoard>,
        cost_basis: CostBasis,
        candidates: Vec<CandidateSymbol>,
    ) -> Result<Self, ConfigError> {
        let id = id.into().trim().to_owned();
        if id.is_empty() {
            return Err(ConfigError::EmptyInstrumentId);
        }
        if candidates.is_empty() {
            return Err(ConfigError::EmptyCandidates { id });
        }

        Ok(Self {
            id,
            name: name.into(),
            currency,
            code: code.into(),
            board,
            cost_basis,
            candidates,
        })
    }
}

/// One trading day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub date: TradingDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: Option<u64>,
}

impl Bar {
    pub fn new(
        date: TradingDate,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: Option<u64>,
    ) -> Result<Self, ValidationError> {
        validate_non_negative("open", open)?;
        validate_non_negative("high", high)?;
        validate_non_negative("low", low)?;
        validate_non_negative("close", close)?;

        if high < low {
            return Err(ValidationError::InvalidBarRange);
        }

        if open < low || open > high || close < low || close > high {
            return Err(ValidationError::InvalidBarBounds);
        }

        Ok(Self {
            date,
            open,
            high,
            low,
            close,
            volume,
        })
    }
}

/// Daily bars for one resolved symbol, ascending by date with unique dates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    symbol: Symbol,
    window: Window,
    bars: Vec<Bar>,
}

impl PriceSeries {
    /// Sorts by date; when a date repeats the later bar in input order wins.
    pub fn new(symbol: Symbol, window: Window, mut bars: Vec<Bar>) -> Self {
        bars.sort_by_key(|bar| bar.date);

        let mut unique: Vec<Bar> = Vec::with_capacity(bars.len());
        for bar in bars {
            match unique.last_mut() {
                Some(last) if last.date == bar.date => *last = bar,
                _ => unique.push(bar),
            }
        }

        Self {
            symbol,
            window,
            bars: unique,
        }
    }

    pub fn symbol(&self) -> &Symbol {
        &self.symbol
    }

    pub fn window(&self) -> Window {
        self.window
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn latest(&self) -> Option<&Bar> {
        self.bars.last()
    }

    pub fn latest_close(&self) -> Option<f64> {
        self.latest().map(|bar| bar.close)
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|bar| bar.close).collect()
    }

    pub fn dates(&self) -> Vec<TradingDate> {
        self.bars.iter().map(|bar| bar.date).collect()
    }
}

/// Which provider and spelling actually produced a series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provenance {
    pub provider: ProviderId,
    pub symbol: Symbol,
    pub fetched_at: UtcDateTime,
}

impl Provenance {
    pub fn new(candidate: &CandidateSymbol, fetched_at: UtcDateTime) -> Self {
        Self {
            provider: candidate.provider,
            symbol: candidate.symbol.clone(),
            fetched_at,
        }
    }

    pub fn candidate(&self) -> CandidateSymbol {
        CandidateSymbol::new(self.provider, self.symbol.clone())
    }
}

impl Display for Provenance {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.provider, self.symbol)
    }
}

fn validate_non_negative(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::NonFiniteValue { field });
    }
    if value < 0.0 {
        return Err(ValidationError::NegativeValue { field });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(day: u8) -> TradingDate {
        TradingDate::new(2024, 1, day).expect("valid date")
    }

    #[test]
    fn rejects_invalid_bar_bounds() {
        let err = Bar::new(date(2), 10.0, 12.0, 9.0, 12.5, Some(10)).expect_err("must fail");
        assert!(matches!(err, ValidationError::InvalidBarBounds));
    }

    #[test]
    fn series_is_sorted_and_dates_unique() {
        let symbol = Symbol::parse("GRID").expect("symbol");
        let bars = vec![
            Bar::new(date(4), 1.0, 2.0, 1.0, 2.0, None).expect("bar"),
            Bar::new(date(2), 1.0, 2.0, 1.0, 1.5, None).expect("bar"),
            Bar::new(date(4), 1.0, 3.0, 1.0, 3.0, None).expect("bar"),
        ];

        let series = PriceSeries::new(symbol, Window::OneYear, bars);

        assert_eq!(series.len(), 2);
        assert_eq!(series.dates(), vec![date(2), date(4)]);
        assert_eq!(series.latest_close(), Some(3.0));
    }

    #[test]
    fn cost_basis_parses_user_input() {
        assert_eq!(CostBasis::parse("₩20,232").expect("valid").value(), 20_232.0);
        assert!(!CostBasis::parse("0").expect("zero is valid").has_position());
        assert!(!CostBasis::parse("-5").expect("negative is valid").has_position());
        assert!(matches!(
            CostBasis::parse("abc"),
            Err(ConfigError::InvalidCostBasis { .. })
        ));
        assert!(CostBasis::parse("NaN").is_err());
    }

    #[test]
    fn instrument_requires_candidates() {
        let err = Instrument::new(
            "grid",
            "Grid",
            Currency::Usd,
            "GRID",
            None,
            CostBasis::new(1.0).expect("finite"),
            Vec::new(),
        )
        .expect_err("must fail");
        assert!(matches!(err, ConfigError::EmptyCandidates { .. }));
    }
}
