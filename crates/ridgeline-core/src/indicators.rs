//! Technical levels derived from a resolved series.
//!
//! Everything here is synchronous and pure: moving averages, the period
//! range, Fibonacci retracement levels, return against a cost basis and the
//! two classifications that drive the advisory text.

use serde::Serialize;

use crate::{CostBasis, PriceSeries, TradingDate};

/// Baseline moving-average window in trading days.
pub const MA_SHORT: usize = 60;
/// Optional long moving-average window.
pub const MA_LONG: usize = 120;

/// Retracement ratios, shallowest first.
pub const FIB_RATIOS: [f64; 4] = [0.236, 0.382, 0.5, 0.618];

/// Default flat drawdown level, in percent below the period high.
pub const DEFAULT_FLAT_DRAWDOWN_PCT: f64 = 2.0;

/// Return-rate threshold (percent) at or below which a position is at risk.
pub const LOSS_THRESHOLD_PCT: f64 = -10.0;

/// Trailing simple moving average aligned to `values`.
///
/// The first `window - 1` points are `None`; a zero window yields all `None`.
pub fn simple_moving_average(values: &[f64], window: usize) -> Vec<Option<f64>> {
    if window == 0 {
        return vec![None; values.len()];
    }

    let mut output = Vec::with_capacity(values.len());
    let mut sum = 0.0;
    for (i, value) in values.iter().enumerate() {
        sum += value;
        if i >= window {
            sum -= values[i - window];
        }
        if i + 1 >= window {
            output.push(Some(sum / window as f64));
        } else {
            output.push(None);
        }
    }
    output
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MovingAverage {
    pub window: usize,
    pub points: Vec<(TradingDate, Option<f64>)>,
}

impl MovingAverage {
    pub fn from_series(series: &PriceSeries, window: usize) -> Self {
        let values = simple_moving_average(&series.closes(), window);
        Self {
            window,
            points: series.dates().into_iter().zip(values).collect(),
        }
    }

    /// Value at the most recent date; `None` when history is shorter than the window.
    pub fn latest(&self) -> Option<f64> {
        self.points.last().and_then(|(_, value)| *value)
    }

    pub fn label(&self) -> String {
        format!("MA{}", self.window)
    }
}

/// Highest high and lowest low over the series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PeriodRange {
    pub high: f64,
    pub low: f64,
}

impl PeriodRange {
    pub fn new(high: f64, low: f64) -> Self {
        Self { high, low }
    }

    pub fn from_series(series: &PriceSeries) -> Option<Self> {
        let bars = series.bars();
        let first = bars.first()?;
        let (high, low) = bars
            .iter()
            .fold((first.high, first.low), |(high, low), bar| {
                (high.max(bar.high), low.min(bar.low))
            });
        Some(Self { high, low })
    }

    pub fn span(&self) -> f64 {
        self.high - self.low
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FibLevel {
    pub ratio: f64,
    pub price: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FlatLevel {
    pub drawdown_pct: f64,
    pub price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FibonacciLevels {
    pub range: PeriodRange,
    pub levels: Vec<FibLevel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flat: Option<FlatLevel>,
}

impl FibonacciLevels {
    /// `level(r) = high - r * (high - low)` for each standard ratio.
    pub fn compute(range: PeriodRange) -> Self {
        let levels = FIB_RATIOS
            .iter()
            .map(|&ratio| FibLevel {
                ratio,
                price: range.high - ratio * range.span(),
            })
            .collect();
        Self {
            range,
            levels,
            flat: None,
        }
    }

    /// Adds a level `drawdown_pct` percent below the period high.
    pub fn with_flat_drawdown(mut self, drawdown_pct: f64) -> Self {
        self.flat = Some(FlatLevel {
            drawdown_pct,
            price: self.range.high * (1.0 - drawdown_pct / 100.0),
        });
        self
    }

    pub fn level(&self, ratio: f64) -> Option<f64> {
        self.levels
            .iter()
            .find(|level| (level.ratio - ratio).abs() < 1e-9)
            .map(|level| level.price)
    }
}

/// Percent return of `latest_close` over the cost basis; `None` without a position.
pub fn return_rate(latest_close: f64, cost_basis: CostBasis) -> Option<f64> {
    if !cost_basis.has_position() {
        return None;
    }
    let cost = cost_basis.value();
    Some((latest_close - cost) / cost * 100.0)
}

/// Where the latest close sits relative to the 0.5 and 0.618 retracements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceZone {
    /// At or below the 0.618 level: strong support, accumulate.
    Accumulate,
    /// Between the 0.618 and 0.5 levels, the 0.5 level included.
    Wait,
    /// Above the 0.5 level.
    Observe,
}

impl PriceZone {
    pub fn classify(close: f64, levels: &FibonacciLevels) -> Self {
        let deep = levels.level(0.618).unwrap_or(levels.range.low);
        let mid = levels.level(0.5).unwrap_or(levels.range.high);

        if close <= deep {
            Self::Accumulate
        } else if close <= mid {
            Self::Wait
        } else {
            Self::Observe
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskState {
    Holding,
    AtRisk,
}

impl RiskState {
    /// No position counts as holding.
    pub fn classify(return_rate: Option<f64>) -> Self {
        match return_rate {
            Some(rate) if rate <= LOSS_THRESHOLD_PCT => Self::AtRisk,
            _ => Self::Holding,
        }
    }
}

/// All derived values for one series and cost basis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TechnicalView {
    pub latest_close: f64,
    pub ma60: MovingAverage,
    pub ma120: MovingAverage,
    pub range: PeriodRange,
    pub levels: FibonacciLevels,
    pub return_rate: Option<f64>,
    pub zone: PriceZone,
    pub risk: RiskState,
}

impl TechnicalView {
    /// Returns `None` for an empty series.
    pub fn compute(series: &PriceSeries, cost_basis: CostBasis) -> Option<Self> {
        let latest_close = series.latest_close()?;
        let range = PeriodRange::from_series(series)?;
        let levels = FibonacciLevels::compute(range).with_flat_drawdown(DEFAULT_FLAT_DRAWDOWN_PCT);
        let return_rate = return_rate(latest_close, cost_basis);

        Some(Self {
            latest_close,
            ma60: MovingAverage::from_series(series, MA_SHORT),
            ma120: MovingAverage::from_series(series, MA_LONG),
            zone: PriceZone::classify(latest_close, &levels),
            risk: RiskState::classify(return_rate),
            range,
            levels,
            return_rate,
        })
    }
}
