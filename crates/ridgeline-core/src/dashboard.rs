//! View-model handed to the presentation layer.
//!
//! [`DashboardView`] carries pre-formatted summary metrics, advisory text
//! keyed by the zone and risk classifications, and a [`ChartSpec`] for a
//! candlestick chart with overlays and horizontal reference levels. It holds
//! no rendering logic.

use serde::Serialize;

use crate::indicators::{MovingAverage, PriceZone, RiskState, TechnicalView};
use crate::orchestrator::{AllSourcesExhausted, ResolveSuccess};
use crate::{Bar, CostBasis, Currency, Instrument, Provenance, TradingDate};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DashStyle {
    Solid,
    Dashed,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LineStyle {
    pub color: &'static str,
    pub width: f32,
    pub dash: DashStyle,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverlaySeries {
    pub name: String,
    pub style: LineStyle,
    pub points: Vec<(TradingDate, Option<f64>)>,
}

/// Horizontal line across the chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReferenceLevel {
    pub value: f64,
    pub label: String,
    pub style: LineStyle,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSpec {
    pub bars: Vec<Bar>,
    pub overlays: Vec<OverlaySeries>,
    pub levels: Vec<ReferenceLevel>,
    pub volume_panel: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Metric {
    pub label: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryPanel {
    pub metrics: Vec<Metric>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Advisory {
    pub zone: PriceZone,
    pub risk: RiskState,
    pub zone_text: String,
    pub risk_text: String,
    pub ma60_text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardView {
    pub instrument_id: String,
    pub name: String,
    pub currency: Currency,
    pub provenance: Provenance,
    pub cache_hit: bool,
    pub summary: SummaryPanel,
    pub advisory: Advisory,
    pub technicals: TechnicalView,
    pub chart: ChartSpec,
}

const FIB_COLORS: [(f64, &str); 4] = [
    (0.236, "green"),
    (0.382, "cyan"),
    (0.5, "red"),
    (0.618, "magenta"),
];

impl DashboardView {
    /// Returns `None` only for an empty series, which a successful resolve never carries.
    pub fn build(
        instrument: &Instrument,
        cost_basis: CostBasis,
        resolved: &ResolveSuccess,
    ) -> Option<Self> {
        let technicals = TechnicalView::compute(&resolved.series, cost_basis)?;
        let currency = instrument.currency;

        Some(Self {
            instrument_id: instrument.id.clone(),
            name: instrument.name.clone(),
            currency,
            provenance: resolved.provenance.clone(),
            cache_hit: resolved.cache_hit,
            summary: summary_panel(currency, cost_basis, &technicals),
            advisory: advisory(currency, &technicals),
            chart: chart_spec(currency, resolved.series.bars(), &technicals),
            technicals,
        })
    }
}

fn summary_panel(currency: Currency, cost_basis: CostBasis, view: &TechnicalView) -> SummaryPanel {
    let return_text = match view.return_rate {
        Some(rate) => format!("{rate:.2}%"),
        None => String::from("n/a"),
    };

    SummaryPanel {
        metrics: vec![
            metric("Current price", format_price(view.latest_close, currency)),
            metric("Cost basis", format_price(cost_basis.value(), currency)),
            metric("Return", return_text),
            metric("Period high", format_price(view.range.high, currency)),
        ],
    }
}

fn advisory(currency: Currency, view: &TechnicalView) -> Advisory {
    let zone_text = match view.zone {
        PriceZone::Accumulate => format!(
            "[accumulate] strong support ({}) reached",
            format_level(view, 0.618, currency)
        ),
        PriceZone::Wait => format!(
            "[wait] near mid-term support ({})",
            format_level(view, 0.5, currency)
        ),
        PriceZone::Observe => String::from("[observe] holding steady below the period high"),
    };

    let risk_text = match view.risk {
        RiskState::Holding => String::from("[hold] position is sound"),
        RiskState::AtRisk => String::from("[risk] review position size"),
    };

    let ma60_text = match view.ma60.latest() {
        Some(value) => format!("MA60 reference: {}", format_price(value, currency)),
        None => format!("MA60 reference: n/a (fewer than {} bars)", view.ma60.window),
    };

    Advisory {
        zone: view.zone,
        risk: view.risk,
        zone_text,
        risk_text,
        ma60_text,
    }
}

fn chart_spec(currency: Currency, bars: &[Bar], view: &TechnicalView) -> ChartSpec {
    let mut levels: Vec<ReferenceLevel> = FIB_COLORS
        .iter()
        .filter_map(|&(ratio, color)| {
            let value = view.levels.level(ratio)?;
            Some(ReferenceLevel {
                value,
                label: format!("Fibo {ratio}"),
                style: dashed(color),
            })
        })
        .collect();

    if let Some(flat) = view.levels.flat {
        levels.push(ReferenceLevel {
            value: flat.price,
            label: format!("-{}% ({})", flat.drawdown_pct, format_price(flat.price, currency)),
            style: dashed("gray"),
        });
    }

    ChartSpec {
        bars: bars.to_vec(),
        overlays: vec![overlay(&view.ma60, "royalblue")],
        levels,
        volume_panel: bars.iter().any(|bar| bar.volume.is_some()),
    }
}

fn overlay(average: &MovingAverage, color: &'static str) -> OverlaySeries {
    OverlaySeries {
        name: average.label(),
        style: LineStyle {
            color,
            width: 1.5,
            dash: DashStyle::Solid,
        },
        points: average.points.clone(),
    }
}

fn dashed(color: &'static str) -> LineStyle {
    LineStyle {
        color,
        width: 1.0,
        dash: DashStyle::Dashed,
    }
}

fn metric(label: &str, value: String) -> Metric {
    Metric {
        label: label.to_owned(),
        value,
    }
}

fn format_level(view: &TechnicalView, ratio: f64, currency: Currency) -> String {
    view.levels
        .level(ratio)
        .map(|value| format_price(value, currency))
        .unwrap_or_else(|| String::from("n/a"))
}

/// Definitive failure text shown when every source is exhausted.
pub fn exhaustion_notice(error: &AllSourcesExhausted) -> String {
    format!(
        "All supply lines (Yahoo/Naver) are blocked for '{}' after {} attempt(s). \
         Wait for the upstream outage to clear and retry.",
        error.instrument_id,
        error.attempts.len()
    )
}

/// Formats a price with the currency glyph, thousands separators and the
/// currency's display precision.
pub fn format_price(value: f64, currency: Currency) -> String {
    let formatted = format!("{:.*}", currency.display_decimals(), value.abs());
    let (int_part, frac_part) = match formatted.split_once('.') {
        Some((int_part, frac_part)) => (int_part, Some(frac_part)),
        None => (formatted.as_str(), None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if value < 0.0 && formatted.bytes().any(|b| matches!(b, b'1'..=b'9')) {
        "-"
    } else {
        ""
    };
    match frac_part {
        Some(frac) => format!("{sign}{}{grouped}.{frac}", currency.glyph()),
        None => format!("{sign}{}{grouped}", currency.glyph()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_prices_per_currency() {
        assert_eq!(format_price(20_232.0, Currency::Krw), "₩20,232");
        assert_eq!(format_price(1_234_567.4, Currency::Krw), "₩1,234,567");
        assert_eq!(format_price(156.05, Currency::Usd), "$156.05");
        assert_eq!(format_price(1_179.8525, Currency::Usd), "$1,179.85");
        assert_eq!(format_price(-3.5, Currency::Usd), "-$3.50");
        assert_eq!(format_price(0.0, Currency::Krw), "₩0");
    }
}
