use ridgeline_core::Envelope;
use serde_json::Value;

use crate::cli::OutputFormat;
use crate::error::CliError;

pub fn render(
    envelope: &Envelope<Value>,
    format: OutputFormat,
    pretty: bool,
) -> Result<(), CliError> {
    match format {
        OutputFormat::Json => {
            let payload = if pretty {
                serde_json::to_string_pretty(envelope)?
            } else {
                serde_json::to_string(envelope)?
            };
            println!("{payload}");
        }
        OutputFormat::Table => print!("{}", table(envelope)?),
    }

    Ok(())
}

fn table(envelope: &Envelope<Value>) -> Result<String, CliError> {
    let mut out = String::new();
    let meta = &envelope.meta;

    line(&mut out, format!("request_id  : {}", meta.request_id));
    line(&mut out, format!("schema      : {}", meta.schema_version));
    line(&mut out, format!("generated_at: {}", meta.generated_at));
    line(
        &mut out,
        format!(
            "sources     : {}",
            meta.source_chain
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(" -> ")
        ),
    );
    line(&mut out, format!("latency_ms  : {}", meta.latency_ms));
    line(&mut out, format!("cache_hit   : {}", meta.cache_hit));

    if !meta.warnings.is_empty() {
        line(&mut out, String::from("warnings:"));
        for warning in &meta.warnings {
            line(&mut out, format!("  - {warning}"));
        }
    }

    match envelope.data.get("dashboards").and_then(Value::as_array) {
        Some(dashboards) => {
            for dashboard in dashboards {
                dashboard_block(&mut out, dashboard);
            }
            if let Some(failures) = envelope.data.get("failures").and_then(Value::as_array) {
                for failure in failures {
                    if let Some(notice) = failure.get("notice").and_then(Value::as_str) {
                        line(&mut out, String::new());
                        line(&mut out, format!("!! {notice}"));
                    }
                }
            }
        }
        None => {
            line(&mut out, String::from("data:"));
            for data_line in serde_json::to_string_pretty(&envelope.data)?.lines() {
                line(&mut out, format!("  {data_line}"));
            }
        }
    }

    if !envelope.errors.is_empty() {
        line(&mut out, String::from("errors:"));
        for error in &envelope.errors {
            match &error.source {
                Some(source) => line(
                    &mut out,
                    format!("  - [{source}] {}: {}", error.code, error.message),
                ),
                None => line(&mut out, format!("  - {}: {}", error.code, error.message)),
            }
        }
    }

    Ok(out)
}

/// Summary metrics and advisory text; the chart payload is only emitted as JSON.
fn dashboard_block(out: &mut String, dashboard: &Value) {
    line(out, String::new());
    line(
        out,
        format!(
            "== {} [{}]",
            text(dashboard, "name"),
            text(dashboard, "instrument_id")
        ),
    );

    if let Some(provenance) = dashboard.get("provenance") {
        line(
            out,
            format!(
                "   source    : {}:{} at {}",
                text(provenance, "provider"),
                text(provenance, "symbol"),
                text(provenance, "fetched_at")
            ),
        );
    }

    let metrics = dashboard
        .pointer("/summary/metrics")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();
    for metric in metrics {
        line(
            out,
            format!("   {:<14}: {}", text(metric, "label"), text(metric, "value")),
        );
    }

    if let Some(advisory) = dashboard.get("advisory") {
        for key in ["zone_text", "risk_text", "ma60_text"] {
            line(out, format!("   {}", text(advisory, key)));
        }
    }
}

fn text<'a>(value: &'a Value, key: &str) -> &'a str {
    value.get(key).and_then(Value::as_str).unwrap_or("")
}

fn line(out: &mut String, text: String) {
    out.push_str(&text);
    out.push('\n');
}

#[cfg(test)]
mod tests {
    use super::*;
    use ridgeline_core::EnvelopeMeta;
    use serde_json::json;

    #[test]
    fn table_renders_dashboard_summary_and_notice() {
        let data = json!({
            "dashboards": [{
                "instrument_id": "445380",
                "name": "K-semis",
                "provenance": {"provider": "naver", "symbol": "445380", "fetched_at": "2024-12-31T00:00:00Z"},
                "summary": {"metrics": [{"label": "Current price", "value": "₩20,100"}]},
                "advisory": {"zone_text": "[wait] near", "risk_text": "[hold] ok", "ma60_text": "MA60 reference: n/a"}
            }],
            "failures": [{"instrument_id": "ura", "notice": "All supply lines blocked"}]
        });
        let envelope = Envelope::success(EnvelopeMeta::generate(4, false), data);

        let rendered = table(&envelope).expect("table renders");

        assert!(rendered.contains("== K-semis [445380]"));
        assert!(rendered.contains("source    : naver:445380"));
        assert!(rendered.contains("Current price : ₩20,100"));
        assert!(rendered.contains("[wait] near"));
        assert!(rendered.contains("!! All supply lines blocked"));
    }

    #[test]
    fn table_falls_back_to_raw_data() {
        let envelope = Envelope::success(EnvelopeMeta::generate(0, true), json!({"sources": []}));

        let rendered = table(&envelope).expect("table renders");

        assert!(rendered.contains("data:"));
        assert!(rendered.contains("\"sources\": []"));
    }
}
