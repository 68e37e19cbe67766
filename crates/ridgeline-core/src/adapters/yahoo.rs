use std::sync::Arc;

use serde::Deserialize;

use super::{round_price, Upstream};
use crate::circuit_breaker::CircuitBreaker;
use crate::data_source::{HealthStatus, PriceSource, SeriesRequest, SourceError, SourceFuture};
use crate::http_client::{HttpClient, HttpRequest, ReqwestHttpClient};
use crate::provider_policy::ProviderPolicy;
use crate::{Bar, PriceSeries, ProviderId, TradingDate};

const CHART_ENDPOINT: &str = "https://query2.finance.yahoo.com/v8/finance/chart";

/// Yahoo Finance chart adapter. Covers US tickers and suffixed KRX listings.
#[derive(Clone)]
pub struct YahooAdapter {
    upstream: Upstream,
}

impl Default for YahooAdapter {
    fn default() -> Self {
        Self::with_http_client(Arc::new(ReqwestHttpClient::new()))
    }
}

impl YahooAdapter {
    pub fn with_http_client(http_client: Arc<dyn HttpClient>) -> Self {
        Self::with_policy(http_client, ProviderPolicy::yahoo_default())
    }

    pub fn with_policy(http_client: Arc<dyn HttpClient>, policy: ProviderPolicy) -> Self {
        Self {
            upstream: Upstream::new(http_client, policy),
        }
    }

    pub fn with_circuit_breaker(mut self, circuit_breaker: Arc<CircuitBreaker>) -> Self {
        self.upstream = self.upstream.with_circuit_breaker(circuit_breaker);
        self
    }

    pub fn policy(&self) -> &ProviderPolicy {
        self.upstream.policy()
    }

    fn chart_request(req: &SeriesRequest) -> HttpRequest {
        HttpRequest::get(CHART_ENDPOINT)
            .segment(req.symbol.as_str())
            .query("range", req.window.as_str())
            .query("interval", "1d")
            .query("includePrePost", "false")
            .with_header("accept", "application/json")
    }

    async fn fetch(&self, req: SeriesRequest) -> Result<PriceSeries, SourceError> {
        let body = self.upstream.get(Self::chart_request(&req)).await?;
        let bars = parse_chart(&body)?;
        self.upstream.accept(&req.symbol, req.window, bars)
    }
}

impl PriceSource for YahooAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::Yahoo
    }

    fn daily_series<'a>(
        &'a self,
        req: SeriesRequest,
    ) -> SourceFuture<'a, Result<PriceSeries, SourceError>> {
        Box::pin(self.fetch(req))
    }

    fn health<'a>(&'a self) -> SourceFuture<'a, HealthStatus> {
        Box::pin(async move { self.upstream.health() })
    }
}

/// Decodes a chart payload into bars. Rows with any missing OHLC value are
/// dropped, as are rows whose values fail bar validation.
fn parse_chart(body: &str) -> Result<Vec<Bar>, SourceError> {
    let response: ChartResponse = serde_json::from_str(body)
        .map_err(|e| SourceError::malformed(format!("failed to parse yahoo chart: {e}")))?;

    if let Some(error) = response.chart.error {
        return Err(SourceError::malformed(format!(
            "yahoo chart error {}: {}",
            error.code,
            error.description.unwrap_or_default()
        )));
    }

    let Some(result) = response.chart.result.and_then(|r| r.into_iter().next()) else {
        return Ok(Vec::new());
    };

    let Some(timestamps) = result.timestamp else {
        return Ok(Vec::new());
    };
    let Some(quote) = result.indicators.quote.into_iter().next() else {
        return Ok(Vec::new());
    };
    let offset = result.meta.map(|meta| meta.gmtoffset).unwrap_or(0);

    let mut bars = Vec::with_capacity(timestamps.len());
    for (i, &ts) in timestamps.iter().enumerate() {
        let (Some(open), Some(high), Some(low), Some(close)) = (
            value_at(&quote.open, i),
            value_at(&quote.high, i),
            value_at(&quote.low, i),
            value_at(&quote.close, i),
        ) else {
            continue;
        };

        let date = TradingDate::from_unix_with_offset(ts, offset)
            .map_err(|e| SourceError::malformed(format!("invalid yahoo timestamp {ts}: {e}")))?;
        let volume = value_at(&quote.volume, i)
            .filter(|v| *v >= 0.0)
            .map(|v| v.round() as u64);

        if let Ok(bar) = Bar::new(
            date,
            round_price(open),
            round_price(high),
            round_price(low),
            round_price(close),
            volume,
        ) {
            bars.push(bar);
        }
    }

    Ok(bars)
}

fn value_at(values: &[Option<f64>], index: usize) -> Option<f64> {
    values.get(index).copied().flatten().filter(|v| v.is_finite())
}

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartData,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
    #[serde(default)]
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    meta: Option<ChartMeta>,
    #[serde(default)]
    timestamp: Option<Vec<i64>>,
    indicators: ChartIndicators,
}

#[derive(Debug, Deserialize)]
struct ChartMeta {
    #[serde(default)]
    gmtoffset: i64,
}

#[derive(Debug, Deserialize)]
struct ChartIndicators {
    #[serde(default)]
    quote: Vec<ChartQuote>,
}

#[derive(Debug, Deserialize)]
struct ChartQuote {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::testing::RecordingHttpClient;
    use crate::data_source::{HealthState, SourceErrorKind};
    use crate::http_client::{HttpError, HttpResponse};
    use crate::{Symbol, Window};

    // 2024-01-02 .. 2024-01-09 at 14:30 UTC, US session.
    const DAY_STARTS: [i64; 7] = [
        1_704_205_800,
        1_704_292_200,
        1_704_378_600,
        1_704_465_000,
        1_704_724_200,
        1_704_810_600,
        1_704_897_000,
    ];

    fn chart_body(count: usize) -> String {
        let timestamps = &DAY_STARTS[..count];
        let closes: Vec<String> = (0..count).map(|i| format!("{}.00001", 100 + i)).collect();
        let highs: Vec<String> = (0..count).map(|i| format!("{}", 101 + i)).collect();
        let lows: Vec<String> = (0..count).map(|i| format!("{}", 99 + i)).collect();
        format!(
            r#"{{"chart":{{"result":[{{"meta":{{"symbol":"GRID","gmtoffset":-18000}},
            "timestamp":{timestamps:?},
            "indicators":{{"quote":[{{"open":[{closes}],"high":[{highs}],"low":[{lows}],
            "close":[{closes}],"volume":[{volumes}]}}]}}}}],"error":null}}}}"#,
            closes = closes.join(","),
            highs = highs.join(","),
            lows = lows.join(","),
            volumes = vec!["1000"; count].join(","),
        )
    }

    fn request(symbol: &str) -> SeriesRequest {
        SeriesRequest::ending(
            Symbol::parse(symbol).expect("valid symbol"),
            Window::OneYear,
            TradingDate::parse("2024-01-10").expect("valid date"),
        )
    }

    #[tokio::test]
    async fn parses_chart_into_rounded_bars() {
        let client = Arc::new(RecordingHttpClient::replying(vec![Ok(
            HttpResponse::ok_json(chart_body(7)),
        )]));
        let adapter = YahooAdapter::with_http_client(client.clone());

        let series = adapter
            .daily_series(request("GRID"))
            .await
            .expect("seven bars is usable");

        assert_eq!(series.len(), 7);
        assert_eq!(series.latest_close(), Some(106.0));
        assert_eq!(
            series.bars()[0].date,
            TradingDate::parse("2024-01-02").expect("date")
        );
        assert_eq!(series.bars()[0].volume, Some(1000));

        let requests = client.recorded_requests();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].url.ends_with("/GRID?range=1y&interval=1d&includePrePost=false"));
        assert_eq!(requests[0].timeout_ms, adapter.policy().timeout_ms);
    }

    #[tokio::test]
    async fn five_bars_is_not_usable() {
        let client = Arc::new(RecordingHttpClient::replying(vec![Ok(
            HttpResponse::ok_json(chart_body(5)),
        )]));
        let adapter = YahooAdapter::with_http_client(client);

        let error = adapter
            .daily_series(request("445380.KS"))
            .await
            .expect_err("five bars is below threshold");

        assert_eq!(error.kind(), SourceErrorKind::InsufficientBars);
    }

    #[tokio::test]
    async fn rows_with_missing_values_are_dropped() {
        let body = r#"{"chart":{"result":[{"meta":{"gmtoffset":32400},
            "timestamp":[1704153600,1704240000],
            "indicators":{"quote":[{"open":[10.0,null],"high":[11.0,12.0],
            "low":[9.0,9.5],"close":[10.5,11.0],"volume":[null,null]}]}}],"error":null}}"#;

        let bars = parse_chart(body).expect("valid payload");

        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].volume, None);
    }

    #[tokio::test]
    async fn not_found_payload_is_unavailable() {
        let body = r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found, symbol may be delisted"}}}"#;
        let client = Arc::new(RecordingHttpClient::replying(vec![Ok(
            HttpResponse::with_status(404, body),
        )]));
        let adapter = YahooAdapter::with_http_client(client);

        let error = adapter
            .daily_series(request("445380.KQ"))
            .await
            .expect_err("404 must fail");

        assert_eq!(error.kind(), SourceErrorKind::UpstreamStatus);
    }

    #[tokio::test]
    async fn empty_result_and_garbage_are_unavailable() {
        let client = Arc::new(RecordingHttpClient::replying(vec![
            Ok(HttpResponse::ok_json(r#"{"chart":{"result":[],"error":null}}"#)),
            Ok(HttpResponse::ok_json("<html>")),
        ]));
        let adapter = YahooAdapter::with_http_client(client);

        let empty = adapter
            .daily_series(request("GRID"))
            .await
            .expect_err("no rows");
        assert_eq!(empty.kind(), SourceErrorKind::Empty);

        let garbage = adapter
            .daily_series(request("GRID"))
            .await
            .expect_err("not json");
        assert_eq!(garbage.kind(), SourceErrorKind::Malformed);
    }

    #[tokio::test]
    async fn circuit_breaker_opens_after_repeated_transport_failures() {
        let client = Arc::new(RecordingHttpClient::replying(vec![
            Err(HttpError::timeout("upstream timeout")),
            Err(HttpError::timeout("upstream timeout")),
            Err(HttpError::timeout("upstream timeout")),
        ]));
        let adapter = YahooAdapter::with_http_client(client.clone());

        for _ in 0..3 {
            let error = adapter
                .daily_series(request("URA"))
                .await
                .expect_err("call should fail");
            assert_eq!(error.kind(), SourceErrorKind::Transport);
        }

        let health = adapter.health().await;
        assert_eq!(health.state, HealthState::Unhealthy);
        assert!(!health.rate_available);

        let error = adapter
            .daily_series(request("URA"))
            .await
            .expect_err("breaker should block request");
        assert_eq!(error.kind(), SourceErrorKind::CircuitOpen);
        assert_eq!(client.recorded_requests().len(), 3);
    }
}
