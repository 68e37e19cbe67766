use std::sync::Arc;

use serde::Deserialize;

use super::{round_price, Upstream};
use crate::circuit_breaker::CircuitBreaker;
use crate::data_source::{HealthStatus, PriceSource, SeriesRequest, SourceError, SourceFuture};
use crate::http_client::{HttpClient, HttpRequest, ReqwestHttpClient};
use crate::provider_policy::ProviderPolicy;
use crate::{Bar, PriceSeries, ProviderId, TradingDate};

const CHART_ENDPOINT: &str = "https://api.stock.naver.com/chart/domestic/item";

/// Naver daily chart adapter for KRX listings keyed by bare six-digit codes.
#[derive(Clone)]
pub struct NaverAdapter {
    upstream: Upstream,
}

impl Default for NaverAdapter {
    fn default() -> Self {
        Self::with_http_client(Arc::new(ReqwestHttpClient::new()))
    }
}

impl NaverAdapter {
    pub fn with_http_client(http_client: Arc<dyn HttpClient>) -> Self {
        Self::with_policy(http_client, ProviderPolicy::naver_default())
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
        // Naver keys on the bare code; a stray exchange suffix is stripped.
        HttpRequest::get(CHART_ENDPOINT)
            .segment(req.symbol.base())
            .segment("day")
            .query("startDateTime", format!("{}0000", req.start().compact()))
            .query("endDateTime", format!("{}2359", req.end.compact()))
            .with_header("accept", "application/json")
            .with_header("referer", "https://m.stock.naver.com/")
    }

    async fn fetch(&self, req: SeriesRequest) -> Result<PriceSeries, SourceError> {
        let body = self.upstream.get(Self::chart_request(&req)).await?;
        let bars = parse_day_chart(&body)?;
        self.upstream.accept(&req.symbol, req.window, bars)
    }
}

impl PriceSource for NaverAdapter {
    fn id(&self) -> ProviderId {
        ProviderId::Naver
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

fn parse_day_chart(body: &str) -> Result<Vec<Bar>, SourceError> {
    let rows: Vec<DayRow> = serde_json::from_str(body)
        .map_err(|e| SourceError::malformed(format!("failed to parse naver chart: {e}")))?;

    let mut bars = Vec::with_capacity(rows.len());
    for row in rows {
        let (Some(open), Some(high), Some(low), Some(close)) = (
            row.open_price.and_then(Numeric::value),
            row.high_price.and_then(Numeric::value),
            row.low_price.and_then(Numeric::value),
            row.close_price.and_then(Numeric::value),
        ) else {
            continue;
        };

        let date = TradingDate::parse(&row.local_date).map_err(|e| {
            SourceError::malformed(format!("invalid naver date '{}': {e}", row.local_date))
        })?;
        let volume = row
            .accumulated_trading_volume
            .and_then(Numeric::value)
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

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DayRow {
    local_date: String,
    #[serde(default)]
    open_price: Option<Numeric>,
    #[serde(default)]
    high_price: Option<Numeric>,
    #[serde(default)]
    low_price: Option<Numeric>,
    #[serde(default)]
    close_price: Option<Numeric>,
    #[serde(default)]
    accumulated_trading_volume: Option<Numeric>,
}

/// Naver sends prices either as JSON numbers or as text with thousands separators.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Numeric {
    Number(f64),
    Text(String),
}

impl Numeric {
    fn value(self) -> Option<f64> {
        let value = match self {
            Self::Number(value) => value,
            Self::Text(text) => text.replace(',', "").trim().parse().ok()?,
        };
        value.is_finite().then_some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::testing::RecordingHttpClient;
    use crate::data_source::SourceErrorKind;
    use crate::http_client::HttpResponse;
    use crate::{Symbol, Window};

    fn request(code: &str) -> SeriesRequest {
        SeriesRequest::ending(
            Symbol::parse(code).expect("valid symbol"),
            Window::OneYear,
            TradingDate::parse("2024-12-31").expect("valid date"),
        )
    }

    #[tokio::test]
    async fn parses_numbers_and_numeric_text() {
        let body = r#"[
            {"localDate":"20241230","openPrice":"20,100","highPrice":"20,400","lowPrice":"19,950","closePrice":"20,232","accumulatedTradingVolume":15321},
            {"localDate":"20241227","openPrice":20000,"highPrice":20300,"lowPrice":19900,"closePrice":20050,"accumulatedTradingVolume":"9,870"}
        ]"#;
        let client = Arc::new(RecordingHttpClient::replying(vec![Ok(
            HttpResponse::ok_json(body),
        )]));
        let adapter = NaverAdapter::with_http_client(client.clone());

        let series = adapter
            .daily_series(request("445380"))
            .await
            .expect("two bars is usable for naver");

        assert_eq!(series.len(), 2);
        assert_eq!(
            series.dates(),
            vec![
                TradingDate::parse("2024-12-27").expect("date"),
                TradingDate::parse("2024-12-30").expect("date"),
            ]
        );
        assert_eq!(series.latest_close(), Some(20_232.0));
        assert_eq!(series.bars()[0].volume, Some(9_870));

        let requests = client.recorded_requests();
        assert_eq!(
            requests[0].url,
            "https://api.stock.naver.com/chart/domestic/item/445380/day?startDateTime=202401010000&endDateTime=202412312359"
        );
    }

    #[tokio::test]
    async fn suffix_is_stripped_from_code() {
        let client = Arc::new(RecordingHttpClient::replying(vec![Ok(
            HttpResponse::ok_json("[]"),
        )]));
        let adapter = NaverAdapter::with_http_client(client.clone());

        let error = adapter
            .daily_series(request("159400.KQ"))
            .await
            .expect_err("empty array is unavailable");

        assert_eq!(error.kind(), SourceErrorKind::Empty);
        assert!(client.recorded_requests()[0].url.contains("/item/159400/day"));
    }

    #[tokio::test]
    async fn error_object_is_malformed() {
        let client = Arc::new(RecordingHttpClient::replying(vec![Ok(
            HttpResponse::ok_json(r#"{"code":"StockConflict","message":"not found"}"#),
        )]));
        let adapter = NaverAdapter::with_http_client(client);

        let error = adapter
            .daily_series(request("999999"))
            .await
            .expect_err("object instead of array");

        assert_eq!(error.kind(), SourceErrorKind::Malformed);
    }

    #[test]
    fn numeric_text_rejects_garbage() {
        assert_eq!(Numeric::Text(String::from("1,234.5")).value(), Some(1234.5));
        assert_eq!(Numeric::Text(String::from("-")).value(), None);
    }
}
