//! Yahoo Finance market data source.
//!
//! Fetches daily OHLCV history from Yahoo's v8 chart API. Handles rate
//! limiting, retries with exponential backoff, response parsing, and the
//! circuit breaker.
//!
//! Yahoo Finance has no official API and is subject to unannounced format
//! changes. The synthetic and CSV sources are the offline fallbacks.

use super::circuit_breaker::CircuitBreaker;
use super::provider::{FetchError, MarketDataSource, RawPricePoint};
use crate::domain::AssetId;
use chrono::{NaiveDate, NaiveTime};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

const DEFAULT_BASE_URL: &str = "https://query2.finance.yahoo.com";
const SECONDS_PER_DAY: i64 = 86_400;
/// Upper bound on a single retry wait.
const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// Yahoo Finance v8 chart API response.
#[derive(Debug, Deserialize)]
pub(crate) struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    meta: Option<ChartMeta>,
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct ChartMeta {
    gmtoffset: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
}

#[derive(Debug, Default, Deserialize)]
struct QuoteData {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<u64>>,
}

/// Yahoo Finance data source.
pub struct YahooSource {
    client: reqwest::blocking::Client,
    circuit_breaker: Arc<CircuitBreaker>,
    base_url: String,
    max_retries: u32,
    base_delay: Duration,
}

impl YahooSource {
    pub fn new(circuit_breaker: Arc<CircuitBreaker>) -> Result<Self, FetchError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .build()
            .map_err(|e| FetchError::Other(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            circuit_breaker,
            base_url: DEFAULT_BASE_URL.to_string(),
            max_retries: 3,
            base_delay: Duration::from_millis(500),
        })
    }

    /// Point the source at a different host (mirrors, local test servers).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_retries(mut self, max_retries: u32, base_delay: Duration) -> Self {
        self.max_retries = max_retries;
        self.base_delay = base_delay;
        self
    }

    /// Wait before retry `attempt` (1-based): `base_delay * 2^(attempt-1)`,
    /// capped at [`MAX_BACKOFF`].
    fn backoff_delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor).min(MAX_BACKOFF)
    }

    /// Build the chart API URL. `period2` is exclusive, so it points at the
    /// midnight after `end`.
    fn chart_url(&self, asset: &AssetId, start: NaiveDate, end: NaiveDate) -> String {
        let start_ts = start.and_time(NaiveTime::MIN).and_utc().timestamp();
        let end_ts = end.and_time(NaiveTime::MIN).and_utc().timestamp() + SECONDS_PER_DAY;
        format!(
            "{}/v8/finance/chart/{asset}\
             ?period1={start_ts}&period2={end_ts}&interval=1d&events=history",
            self.base_url
        )
    }

    /// Parse the chart API response into raw points.
    ///
    /// A result with no timestamps means no trading history in range and
    /// yields an empty `Vec`. Null quote entries are kept as `None` so the
    /// normalizer can account for them.
    pub(crate) fn parse_response(
        asset: &AssetId,
        resp: ChartResponse,
    ) -> Result<Vec<RawPricePoint>, FetchError> {
        let result = match resp.chart.result {
            Some(result) => result,
            None => {
                return Err(match resp.chart.error {
                    Some(err) if err.code == "Not Found" => FetchError::SymbolNotFound {
                        symbol: asset.to_string(),
                    },
                    Some(err) => {
                        FetchError::ResponseFormatChanged(format!("{}: {}", err.code, err.description))
                    }
                    None => FetchError::ResponseFormatChanged("empty result with no error".into()),
                })
            }
        };

        let data = result
            .into_iter()
            .next()
            .ok_or_else(|| FetchError::ResponseFormatChanged("result array is empty".into()))?;

        let Some(timestamps) = data.timestamp else {
            return Ok(Vec::new());
        };

        let quote = data.indicators.quote.into_iter().next().unwrap_or_default();
        let gmtoffset = data.meta.and_then(|m| m.gmtoffset).unwrap_or(0);

        let mut points = Vec::with_capacity(timestamps.len());
        for (i, &ts) in timestamps.iter().enumerate() {
            // Shift to exchange-local time so a session maps to its own calendar day.
            let date = chrono::DateTime::from_timestamp(ts + gmtoffset, 0)
                .map(|dt| dt.naive_utc().date())
                .ok_or_else(|| FetchError::ResponseFormatChanged(format!("invalid timestamp: {ts}")))?;

            points.push(RawPricePoint {
                date,
                open: quote.open.get(i).copied().flatten(),
                high: quote.high.get(i).copied().flatten(),
                low: quote.low.get(i).copied().flatten(),
                close: quote.close.get(i).copied().flatten(),
                volume: quote.volume.get(i).copied().flatten(),
            });
        }

        Ok(points)
    }

    /// Execute the request with retry and circuit breaker logic.
    fn fetch_with_retry(
        &self,
        asset: &AssetId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<RawPricePoint>, FetchError> {
        if !self.circuit_breaker.is_allowed() {
            return Err(FetchError::CircuitBreakerTripped);
        }

        let url = self.chart_url(asset, start, end);
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = self.backoff_delay(attempt);
                debug!(%asset, attempt, delay_ms = delay.as_millis() as u64, "retrying fetch");
                std::thread::sleep(delay);
            }

            if !self.circuit_breaker.is_allowed() {
                return Err(FetchError::CircuitBreakerTripped);
            }

            let resp = match self.client.get(&url).send() {
                Ok(resp) => resp,
                Err(e) if e.is_connect() || e.is_timeout() => {
                    self.circuit_breaker.record_failure();
                    last_error = Some(FetchError::NetworkUnreachable(e.to_string()));
                    continue;
                }
                Err(e) => return Err(FetchError::NetworkUnreachable(e.to_string())),
            };

            let status = resp.status();

            if status == reqwest::StatusCode::FORBIDDEN {
                self.circuit_breaker.trip();
                return Err(FetchError::CircuitBreakerTripped);
            }

            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                self.circuit_breaker.record_failure();
                let retry_after = resp
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(60);
                warn!(%asset, retry_after, "rate limited by Yahoo Finance");
                last_error = Some(FetchError::RateLimited {
                    retry_after_secs: retry_after,
                });
                continue;
            }

            if status == reqwest::StatusCode::UNAUTHORIZED {
                return Err(FetchError::AuthenticationRequired(
                    "Yahoo Finance requires authentication".into(),
                ));
            }

            // Yahoo answers unknown symbols with 404 and a JSON error body.
            if status == reqwest::StatusCode::NOT_FOUND {
                return Err(FetchError::SymbolNotFound {
                    symbol: asset.to_string(),
                });
            }

            if !status.is_success() {
                self.circuit_breaker.record_failure();
                last_error = Some(FetchError::Other(format!("HTTP {status} for {asset}")));
                continue;
            }

            let chart: ChartResponse = resp.json().map_err(|e| {
                FetchError::ResponseFormatChanged(format!("failed to parse response for {asset}: {e}"))
            })?;

            let points = Self::parse_response(asset, chart)?;
            self.circuit_breaker.record_success();
            return Ok(points);
        }

        Err(last_error.unwrap_or_else(|| FetchError::Other("max retries exceeded".into())))
    }
}

impl MarketDataSource for YahooSource {
    fn name(&self) -> &str {
        "yahoo_finance"
    }

    fn fetch(
        &self,
        asset: &AssetId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<RawPricePoint>, FetchError> {
        self.fetch_with_retry(asset, start, end)
    }

    fn is_available(&self) -> bool {
        self.circuit_breaker.is_allowed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Result<Vec<RawPricePoint>, FetchError> {
        let resp: ChartResponse = serde_json::from_str(json).unwrap();
        YahooSource::parse_response(&AssetId::new("AAPL"), resp)
    }

    #[test]
    fn parses_quotes_with_nulls() {
        // 2024-01-02 14:30 UTC and 2024-01-03 14:30 UTC
        let json = r#"{"chart":{"result":[{
            "meta":{"gmtoffset":-18000},
            "timestamp":[1704205800,1704292200],
            "indicators":{"quote":[{
                "open":[187.15,184.22],
                "high":[188.44,185.88],
                "low":[183.89,183.43],
                "close":[185.64,null],
                "volume":[82488700,null]
            }]}
        }],"error":null}}"#;

        let points = parse(json).unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].date, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert_eq!(points[0].close, Some(185.64));
        assert_eq!(points[0].volume, Some(82_488_700));
        assert_eq!(points[1].date, NaiveDate::from_ymd_opt(2024, 1, 3).unwrap());
        assert_eq!(points[1].close, None);
    }

    #[test]
    fn missing_timestamps_means_empty_history() {
        let json = r#"{"chart":{"result":[{
            "meta":{"gmtoffset":0},
            "indicators":{"quote":[{}]}
        }],"error":null}}"#;
        assert!(parse(json).unwrap().is_empty());
    }

    #[test]
    fn not_found_maps_to_symbol_not_found() {
        let json = r#"{"chart":{"result":null,
            "error":{"code":"Not Found","description":"No data found, symbol may be delisted"}}}"#;
        let err = parse(json).unwrap_err();
        assert!(matches!(err, FetchError::SymbolNotFound { ref symbol } if symbol == "AAPL"));
    }

    #[test]
    fn other_error_maps_to_format_changed() {
        let json = r#"{"chart":{"result":null,
            "error":{"code":"Bad Request","description":"Invalid input"}}}"#;
        assert!(matches!(parse(json).unwrap_err(), FetchError::ResponseFormatChanged(_)));
    }

    #[test]
    fn chart_url_covers_closed_range() {
        let source = YahooSource::new(Arc::new(CircuitBreaker::default_provider()))
            .unwrap()
            .with_base_url("http://localhost:9/");
        let url = source.chart_url(
            &AssetId::new("BTC-USD"),
            NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
        );
        assert!(url.starts_with("http://localhost:9/v8/finance/chart/BTC-USD?"));
        assert!(url.contains("period1=1672531200"));
        assert!(url.contains("period2=1672617600"));
    }

    #[test]
    fn tripped_breaker_fails_fast() {
        let breaker = Arc::new(CircuitBreaker::default_provider());
        breaker.trip();
        let source = YahooSource::new(breaker).unwrap();
        assert!(!source.is_available());
        let err = source
            .fetch(
                &AssetId::new("AAPL"),
                NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
            )
            .unwrap_err();
        assert!(matches!(err, FetchError::CircuitBreakerTripped));
    }

    #[test]
    fn backoff_doubles_and_saturates() {
        let source = YahooSource::new(Arc::new(CircuitBreaker::default_provider()))
            .unwrap()
            .with_retries(100, Duration::from_millis(500));
        assert_eq!(source.backoff_delay(1), Duration::from_millis(500));
        assert_eq!(source.backoff_delay(3), Duration::from_secs(2));
        assert_eq!(source.backoff_delay(40), MAX_BACKOFF);
        assert_eq!(source.backoff_delay(u32::MAX), MAX_BACKOFF);
    }
}
