//! Yahoo Finance chart API adapter.
//!
//! Daily bars come from the v8 chart endpoint. Rows with any missing OHLC
//! field are skipped, so a non-trading day never turns into a zero price.

use chrono::{DateTime, Days, NaiveDate};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use crate::domain::error::DashboardError;
use crate::domain::ohlcv::OhlcvBar;
use crate::ports::data_port::MarketDataPort;

const DEFAULT_BASE_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";
const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) stockdash/0.1";

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
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
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
}

#[derive(Debug, Deserialize)]
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

pub struct YahooAdapter {
    base_url: String,
    client: reqwest::blocking::Client,
}

impl YahooAdapter {
    pub fn new() -> Result<Self, DashboardError> {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    pub fn with_base_url(base_url: &str) -> Result<Self, DashboardError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| DashboardError::DataSource {
                symbol: "all".to_string(),
                reason: format!("failed to build HTTP client: {}", e),
            })?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn build_url(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> String {
        // period2 is exclusive, so ask for the day after `end`.
        let period1 = unix_midnight(start);
        let period2 = unix_midnight(end.checked_add_days(Days::new(1)).unwrap_or(end));
        format!(
            "{}/{}?period1={}&period2={}&interval=1d&events=history",
            self.base_url, symbol, period1, period2
        )
    }
}

fn unix_midnight(date: NaiveDate) -> i64 {
    date.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc().timestamp())
        .unwrap_or(0)
}

/// Decode a chart response into bars, ascending by date.
pub fn parse_chart(symbol: &str, json: &str) -> Result<Vec<OhlcvBar>, DashboardError> {
    let error = |reason: String| DashboardError::DataSource {
        symbol: symbol.to_string(),
        reason,
    };

    let response: ChartResponse =
        serde_json::from_str(json).map_err(|e| error(format!("unreadable response: {}", e)))?;

    if let Some(api_error) = response.chart.error {
        return Err(error(format!(
            "API error [{}]: {}",
            api_error.code, api_error.description
        )));
    }

    let results = response
        .chart
        .result
        .ok_or_else(|| error("no chart data returned".to_string()))?;
    let Some(data) = results.first() else {
        return Err(error("no chart data returned".to_string()));
    };
    let Some(quote) = data.indicators.quote.first() else {
        return Ok(Vec::new());
    };

    let field = |values: &[Option<f64>], i: usize| values.get(i).copied().flatten();
    let mut bars = Vec::with_capacity(data.timestamp.len());

    for (i, &timestamp) in data.timestamp.iter().enumerate() {
        let Some(date) = DateTime::from_timestamp(timestamp, 0).map(|dt| dt.date_naive()) else {
            continue;
        };
        let (Some(open), Some(high), Some(low), Some(close)) = (
            field(&quote.open, i),
            field(&quote.high, i),
            field(&quote.low, i),
            field(&quote.close, i),
        ) else {
            continue;
        };

        bars.push(OhlcvBar {
            symbol: symbol.to_string(),
            date,
            open,
            high,
            low,
            close,
            volume: quote.volume.get(i).copied().flatten().unwrap_or(0),
        });
    }

    bars.sort_by_key(|b| b.date);
    bars.dedup_by_key(|b| b.date);
    Ok(bars)
}

impl MarketDataPort for YahooAdapter {
    fn fetch_bars(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<OhlcvBar>, DashboardError> {
        let url = self.build_url(symbol, start, end);
        debug!(symbol, %url, "requesting chart");

        let request_error = |e: reqwest::Error| DashboardError::DataSource {
            symbol: symbol.to_string(),
            reason: format!("request failed: {}", e),
        };
        let text = self
            .client
            .get(&url)
            .send()
            .map_err(request_error)?
            .text()
            .map_err(request_error)?;

        let bars = parse_chart(symbol, &text)?;
        Ok(bars
            .into_iter()
            .filter(|b| b.date >= start && b.date <= end)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // 2024-01-02, 2024-01-03 and 2024-01-04 at 14:30 UTC
    const SAMPLE: &str = r#"{
        "chart": {
            "result": [{
                "meta": {"symbol": "NVDA"},
                "timestamp": [1704205800, 1704292200, 1704378600],
                "indicators": {
                    "quote": [{
                        "open": [492.4, null, 477.0],
                        "high": [492.9, 485.0, 485.0],
                        "low": [475.9, 474.0, 475.1],
                        "close": [481.7, 475.7, 479.98],
                        "volume": [41125400, 32089600, null]
                    }]
                }
            }],
            "error": null
        }
    }"#;

    #[test]
    fn parse_chart_skips_incomplete_rows() {
        let bars = parse_chart("NVDA", SAMPLE).unwrap();

        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].date, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert_eq!(bars[0].open, 492.4);
        assert_eq!(bars[0].volume, 41_125_400);
        assert_eq!(bars[1].date, NaiveDate::from_ymd_opt(2024, 1, 4).unwrap());
        assert_eq!(bars[1].volume, 0);
    }

    #[test]
    fn parse_chart_reports_api_error() {
        let json = r#"{"chart": {"result": null, "error": {"code": "Not Found", "description": "No data found, symbol may be delisted"}}}"#;
        let err = parse_chart("XXXX", json).unwrap_err();
        assert!(matches!(err, DashboardError::DataSource { ref symbol, .. } if symbol == "XXXX"));
        assert!(err.to_string().contains("delisted"));
    }

    #[test]
    fn parse_chart_rejects_garbage() {
        assert!(parse_chart("NVDA", "<html>rate limited</html>").is_err());
    }

    #[test]
    fn url_covers_end_date_inclusive() {
        let adapter = YahooAdapter::with_base_url("http://localhost:9/chart/").unwrap();
        let url = adapter.build_url(
            "MSFT",
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
        );
        assert_eq!(
            url,
            "http://localhost:9/chart/MSFT?period1=1704067200&period2=1706745600&interval=1d&events=history"
        );
    }
}
