//! Yahoo Finance data provider.
//!
//! Fetches daily OHLCV bars from Yahoo's v8 chart API in a single blocking
//! request. Failures are reported to the caller as a [`DataError`]; nothing is
//! retried.
//!
//! Yahoo Finance has no official API and is subject to unannounced format
//! changes, so every structural surprise maps to `ResponseFormatChanged`.

use super::provider::{DataError, DataProvider, DataSource, FetchResult, RawBar};
use chrono::NaiveDate;
use reqwest::header::{HeaderValue, RETRY_AFTER};
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

const CHART_BASE_URL: &str = "https://query2.finance.yahoo.com/v8/finance/chart";

/// Yahoo Finance v8 chart API response.
#[derive(Debug, Deserialize)]
struct ChartResponse {
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
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
    adjclose: Option<Vec<AdjCloseData>>,
}

#[derive(Debug, Deserialize)]
struct QuoteData {
    open: Vec<Option<f64>>,
    high: Vec<Option<f64>>,
    low: Vec<Option<f64>>,
    close: Vec<Option<f64>>,
    volume: Vec<Option<u64>>,
}

impl QuoteData {
    /// Row `i`, or `None` for the all-null rows Yahoo sends for holidays and
    /// halted sessions. `adj_close` falls back to `close`.
    fn row(&self, i: usize, date: NaiveDate, adj_close: Option<f64>) -> Option<RawBar> {
        let at = |v: &Vec<Option<f64>>| v.get(i).copied().flatten();
        let (open, high, low, close) = (at(&self.open), at(&self.high), at(&self.low), at(&self.close));
        let volume = self.volume.get(i).copied().flatten();

        if [open, high, low, close].iter().all(Option::is_none) && volume.is_none() {
            return None;
        }
        let close = close.unwrap_or(f64::NAN);
        Some(RawBar {
            date,
            open: open.unwrap_or(f64::NAN),
            high: high.unwrap_or(f64::NAN),
            low: low.unwrap_or(f64::NAN),
            close,
            adj_close: adj_close.unwrap_or(close),
            volume: volume.unwrap_or(0),
        })
    }
}

#[derive(Debug, Deserialize)]
struct AdjCloseData {
    adjclose: Vec<Option<f64>>,
}

pub struct YahooProvider {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl YahooProvider {
    pub fn new() -> Result<Self, DataError> {
        Self::with_base_url(CHART_BASE_URL)
    }

    /// Provider pointed at an alternative chart endpoint (mirrors, local stubs).
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, DataError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .build()
            .map_err(|e| DataError::Other(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    /// `period1` is midnight UTC of `start`, `period2` the last second of `end`.
    fn chart_url(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> String {
        let period1 = start.and_time(chrono::NaiveTime::MIN).and_utc().timestamp();
        let period2 = end
            .and_hms_opt(23, 59, 59)
            .map_or(period1, |dt| dt.and_utc().timestamp());
        format!(
            "{}/{symbol}?period1={period1}&period2={period2}&interval=1d&includeAdjustedClose=true",
            self.base_url
        )
    }

    fn parse_response(symbol: &str, resp: ChartResponse) -> Result<Vec<RawBar>, DataError> {
        let not_found = || DataError::SymbolNotFound {
            symbol: symbol.to_string(),
        };
        let format_changed = |msg: &str| DataError::ResponseFormatChanged(msg.to_string());

        let data = match (resp.chart.result, resp.chart.error) {
            (Some(results), _) => results
                .into_iter()
                .next()
                .ok_or_else(|| format_changed("result array is empty"))?,
            (None, Some(err)) if err.code == "Not Found" => return Err(not_found()),
            (None, Some(err)) => {
                return Err(format_changed(&format!("{}: {}", err.code, err.description)))
            }
            (None, None) => return Err(format_changed("empty result with no error")),
        };

        // A valid symbol with no trading days in range has no timestamps.
        let timestamps = data.timestamp.ok_or_else(not_found)?;
        let Indicators { quote, adjclose } = data.indicators;
        let quote = quote
            .into_iter()
            .next()
            .ok_or_else(|| format_changed("no quote data"))?;
        let adj = adjclose
            .and_then(|v| v.into_iter().next())
            .map(|a| a.adjclose)
            .unwrap_or_default();

        let mut bars = Vec::with_capacity(timestamps.len());
        for (i, &ts) in timestamps.iter().enumerate() {
            let date = chrono::DateTime::from_timestamp(ts, 0)
                .map(|dt| dt.naive_utc().date())
                .ok_or_else(|| format_changed(&format!("invalid timestamp: {ts}")))?;
            let adj_close = adj.get(i).copied().flatten();
            bars.extend(quote.row(i, date, adj_close));
        }

        if bars.is_empty() {
            return Err(not_found());
        }
        Ok(bars)
    }

    /// Error for a non-success HTTP status; `None` on success.
    fn status_error(
        symbol: &str,
        status: StatusCode,
        retry_after: Option<&HeaderValue>,
    ) -> Option<DataError> {
        match status {
            s if s.is_success() => None,
            StatusCode::NOT_FOUND => Some(DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            }),
            StatusCode::TOO_MANY_REQUESTS => {
                let retry_after_secs = retry_after
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.trim().parse::<u64>().ok())
                    .unwrap_or(60);
                Some(DataError::RateLimited { retry_after_secs })
            }
            StatusCode::UNAUTHORIZED => Some(DataError::AuthenticationRequired(
                "Yahoo Finance requires authentication".into(),
            )),
            _ => Some(DataError::Other(format!("HTTP {status} for {symbol}"))),
        }
    }
}

impl DataProvider for YahooProvider {
    fn name(&self) -> &str {
        "yahoo_finance"
    }

    fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<FetchResult, DataError> {
        let url = self.chart_url(symbol, start, end);
        debug!(%url, "requesting chart data");

        let resp = self.client.get(&url).send().map_err(|e| {
            let reason = if e.is_timeout() { "request timed out" } else { "request failed" };
            DataError::NetworkUnreachable(format!("{reason}: {e}"))
        })?;
        if let Some(err) = Self::status_error(symbol, resp.status(), resp.headers().get(RETRY_AFTER)) {
            return Err(err);
        }

        let chart: ChartResponse = resp.json().map_err(|e| {
            DataError::ResponseFormatChanged(format!("unexpected chart payload for {symbol}: {e}"))
        })?;
        let bars = Self::parse_response(symbol, chart)?;
        info!(symbol, rows = bars.len(), "fetched daily bars from Yahoo Finance");

        Ok(FetchResult {
            symbol: symbol.to_string(),
            bars,
            source: DataSource::YahooFinance,
        })
    }
}
