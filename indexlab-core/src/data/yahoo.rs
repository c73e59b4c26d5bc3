//! Yahoo Finance price provider.
//!
//! Fetches one field per symbol from Yahoo's v8 chart API and aligns the
//! results into a single date × symbol table. No retries: the first transport
//! or format error ends the download.
//!
//! Yahoo Finance has no official API and is subject to unannounced format changes.

use super::align::align_series;
use super::provider::{DataError, DateRange, Interval, PriceField, PriceProvider, SymbolSeries};
use crate::config::LoaderConfig;
use crate::table::PriceTable;
use chrono::{NaiveDate, NaiveTime};
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

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

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct QuoteData {
    open: Vec<Option<f64>>,
    high: Vec<Option<f64>>,
    low: Vec<Option<f64>>,
    close: Vec<Option<f64>>,
    volume: Vec<Option<u64>>,
}

#[derive(Debug, Deserialize)]
struct AdjCloseData {
    adjclose: Vec<Option<f64>>,
}

/// Yahoo Finance price provider.
pub struct YahooProvider {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl YahooProvider {
    /// Build the HTTP client. Failure here is an environment error: the
    /// loader cannot be constructed without a working client.
    pub fn new(config: &LoaderConfig) -> Result<Self, DataError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| DataError::Environment(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.chart_base_url.clone(),
        })
    }

    /// Build the chart API URL for a symbol, range and interval.
    fn chart_url(
        &self,
        symbol: &str,
        range: DateRange,
        interval: Interval,
    ) -> Result<Url, DataError> {
        let start_ts = range.start().and_time(NaiveTime::MIN).and_utc().timestamp();
        let end_ts = range.end().and_time(NaiveTime::MIN).and_utc().timestamp();

        let mut url = Url::parse(&self.base_url).map_err(|e| {
            DataError::Environment(format!("invalid chart URL '{}': {e}", self.base_url))
        })?;
        url.path_segments_mut()
            .map_err(|_| {
                DataError::Environment(format!("chart URL '{}' cannot take a path", self.base_url))
            })?
            .pop_if_empty()
            .push(symbol);
        url.query_pairs_mut()
            .append_pair("period1", &start_ts.to_string())
            .append_pair("period2", &end_ts.to_string())
            .append_pair("interval", interval.as_str())
            .append_pair("includeAdjustedClose", "true");
        Ok(url)
    }

    /// Fetch one symbol. `Ok(None)` means the provider does not know it.
    fn fetch_symbol(
        &self,
        symbol: &str,
        range: DateRange,
        interval: Interval,
        field: PriceField,
    ) -> Result<Option<Vec<(NaiveDate, f64)>>, DataError> {
        let url = self.chart_url(symbol, range, interval)?;
        debug!(%url, "requesting chart");

        let resp = self
            .client
            .get(url.clone())
            .send()
            .map_err(|e| DataError::NetworkUnreachable(format!("{symbol}: {e}")))?;

        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(DataError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let chart: ChartResponse = resp.json().map_err(|e| {
            DataError::ResponseFormatChanged(format!("failed to parse response for {symbol}: {e}"))
        })?;

        let points = parse_response(chart, field)?;
        Ok(points.map(|pts| {
            pts.into_iter()
                .filter(|(date, _)| *date >= range.start() && *date < range.end())
                .collect()
        }))
    }
}

/// Parse the chart API response into `(date, value)` points for `field`.
///
/// `Ok(None)` when the response reports the symbol as not found.
fn parse_response(
    resp: ChartResponse,
    field: PriceField,
) -> Result<Option<Vec<(NaiveDate, f64)>>, DataError> {
    let result = match resp.chart.result {
        Some(result) => result,
        None => {
            return match resp.chart.error {
                Some(err) if err.code == "Not Found" => Ok(None),
                Some(err) => Err(DataError::ResponseFormatChanged(format!(
                    "{}: {}",
                    err.code, err.description
                ))),
                None => Err(DataError::ResponseFormatChanged(
                    "empty result with no error".into(),
                )),
            };
        }
    };

    let Some(data) = result.into_iter().next() else {
        return Ok(None);
    };

    // A listed symbol with no trades in the range comes back without timestamps.
    let Some(timestamps) = data.timestamp else {
        return Ok(Some(Vec::new()));
    };

    let quote = data.indicators.quote.into_iter().next().unwrap_or_default();
    let adj_closes = data
        .indicators
        .adjclose
        .and_then(|v| v.into_iter().next())
        .map(|a| a.adjclose);

    let mut points = Vec::with_capacity(timestamps.len());

    for (i, &ts) in timestamps.iter().enumerate() {
        let date = chrono::DateTime::from_timestamp(ts, 0)
            .map(|dt| dt.naive_utc().date())
            .ok_or_else(|| DataError::ResponseFormatChanged(format!("invalid timestamp: {ts}")))?;

        let open = quote.open.get(i).copied().flatten();
        let high = quote.high.get(i).copied().flatten();
        let low = quote.low.get(i).copied().flatten();
        let close = quote.close.get(i).copied().flatten();
        let volume = quote.volume.get(i).copied().flatten();

        // Skip rows where all OHLCV are None (holidays/non-trading days)
        if open.is_none()
            && high.is_none()
            && low.is_none()
            && close.is_none()
            && volume.is_none()
        {
            continue;
        }

        let value = match field {
            PriceField::Open => open,
            PriceField::High => high,
            PriceField::Low => low,
            PriceField::Close => close,
            PriceField::AdjClose => adj_closes.as_ref().and_then(|v| v.get(i).copied().flatten()),
            PriceField::Volume => volume.map(|v| v as f64),
        };

        points.push((date, value.unwrap_or(f64::NAN)));
    }

    Ok(Some(points))
}

impl PriceProvider for YahooProvider {
    fn name(&self) -> &str {
        "yahoo_finance"
    }

    fn fetch_prices(
        &self,
        symbols: &[String],
        range: DateRange,
        interval: Interval,
        field: PriceField,
    ) -> Result<PriceTable, DataError> {
        let mut series = Vec::with_capacity(symbols.len());
        let mut missing = 0usize;

        for symbol in symbols {
            let points = match self.fetch_symbol(symbol, range, interval, field)? {
                Some(points) if !points.is_empty() => points,
                _ => {
                    warn!(%symbol, "no data returned; column will be all missing");
                    missing += 1;
                    Vec::new()
                }
            };
            series.push(SymbolSeries {
                symbol: symbol.clone(),
                points,
            });
        }

        if missing > 0 {
            warn!(missing, total = symbols.len(), "symbols without data");
        }

        align_series(series)
    }
}
