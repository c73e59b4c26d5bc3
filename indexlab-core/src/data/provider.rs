//! Price provider trait, request types, and structured error types.
//!
//! The PriceProvider trait abstracts over market-data sources (Yahoo Finance,
//! synthetic random walks) so the loader can swap implementations and mock
//! them in tests.

use crate::table::PriceTable;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Structured error types for data operations.
///
/// These are designed to be displayable in both library and CLI contexts.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("environment error: {0}")]
    Environment(String),

    #[error("invalid date range: start {start} must be before end {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },

    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("HTTP {status} from {url}")]
    HttpStatus { status: u16, url: String },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("could not parse index membership: {0}")]
    MembershipParse(String),

    #[error("unsupported interval '{0}' (expected one of 1d, 5d, 1wk, 1mo, 3mo)")]
    UnsupportedInterval(String),

    #[error("unknown price field '{0}'")]
    UnknownField(String),

    #[error("table shape error: {0}")]
    Shape(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("CSV error: {0}")]
    Csv(String),

    #[error("parquet I/O error: {0}")]
    ParquetError(String),

    #[error("config error: {0}")]
    Config(String),
}

/// Sampling interval of the downloaded series.
///
/// Only calendar-date granularities are supported because tables are keyed by date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Interval {
    #[default]
    Daily,
    FiveDay,
    Weekly,
    Monthly,
    Quarterly,
}

impl Interval {
    /// Provider string form (`1d`, `1wk`, ...).
    pub fn as_str(&self) -> &'static str {
        match self {
            Interval::Daily => "1d",
            Interval::FiveDay => "5d",
            Interval::Weekly => "1wk",
            Interval::Monthly => "1mo",
            Interval::Quarterly => "3mo",
        }
    }
}

impl FromStr for Interval {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1d" => Ok(Interval::Daily),
            "5d" => Ok(Interval::FiveDay),
            "1wk" => Ok(Interval::Weekly),
            "1mo" => Ok(Interval::Monthly),
            "3mo" => Ok(Interval::Quarterly),
            other => Err(DataError::UnsupportedInterval(other.to_string())),
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which price series to extract for each symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PriceField {
    Open,
    High,
    Low,
    Close,
    #[default]
    AdjClose,
    Volume,
}

impl PriceField {
    /// Column name as the provider labels it.
    pub fn as_str(&self) -> &'static str {
        match self {
            PriceField::Open => "Open",
            PriceField::High => "High",
            PriceField::Low => "Low",
            PriceField::Close => "Close",
            PriceField::AdjClose => "Adj Close",
            PriceField::Volume => "Volume",
        }
    }
}

impl FromStr for PriceField {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "open" => Ok(PriceField::Open),
            "high" => Ok(PriceField::High),
            "low" => Ok(PriceField::Low),
            "close" => Ok(PriceField::Close),
            "adj close" | "adj_close" | "adjclose" => Ok(PriceField::AdjClose),
            "volume" => Ok(PriceField::Volume),
            _ => Err(DataError::UnknownField(s.to_string())),
        }
    }
}

impl fmt::Display for PriceField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated `[start, end)` calendar range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    /// Fails with [`DataError::InvalidRange`] unless `start < end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, DataError> {
        if end <= start {
            return Err(DataError::InvalidRange { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    /// Exclusive upper bound.
    pub fn end(&self) -> NaiveDate {
        self.end
    }
}

/// Everything a download needs besides the ticker list.
///
/// The range is kept unvalidated here so that an inverted range surfaces as
/// an error from the download call itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceRequest {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub interval: Interval,
    pub field: PriceField,
}

impl PriceRequest {
    /// Daily adjusted closes over `[start, end)`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start,
            end,
            interval: Interval::default(),
            field: PriceField::default(),
        }
    }

    pub fn with_interval(mut self, interval: Interval) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_field(mut self, field: PriceField) -> Self {
        self.field = field;
        self
    }

    pub fn range(&self) -> Result<DateRange, DataError> {
        DateRange::new(self.start, self.end)
    }
}

/// One symbol's observations for the requested field, before alignment.
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolSeries {
    pub symbol: String,
    pub points: Vec<(NaiveDate, f64)>,
}

/// Trait for market-data providers (Yahoo Finance, synthetic, ...).
///
/// A provider answers one batched request per download: every symbol, one
/// range, one interval, one field. Symbols the provider has no data for come
/// back as all-missing columns; any other failure is returned as an error.
pub trait PriceProvider {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Fetch a date × symbol table for `symbols` over `range`.
    fn fetch_prices(
        &self,
        symbols: &[String],
        range: DateRange,
        interval: Interval,
        field: PriceField,
    ) -> Result<PriceTable, DataError>;
}

impl<P: PriceProvider + ?Sized> PriceProvider for Box<P> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn fetch_prices(
        &self,
        symbols: &[String],
        range: DateRange,
        interval: Interval,
        field: PriceField,
    ) -> Result<PriceTable, DataError> {
        (**self).fetch_prices(symbols, range, interval, field)
    }
}
