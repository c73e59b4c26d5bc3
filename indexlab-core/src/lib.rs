//! IndexLab Core: constituent prices, log-returns, and cleaned datasets for a stock index.
//!
//! This crate contains:
//! - Ticker directory (index members scraped from a reference page, plus a benchmark)
//! - Price providers (Yahoo Finance chart API, deterministic synthetic walk)
//! - Date × symbol price tables with strict-NaN alignment
//! - Transforms: log-returns and three-step missing-data cleaning
//! - CSV / Parquet persistence
//! - A dataset loader session holding the latest table of each kind

pub mod config;
pub mod data;
pub mod loader;
pub mod table;
pub mod transform;

pub use config::LoaderConfig;
pub use data::{DataError, Interval, PriceField, PriceProvider, PriceRequest, TickerDirectory};
pub use loader::{DatasetLoader, SaveOptions, TableKind};
pub use table::PriceTable;
