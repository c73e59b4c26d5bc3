//! Dataset loader session.
//!
//! Owns the ticker directory, the price provider, the disk writer and the
//! four most recent tables. Each `get_*` call runs the minimal chain for its
//! kind, refreshing every snapshot it computes on the way:
//!
//! | call                  | downloads | snapshots refreshed                         |
//! |-----------------------|-----------|---------------------------------------------|
//! | `get_raw_prices`      | yes       | raw prices                                  |
//! | `get_raw_returns`     | yes       | raw prices, raw returns                     |
//! | `get_cleaned_prices`  | yes       | raw prices, cleaned prices                  |
//! | `get_cleaned_returns` | yes       | raw prices, cleaned prices, cleaned returns |
//!
//! Only the requested kind is written to disk. `get_last_*` never downloads.

use crate::config::LoaderConfig;
use crate::data::membership::{MembershipSource, TickerDirectory, WikipediaMembership};
use crate::data::provider::{DataError, PriceProvider, PriceRequest};
use crate::data::store::{TableFormat, TableWriter};
use crate::data::yahoo::YahooProvider;
use crate::table::PriceTable;
use crate::transform::{clean, log_returns};
use std::path::PathBuf;
use tracing::info;

/// Which table a snapshot or file holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TableKind {
    RawPrices,
    RawReturns,
    CleanedPrices,
    CleanedReturns,
}

impl TableKind {
    /// File stem, e.g. `raw_prices`.
    pub fn stem(&self) -> &'static str {
        match self {
            TableKind::RawPrices => "raw_prices",
            TableKind::RawReturns => "raw_returns",
            TableKind::CleanedPrices => "cleaned_prices",
            TableKind::CleanedReturns => "cleaned_returns",
        }
    }

    /// Fixed filename for this kind, e.g. `S&P500-raw_prices.csv`.
    pub fn filename(&self, prefix: &str, format: TableFormat) -> String {
        format!("{prefix}-{}.{}", self.stem(), format.extension())
    }
}

/// Which formats a `get_*` call writes its result in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SaveOptions {
    /// CSV.
    pub delimited: bool,
    /// Compressed Parquet.
    pub container: bool,
}

impl SaveOptions {
    pub const NONE: SaveOptions = SaveOptions {
        delimited: false,
        container: false,
    };

    pub const BOTH: SaveOptions = SaveOptions {
        delimited: true,
        container: true,
    };

    fn formats(&self) -> impl Iterator<Item = TableFormat> {
        [
            self.delimited.then_some(TableFormat::Delimited),
            self.container.then_some(TableFormat::Container),
        ]
        .into_iter()
        .flatten()
    }
}

/// Fixed-name output files for each table kind.
#[derive(Debug, Clone)]
struct OutputFiles {
    writer: TableWriter,
    prefix: String,
}

impl OutputFiles {
    /// Write `table` once per requested format under the fixed name for `kind`.
    fn save(
        &self,
        kind: TableKind,
        table: &PriceTable,
        save: SaveOptions,
    ) -> Result<Vec<PathBuf>, DataError> {
        let mut written = Vec::new();
        for format in save.formats() {
            let filename = kind.filename(&self.prefix, format);
            if let Some(path) = self.writer.write(table, &filename)? {
                written.push(path);
            }
        }
        Ok(written)
    }
}

/// One caller's session: tickers, provider and the latest computed tables.
pub struct DatasetLoader<P: PriceProvider> {
    tickers: TickerDirectory,
    provider: P,
    output: OutputFiles,
    last_request: Option<PriceRequest>,
    raw_prices: Option<PriceTable>,
    raw_returns: Option<PriceTable>,
    cleaned_prices: Option<PriceTable>,
    cleaned_returns: Option<PriceTable>,
}

impl DatasetLoader<YahooProvider> {
    /// Live session: Wikipedia membership, Yahoo prices.
    pub fn from_config(config: &LoaderConfig) -> Result<Self, DataError> {
        let source = WikipediaMembership::new(config)?;
        let provider = YahooProvider::new(config)?;
        Self::new(config, &source, provider)
    }
}

impl<P: PriceProvider> DatasetLoader<P> {
    /// Create the data directory and build the ticker directory.
    ///
    /// Any failure leaves no usable loader behind.
    pub fn new(
        config: &LoaderConfig,
        source: &dyn MembershipSource,
        provider: P,
    ) -> Result<Self, DataError> {
        let writer = TableWriter::new(&config.data_dir).map_err(|e| {
            DataError::Environment(format!("cannot prepare {}: {e}", config.data_dir.display()))
        })?;
        let tickers = TickerDirectory::build(source, &config.benchmark)?;
        Ok(Self::with_tickers(tickers, provider, writer, &config.file_prefix))
    }

    /// Assemble a session from already-built parts.
    pub fn with_tickers(
        tickers: TickerDirectory,
        provider: P,
        writer: TableWriter,
        file_prefix: &str,
    ) -> Self {
        Self {
            tickers,
            provider,
            output: OutputFiles {
                writer,
                prefix: file_prefix.to_string(),
            },
            last_request: None,
            raw_prices: None,
            raw_returns: None,
            cleaned_prices: None,
            cleaned_returns: None,
        }
    }

    /// Copy of the ticker list (members plus benchmark).
    pub fn get_ticker_list(&self) -> Vec<String> {
        self.tickers.to_vec()
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Request behind the current raw-prices snapshot.
    pub fn last_request(&self) -> Option<&PriceRequest> {
        self.last_request.as_ref()
    }

    /// Download `request.field` for every ticker and replace the raw-prices
    /// snapshot. An inverted range fails before the provider is called.
    pub fn download_prices(&mut self, request: &PriceRequest) -> Result<&PriceTable, DataError> {
        let prices = self.fetch(request)?;
        Ok(store(&mut self.raw_prices, TableKind::RawPrices, prices))
    }

    pub fn get_raw_prices(
        &mut self,
        request: &PriceRequest,
        save: SaveOptions,
    ) -> Result<&PriceTable, DataError> {
        let prices = self.fetch(request)?;
        let table = store(&mut self.raw_prices, TableKind::RawPrices, prices);
        self.output.save(TableKind::RawPrices, table, save)?;
        Ok(table)
    }

    pub fn get_raw_returns(
        &mut self,
        request: &PriceRequest,
        save: SaveOptions,
    ) -> Result<&PriceTable, DataError> {
        let prices = self.fetch(request)?;
        let returns = log_returns(store(&mut self.raw_prices, TableKind::RawPrices, prices));
        let table = store(&mut self.raw_returns, TableKind::RawReturns, returns);
        self.output.save(TableKind::RawReturns, table, save)?;
        Ok(table)
    }

    pub fn get_cleaned_prices(
        &mut self,
        request: &PriceRequest,
        save: SaveOptions,
    ) -> Result<&PriceTable, DataError> {
        let prices = self.fetch(request)?;
        let cleaned = clean(store(&mut self.raw_prices, TableKind::RawPrices, prices));
        let table = store(&mut self.cleaned_prices, TableKind::CleanedPrices, cleaned);
        self.output.save(TableKind::CleanedPrices, table, save)?;
        Ok(table)
    }

    /// Returns of the cleaned prices (not cleaned raw returns).
    pub fn get_cleaned_returns(
        &mut self,
        request: &PriceRequest,
        save: SaveOptions,
    ) -> Result<&PriceTable, DataError> {
        let prices = self.fetch(request)?;
        let cleaned = clean(store(&mut self.raw_prices, TableKind::RawPrices, prices));
        let cleaned = store(&mut self.cleaned_prices, TableKind::CleanedPrices, cleaned);
        let returns = log_returns(cleaned);
        let table = store(&mut self.cleaned_returns, TableKind::CleanedReturns, returns);
        self.output.save(TableKind::CleanedReturns, table, save)?;
        Ok(table)
    }

    pub fn get_last_raw_prices(
        &self,
        save: SaveOptions,
    ) -> Result<Option<&PriceTable>, DataError> {
        self.last(TableKind::RawPrices, save)
    }

    pub fn get_last_raw_returns(
        &self,
        save: SaveOptions,
    ) -> Result<Option<&PriceTable>, DataError> {
        self.last(TableKind::RawReturns, save)
    }

    pub fn get_last_cleaned_prices(
        &self,
        save: SaveOptions,
    ) -> Result<Option<&PriceTable>, DataError> {
        self.last(TableKind::CleanedPrices, save)
    }

    pub fn get_last_cleaned_returns(
        &self,
        save: SaveOptions,
    ) -> Result<Option<&PriceTable>, DataError> {
        self.last(TableKind::CleanedReturns, save)
    }

    /// Snapshot of `kind` without side effects.
    pub fn snapshot(&self, kind: TableKind) -> Option<&PriceTable> {
        match kind {
            TableKind::RawPrices => self.raw_prices.as_ref(),
            TableKind::RawReturns => self.raw_returns.as_ref(),
            TableKind::CleanedPrices => self.cleaned_prices.as_ref(),
            TableKind::CleanedReturns => self.cleaned_returns.as_ref(),
        }
    }

    fn last(&self, kind: TableKind, save: SaveOptions) -> Result<Option<&PriceTable>, DataError> {
        let Some(table) = self.snapshot(kind) else {
            return Ok(None);
        };
        self.output.save(kind, table, save)?;
        Ok(Some(table))
    }

    /// Validate the range, then make the single batched provider call.
    fn fetch(&mut self, request: &PriceRequest) -> Result<PriceTable, DataError> {
        let range = request.range()?;
        info!(
            provider = self.provider.name(),
            tickers = self.tickers.len(),
            start = %range.start(),
            end = %range.end(),
            interval = %request.interval,
            field = %request.field,
            "downloading prices"
        );
        let table = self.provider.fetch_prices(
            self.tickers.symbols(),
            range,
            request.interval,
            request.field,
        )?;
        self.last_request = Some(request.clone());
        Ok(table)
    }
}

/// Replace a snapshot slot and hand back the stored table.
fn store(slot: &mut Option<PriceTable>, kind: TableKind, table: PriceTable) -> &PriceTable {
    info!(
        kind = kind.stem(),
        rows = table.n_rows(),
        cols = table.n_cols(),
        hash = %table.content_hash(),
        "snapshot updated"
    );
    slot.insert(table)
}
