//! Table persistence: delimited text (CSV) and a compressed container (Parquet).
//!
//! Layout: `{data_dir}/{filename}`, format chosen by the filename extension.
//!
//! - `.csv` → header `Date,<symbols...>`, ISO dates, missing values as empty fields
//! - `.parquet` / `.pq` → `Date` column plus one nullable Float64 column per
//!   symbol, Zstd level 22
//! - anything else → nothing is written and no error is raised
//!
//! Writes are atomic (write to .tmp, rename into place).

use super::provider::DataError;
use crate::table::PriceTable;
use chrono::NaiveDate;
use polars::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const DATE_COLUMN: &str = "Date";
const ZSTD_LEVEL: i32 = 22;

/// On-disk table format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    /// Comma-separated text.
    Delimited,
    /// Zstd-compressed Parquet.
    Container,
}

impl TableFormat {
    /// Pick a format from the filename extension; `None` if unrecognized.
    pub fn from_filename(filename: &str) -> Option<Self> {
        let ext = Path::new(filename).extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "csv" => Some(TableFormat::Delimited),
            "parquet" | "pq" => Some(TableFormat::Container),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            TableFormat::Delimited => "csv",
            TableFormat::Container => "parquet",
        }
    }
}

/// Writes tables into a fixed directory.
#[derive(Debug, Clone)]
pub struct TableWriter {
    dir: PathBuf,
}

impl TableWriter {
    /// Create the writer, creating `dir` if it does not exist.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, DataError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .map_err(|e| DataError::Storage(format!("create {}: {e}", dir.display())))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write `table` as `{dir}/{filename}`.
    ///
    /// Returns the written path, or `None` when the extension is not
    /// recognized (no file is produced in that case).
    pub fn write(&self, table: &PriceTable, filename: &str) -> Result<Option<PathBuf>, DataError> {
        let Some(format) = TableFormat::from_filename(filename) else {
            debug!(filename, "unrecognized extension, nothing written");
            return Ok(None);
        };

        let path = self.dir.join(filename);
        let tmp_path = path.with_extension(format!("{}.tmp", format.extension()));

        let written = match format {
            TableFormat::Delimited => write_csv(table, &tmp_path),
            TableFormat::Container => write_parquet(table, &tmp_path),
        };
        if let Err(e) = written {
            let _ = fs::remove_file(&tmp_path);
            return Err(e);
        }

        // Atomic rename
        fs::rename(&tmp_path, &path).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            DataError::Storage(format!("atomic rename failed: {e}"))
        })?;

        info!("Saved: {}", path.display());
        Ok(Some(path))
    }
}

/// Load a table from a `.csv` or `.parquet` file, picking the reader by extension.
pub fn read_table(path: &Path) -> Result<PriceTable, DataError> {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
    match TableFormat::from_filename(name) {
        Some(TableFormat::Delimited) => read_csv(path),
        Some(TableFormat::Container) => read_parquet(path),
        None => Err(DataError::Storage(format!(
            "unrecognized table file extension: {}",
            path.display()
        ))),
    }
}

// ── CSV ─────────────────────────────────────────────────────────────

fn write_csv(table: &PriceTable, path: &Path) -> Result<(), DataError> {
    let csv_err = |e: csv::Error| DataError::Csv(format!("{}: {e}", path.display()));
    let mut wtr = csv::Writer::from_path(path).map_err(csv_err)?;

    let mut header = Vec::with_capacity(table.n_cols() + 1);
    header.push(DATE_COLUMN);
    header.extend(table.symbols().iter().map(String::as_str));
    wtr.write_record(&header).map_err(csv_err)?;

    let columns: Vec<&[f64]> = table.iter_columns().map(|(_, c)| c).collect();
    for (row, date) in table.dates().iter().enumerate() {
        let mut record = Vec::with_capacity(columns.len() + 1);
        record.push(date.format("%Y-%m-%d").to_string());
        record.extend(columns.iter().map(|col| {
            let v = col[row];
            if v.is_nan() {
                String::new()
            } else {
                v.to_string()
            }
        }));
        wtr.write_record(&record).map_err(csv_err)?;
    }

    wtr.flush()
        .map_err(|e| DataError::Csv(format!("flush {}: {e}", path.display())))
}

/// Read a table written by the CSV writer. Empty fields become NaN.
pub fn read_csv(path: &Path) -> Result<PriceTable, DataError> {
    let csv_err = |e: csv::Error| DataError::Csv(format!("{}: {e}", path.display()));
    let mut rdr = csv::Reader::from_path(path).map_err(csv_err)?;

    let symbols: Vec<String> = rdr
        .headers()
        .map_err(csv_err)?
        .iter()
        .skip(1)
        .map(str::to_string)
        .collect();

    let mut dates = Vec::new();
    let mut columns: Vec<Vec<f64>> = vec![Vec::new(); symbols.len()];

    for (line, record) in rdr.records().enumerate() {
        let record = record.map_err(csv_err)?;
        let raw_date = record.get(0).unwrap_or_default();
        let date = NaiveDate::parse_from_str(raw_date, "%Y-%m-%d").map_err(|e| {
            DataError::Csv(format!("row {}: bad date '{raw_date}': {e}", line + 1))
        })?;
        dates.push(date);

        for (i, col) in columns.iter_mut().enumerate() {
            let field = record.get(i + 1).unwrap_or_default().trim();
            let value = if field.is_empty() {
                f64::NAN
            } else {
                field.parse::<f64>().map_err(|e| {
                    DataError::Csv(format!("row {}, column '{}': {e}", line + 1, symbols[i]))
                })?
            };
            col.push(value);
        }
    }

    PriceTable::new(dates, symbols, columns)
}

// ── Parquet ─────────────────────────────────────────────────────────

/// Convert a table to a Polars DataFrame (missing → null).
fn table_to_dataframe(table: &PriceTable) -> Result<DataFrame, DataError> {
    let epoch = NaiveDate::default();
    let days: Vec<i32> = table
        .dates()
        .iter()
        .map(|d| (*d - epoch).num_days() as i32)
        .collect();

    let mut columns = Vec::with_capacity(table.n_cols() + 1);
    columns.push(
        Column::new(DATE_COLUMN.into(), days)
            .cast(&DataType::Date)
            .map_err(|e| DataError::ParquetError(format!("date cast: {e}")))?,
    );
    for (symbol, col) in table.iter_columns() {
        let values: Vec<Option<f64>> = col
            .iter()
            .map(|v| if v.is_nan() { None } else { Some(*v) })
            .collect();
        columns.push(Column::new(symbol.into(), values));
    }

    DataFrame::new(columns).map_err(|e| DataError::ParquetError(format!("dataframe creation: {e}")))
}

fn write_parquet(table: &PriceTable, path: &Path) -> Result<(), DataError> {
    let mut df = table_to_dataframe(table)?;
    let level = ZstdLevel::try_new(ZSTD_LEVEL)
        .map_err(|e| DataError::ParquetError(format!("zstd level: {e}")))?;

    let file =
        fs::File::create(path).map_err(|e| DataError::ParquetError(format!("create file: {e}")))?;
    ParquetWriter::new(file)
        .with_compression(ParquetCompression::Zstd(Some(level)))
        .finish(&mut df)
        .map_err(|e| DataError::ParquetError(format!("write parquet: {e}")))?;
    Ok(())
}

/// Read a table written by the Parquet writer. Nulls become NaN.
pub fn read_parquet(path: &Path) -> Result<PriceTable, DataError> {
    let map_err = |e: PolarsError| DataError::ParquetError(format!("{}: {e}", path.display()));

    let file = fs::File::open(path).map_err(|e| DataError::ParquetError(format!("open: {e}")))?;
    let df = ParquetReader::new(file).finish().map_err(map_err)?;

    let date_col = df.column(DATE_COLUMN).map_err(map_err)?;
    let date_ca = date_col.date().map_err(map_err)?;
    let epoch = NaiveDate::default();

    let mut dates = Vec::with_capacity(df.height());
    for i in 0..df.height() {
        let days = date_ca
            .get(i)
            .ok_or_else(|| DataError::ParquetError(format!("null date at row {i}")))?;
        dates.push(epoch + chrono::Duration::days(days as i64));
    }

    let mut symbols = Vec::new();
    let mut columns = Vec::new();
    for col in df.get_columns() {
        if col.name().as_str() == DATE_COLUMN {
            continue;
        }
        let as_f64 = col.cast(&DataType::Float64).map_err(map_err)?;
        let values: Vec<f64> = as_f64
            .f64()
            .map_err(map_err)?
            .into_iter()
            .map(|v| v.unwrap_or(f64::NAN))
            .collect();
        symbols.push(col.name().to_string());
        columns.push(values);
    }

    PriceTable::new(dates, symbols, columns)
}
